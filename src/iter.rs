//! Cursor over a map's insertion chain.
//!
//! [`RawIter`] pins the epoch for as long as it lives and walks the chain of
//! the generation that was current when it was created. It keeps working if
//! the map is cleared meanwhile; it just keeps reporting the old generation.
//!
//! It is a lending cursor rather than an [`Iterator`]: the references it yields
//! borrow the cursor, because the epoch pin keeping them alive is owned by it.
//!
//! ```
//! use hashorder::HashOrderedMap;
//!
//! let map: HashOrderedMap<u32, u32> = HashOrderedMap::new();
//! map.put_if_absent(2, 20).unwrap();
//! map.put_if_absent(1, 10).unwrap();
//!
//! let mut iter = map.raw_iter();
//! assert_eq!(iter.next(), Some((&2, &20)));
//! assert_eq!(iter.next(), Some((&1, &10)));
//! assert_eq!(iter.next(), None);
//! ```

use std::marker::PhantomData;
use std::ptr;

use crate::chain::InsertionChain;
use crate::entry::Entry;
use crate::generation::GenerationId;
use crate::map::HashOrderedMap;
use crate::sync::epoch::{self, Guard};

/// Insertion-ordered cursor over one generation of a [`HashOrderedMap`].
pub struct RawIter<'m, K, V> {
	guard: Guard,
	generation: GenerationId,
	chain: *const InsertionChain<K, V>,
	/// Last entry yielded; null until the first call returns one.
	last: *const Entry<K, V>,
	_map: PhantomData<&'m Entry<K, V>>,
}

impl<'m, K, V> RawIter<'m, K, V> {
	pub(crate) fn new<S>(map: &'m HashOrderedMap<K, V, S>) -> Self {
		let guard = epoch::pin();
		let current = map.current(&guard);
		let generation = current.id();
		let chain = current.chain() as *const InsertionChain<K, V>;
		RawIter {
			guard,
			generation,
			chain,
			last: ptr::null(),
			_map: PhantomData,
		}
	}

	/// The generation this cursor walks.
	pub fn generation(&self) -> GenerationId {
		self.generation
	}

	/// Advances to the next entry in insertion order.
	///
	/// Entries appended after the cursor reached the end of the chain are
	/// picked up, since the last link is re-read on every call.
	#[allow(clippy::should_implement_trait)]
	pub fn next(&mut self) -> Option<(&K, &V)> {
		// SAFETY: the generation, its chain and its entries stay allocated while
		// a guard pinned before the generation was retired is held, and
		// `self.guard` is one
		let next = match unsafe { self.last.as_ref() } {
			Some(last) => last.next(&self.guard),
			None => unsafe { &*self.chain }.first(&self.guard),
		}?;
		self.last = next as *const Entry<K, V>;
		Some((next.key(), next.value()))
	}
}
