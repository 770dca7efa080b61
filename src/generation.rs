//! Generations: one hash index and one insertion chain, swapped out as a unit.

use std::fmt;
#[cfg(any(test, feature = "test-utils"))]
use std::ptr;

use crate::chain::InsertionChain;
use crate::index::HashIndex;
#[cfg(any(test, feature = "test-utils"))]
use crate::sync::epoch::Guard;

/// Opaque identifier of one generation of a map's storage.
///
/// Every `clear` installs a generation with an id never used before by the
/// same map. Ids grow with each `clear`, though two concurrent `clear`s may
/// install theirs in either order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenerationId(pub(crate) u64);

impl GenerationId {
	/// The raw counter value.
	pub fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for GenerationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "gen#{}", self.0)
	}
}

/// The storage reachable from a map's root between two `clear`s.
///
/// Field order matters for drop: the index holds borrowed pointers into the
/// chain, so it goes first.
pub(crate) struct Generation<K, V> {
	index: HashIndex<K, V>,
	chain: InsertionChain<K, V>,
	id: GenerationId,
}

impl<K, V> Generation<K, V> {
	pub(crate) fn new(id: GenerationId, capacity: usize) -> Self {
		Generation {
			index: HashIndex::with_capacity(capacity),
			chain: InsertionChain::new(),
			id,
		}
	}

	#[inline]
	pub(crate) fn id(&self) -> GenerationId {
		self.id
	}

	#[inline]
	pub(crate) fn index(&self) -> &HashIndex<K, V> {
		&self.index
	}

	#[inline]
	pub(crate) fn chain(&self) -> &InsertionChain<K, V> {
		&self.chain
	}
}

impl<K, V> fmt::Debug for Generation<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Generation")
			.field("id", &self.id)
			.field("index", &self.index)
			.field("chain", &self.chain)
			.finish()
	}
}

// ===========================================================================
// Test-Only Validation
// ===========================================================================

#[cfg(any(test, feature = "test-utils"))]
impl<K: Eq + fmt::Debug, V> Generation<K, V> {
	/// Validates the links between the index and the chain. Panics with
	/// diagnostic info if any invariant is violated.
	///
	/// No insert may be in flight: an entry that is indexed but not yet
	/// appended shows up as a count mismatch.
	///
	/// # Invariants Checked
	///
	/// 1. Bucket bounds: every listed entry sits inside the table
	/// 2. Reachability: the index resolves every listed key to that very entry,
	///    which also rules out a key being listed twice
	/// 3. Agreement: occupied buckets and listed entries match in number
	pub(crate) fn assert_invariants(&self, guard: &Guard) {
		let capacity = self.index.capacity();
		let mut listed = 0;

		self.chain.for_each(guard, |entry| {
			listed += 1;
			assert!(
				entry.bucket() < capacity,
				"{:?} in bucket {} of {}",
				entry.key(),
				entry.bucket(),
				capacity
			);
			match self.index.lookup(entry.hash(), entry.key(), guard) {
				Some(found) => {
					assert!(ptr::eq(found, entry), "{:?} resolves to another entry", entry.key())
				}
				None => panic!("{:?} is listed but not indexed", entry.key()),
			}
		});

		assert_eq!(self.index.occupied(guard), listed, "index and chain of {} disagree", self.id);
	}
}
