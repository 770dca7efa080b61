//! Append-only, lock-free insertion chain.
//!
//! The chain threads every entry of a generation in the order the entries were
//! appended. It is intrusive: an [`Entry`]'s `next` slot is the link, so
//! appending never allocates.
//!
//! ```text
//!   head ──► e₁ ──► e₂ ──► e₃ ──► ∅
//!                          ▲
//!   tail (hint) ───────────┘
//! ```
//!
//! Appending follows the classic lock-free queue: CAS the `next` link of the
//! last known node from null to the new entry, then try to swing the tail hint
//! forward. A thread that finds the link already taken helps move the hint to
//! the node it found and retries from there. The hint only ever moves forward,
//! and a link is claimed by exactly one CAS, so concurrent appends never lose
//! or reorder an entry that a previous append has already linked.
//!
//! The chain owns its entries. Dropping it frees every node.

use std::fmt;

use crate::entry::Entry;
use crate::slot::Slot;
use crate::sync::epoch::{Guard, Shared};

/// Spin-then-yield backoff for contended appends.
struct Backoff {
	step: u32,
}

impl Backoff {
	const SPIN_LIMIT: u32 = 6;

	fn new() -> Self {
		Backoff {
			step: 0,
		}
	}

	fn snooze(&mut self) {
		if self.step <= Self::SPIN_LIMIT {
			for _ in 0..(1 << self.step) {
				std::hint::spin_loop();
			}
			self.step += 1;
		} else {
			crate::sync::yield_now();
		}
	}
}

/// Insertion-ordered list of the entries of one generation.
pub struct InsertionChain<K, V> {
	head: Slot<Entry<K, V>>,
	tail: Slot<Entry<K, V>>,
}

impl<K, V> InsertionChain<K, V> {
	pub fn new() -> Self {
		InsertionChain {
			head: Slot::null(),
			tail: Slot::null(),
		}
	}

	/// Links an entry at the end of the chain. From then on the chain owns it.
	///
	/// # Safety
	///
	/// `entry` must be a heap allocation made through [`Owned`](crate::sync::epoch::Owned)
	/// that nothing else will free, and it must be appended exactly once.
	pub unsafe fn append<'g>(&self, entry: &'g Entry<K, V>, guard: &'g Guard) {
		let node = Shared::from(entry as *const Entry<K, V>);
		let mut backoff = Backoff::new();
		loop {
			let tail = self.tail.load(guard);
			// SAFETY: the tail hint only points at nodes of this chain, which
			// live as long as the chain itself
			let next = match unsafe { tail.as_ref() } {
				Some(last) => &last.next,
				None => &self.head,
			};

			match next.link(entry, guard) {
				Ok(()) => {
					// best effort: a helper may already have moved the hint
					self.tail.compare_and_swap(tail, node, guard);
					return;
				}
				Err(successor) => {
					let successor = Shared::from(successor as *const Entry<K, V>);
					self.tail.compare_and_swap(tail, successor, guard);
					backoff.snooze();
				}
			}
		}
	}

	/// The oldest entry, if any.
	#[inline]
	pub fn first<'g>(&self, guard: &'g Guard) -> Option<&'g Entry<K, V>> {
		self.head.get(guard)
	}

	/// Visits entries from oldest to newest.
	///
	/// Safe to run concurrently with appends: the traversal sees a consistent
	/// prefix, and may or may not see entries appended while it runs.
	pub fn for_each<'g, F>(&self, guard: &'g Guard, mut visitor: F)
	where
		K: 'g,
		V: 'g,
		F: FnMut(&'g Entry<K, V>),
	{
		let mut cursor = self.first(guard);
		while let Some(entry) = cursor {
			visitor(entry);
			cursor = entry.next(guard);
		}
	}

	#[inline]
	pub fn is_empty(&self, guard: &Guard) -> bool {
		self.head.is_null(guard)
	}
}

impl<K, V> Default for InsertionChain<K, V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<K, V> Drop for InsertionChain<K, V> {
	fn drop(&mut self) {
		// SAFETY: `&mut self` means no thread is appending or traversing, and
		// every entry is owned by exactly one link of this chain
		let mut cursor = unsafe { self.head.take() };
		while let Some(mut node) = cursor {
			// unlink before dropping so long chains are not freed recursively
			cursor = unsafe { node.next.take() };
			drop(node);
		}
	}
}

impl<K, V> fmt::Debug for InsertionChain<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let guard = &crate::sync::epoch::pin();
		let mut len = 0usize;
		self.for_each(guard, |_| len += 1);
		f.debug_struct("InsertionChain").field("len", &len).finish()
	}
}
