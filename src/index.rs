//! Fixed-capacity, open-addressed hash index.
//!
//! Buckets are [`Slot`]s that only ever move from empty to occupied, so a
//! linear probe sequence starting at `hash & mask` is stable for the lifetime
//! of the table: inserts and lookups walk exactly the same buckets, and a lookup
//! may stop at the first empty bucket because the key it is looking for can
//! never have been placed behind it.
//!
//! ```text
//!  hash(k) & mask
//!        │
//!        ▼
//!  ┌────┬────┬────┬────┬────┬────┬────┬────┐
//!  │ e₁ │ e₇ │ ∅  │ e₃ │ e₄ │ ∅  │ ∅  │ e₂ │
//!  └────┴────┴────┴────┴────┴────┴────┴────┘
//!    │    │    └─► claim with CAS, or stop the lookup here
//!    │    └─► different key, keep probing
//!    └─► different key, keep probing
//! ```
//!
//! The index does not resize. A full probe sequence is reported as
//! [`Error::CapacityExceeded`]; before that point a crowded table only makes
//! probes longer.

use std::borrow::Borrow;
use std::fmt;

use tracing::warn;

use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::slot::Slot;
use crate::sync::epoch::{Guard, Owned};

/// Result of offering an entry to the index.
#[derive(Debug)]
pub enum InsertOutcome<'g, K, V> {
	/// The candidate was published and is now the entry for its key.
	Inserted(&'g Entry<K, V>),
	/// Another entry for the same key was published first; the candidate was
	/// dropped.
	AlreadyPresent(&'g Entry<K, V>),
}

impl<'g, K, V> InsertOutcome<'g, K, V> {
	/// The entry now associated with the key, whichever call published it.
	#[cfg(test)]
	pub fn entry(&self) -> &'g Entry<K, V> {
		match *self {
			InsertOutcome::Inserted(entry) | InsertOutcome::AlreadyPresent(entry) => entry,
		}
	}

	#[cfg(test)]
	pub fn is_inserted(&self) -> bool {
		matches!(self, InsertOutcome::Inserted(_))
	}
}

/// An array of buckets pointing at entries owned by the insertion chain.
pub struct HashIndex<K, V> {
	buckets: Box<[Slot<Entry<K, V>>]>,
	mask: usize,
}

impl<K, V> HashIndex<K, V> {
	/// Creates an index with `capacity` rounded up to the next power of two.
	pub fn with_capacity(capacity: usize) -> Self {
		let capacity = capacity.max(1).next_power_of_two();
		let buckets = (0..capacity).map(|_| Slot::null()).collect::<Vec<_>>().into_boxed_slice();
		HashIndex {
			buckets,
			mask: capacity - 1,
		}
	}

	/// Number of buckets.
	#[inline]
	pub fn capacity(&self) -> usize {
		self.buckets.len()
	}

	/// The bucket indices visited for `hash`, in order. Covers every bucket
	/// exactly once.
	#[inline]
	fn probe(&self, hash: u64) -> impl Iterator<Item = usize> {
		let start = hash as usize & self.mask;
		let mask = self.mask;
		(0..self.buckets.len()).map(move |step| start.wrapping_add(step) & mask)
	}

	/// Finds the entry for `key`.
	///
	/// Never blocks and never allocates. A concurrent insert of the same key is
	/// either observed (its CAS landed first) or not.
	pub fn lookup<'g, Q>(&self, hash: u64, key: &Q, guard: &'g Guard) -> Option<&'g Entry<K, V>>
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq,
	{
		for bucket in self.probe(hash) {
			match self.buckets[bucket].get(guard) {
				None => return None,
				Some(entry) if entry.matches(hash, key) => return Some(entry),
				Some(_) => {}
			}
		}
		None
	}

	/// Publishes `candidate` unless its key is already present.
	///
	/// The first CAS to land for a key wins; every other caller gets that
	/// entry back as [`InsertOutcome::AlreadyPresent`].
	pub fn try_insert<'g>(
		&self,
		mut candidate: Owned<Entry<K, V>>,
		guard: &'g Guard,
	) -> Result<InsertOutcome<'g, K, V>>
	where
		K: Eq,
	{
		let hash = candidate.hash();
		for bucket in self.probe(hash) {
			let slot = &self.buckets[bucket];
			let occupant = match slot.get(guard) {
				Some(occupant) => occupant,
				None => {
					candidate.set_bucket(bucket);
					match slot.claim(candidate, guard) {
						Ok(published) => return Ok(InsertOutcome::Inserted(published)),
						// lost the race for this bucket, the winner may hold our key
						Err((winner, returned)) => {
							candidate = returned;
							winner
						}
					}
				}
			};

			if occupant.matches(hash, candidate.key()) {
				return Ok(InsertOutcome::AlreadyPresent(occupant));
			}
		}

		let capacity = self.capacity();
		warn!(capacity, "hash index probe sequence exhausted");
		Err(Error::CapacityExceeded {
			capacity,
		})
	}

	/// Number of occupied buckets. Walks the whole table.
	#[cfg(any(test, feature = "test-utils"))]
	pub fn occupied(&self, guard: &Guard) -> usize {
		self.buckets.iter().filter(|slot| !slot.is_null(guard)).count()
	}
}

impl<K, V> fmt::Debug for HashIndex<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HashIndex").field("capacity", &self.capacity()).finish_non_exhaustive()
	}
}
