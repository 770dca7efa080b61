//! Map entries.
//!
//! An entry is allocated once per successful insert and is immutable once it
//! has been published in the hash index. The same allocation is the node of the
//! insertion chain: `next` is the chain's forward link.

use std::borrow::Borrow;
use std::fmt;

use crate::slot::Slot;
use crate::sync::epoch::Guard;

/// One key-value pair, linked into both the hash index and the insertion chain
/// of a single generation.
pub struct Entry<K, V> {
	hash: u64,
	bucket: usize,
	key: K,
	value: V,
	pub(crate) next: Slot<Entry<K, V>>,
}

impl<K, V> Entry<K, V> {
	/// Creates an unpublished entry for a key with the given hash.
	pub fn new(hash: u64, key: K, value: V) -> Self {
		Entry {
			hash,
			bucket: 0,
			key,
			value,
			next: Slot::null(),
		}
	}

	#[inline]
	pub fn key(&self) -> &K {
		&self.key
	}

	#[inline]
	pub fn value(&self) -> &V {
		&self.value
	}

	/// The hash the entry was indexed under.
	#[inline]
	pub fn hash(&self) -> u64 {
		self.hash
	}

	/// Index of the hash bucket holding this entry.
	///
	/// Only meaningful once the entry has been published.
	#[cfg(any(test, feature = "test-utils"))]
	#[inline]
	pub fn bucket(&self) -> usize {
		self.bucket
	}

	/// Records the bucket about to be claimed. Only called before publication.
	#[inline]
	pub(crate) fn set_bucket(&mut self, bucket: usize) {
		self.bucket = bucket;
	}

	/// The entry appended right after this one, if any.
	#[inline]
	pub fn next<'g>(&self, guard: &'g Guard) -> Option<&'g Entry<K, V>> {
		self.next.get(guard)
	}

	#[inline]
	pub(crate) fn matches<Q>(&self, hash: u64, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq,
	{
		// the cached hash rejects almost every mismatch without touching the key
		self.hash == hash && self.key.borrow() == key
	}
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Entry<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Entry")
			.field("key", &self.key)
			.field("value", &self.value)
			.field("bucket", &self.bucket)
			.finish()
	}
}

#[cfg(all(test, not(loom)))]
mod tests {
	use super::*;

	#[test]
	fn matches_requires_hash_and_key() {
		let entry = Entry::new(7, String::from("a"), 1);
		assert!(entry.matches(7, "a"));
		assert!(!entry.matches(8, "a"));
		assert!(!entry.matches(7, "b"));
	}

	#[test]
	fn fresh_entry_is_unlinked() {
		let mut entry = Entry::new(1, 1u64, 2u64);
		entry.set_bucket(5);
		let guard = &crate::sync::epoch::pin();
		assert_eq!(entry.bucket(), 5);
		assert!(entry.next(guard).is_none());
	}
}
