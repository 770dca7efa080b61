//! The insert-only ordered map interface shared by every implementation.
//!
//! [`HashOrderedMap`] is the implementation under design; [`SkipListMap`] and
//! [`LockedSortedMap`] are reference points. They are compared through this
//! one trait rather than a type hierarchy, and [`MapKind`] names each variant
//! so a workload can pick one at runtime.

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::str::FromStr;

use crate::baseline::{LockedSortedMap, SkipListMap};
use crate::error::{Error, Result};
use crate::map::HashOrderedMap;

/// An insert-only map with a bulk traversal order.
///
/// The trait is object safe so benchmarks can hold a
/// `Box<dyn InsertOnlyOrderedMap<K, V>>`. The meaning of "in order" depends on
/// the implementation: insertion order for [`HashOrderedMap`], key order for
/// the baselines.
pub trait InsertOnlyOrderedMap<K, V>: Send + Sync {
	/// Short, stable name of the implementation.
	fn name(&self) -> &'static str;

	/// Returns a clone of the value stored for `key`.
	fn get(&self, key: &K) -> Option<V>;

	/// Stores `value` unless `key` is present, and returns the value stored
	/// for `key` afterwards.
	fn put_if_absent(&self, key: K, value: V) -> Result<V>;

	/// Removes every entry.
	fn clear(&self);

	/// Visits every entry in the implementation's order.
	fn for_each_in_order(&self, visitor: &mut dyn FnMut(&K, &V));
}

impl<K, V, S> InsertOnlyOrderedMap<K, V> for HashOrderedMap<K, V, S>
where
	K: Hash + Eq + Send + Sync,
	V: Clone + Send + Sync,
	S: BuildHasher + Send + Sync,
{
	fn name(&self) -> &'static str {
		MapKind::HashOrdered.name()
	}

	fn get(&self, key: &K) -> Option<V> {
		HashOrderedMap::get(self, key)
	}

	fn put_if_absent(&self, key: K, value: V) -> Result<V> {
		HashOrderedMap::put_if_absent(self, key, value)
	}

	fn clear(&self) {
		HashOrderedMap::clear(self)
	}

	fn for_each_in_order(&self, visitor: &mut dyn FnMut(&K, &V)) {
		HashOrderedMap::for_each_in_order(self, visitor)
	}
}

impl<K, V> InsertOnlyOrderedMap<K, V> for SkipListMap<K, V>
where
	K: Ord + Send + Sync + 'static,
	V: Clone + Send + Sync + 'static,
{
	fn name(&self) -> &'static str {
		MapKind::SkipList.name()
	}

	fn get(&self, key: &K) -> Option<V> {
		SkipListMap::get(self, key)
	}

	fn put_if_absent(&self, key: K, value: V) -> Result<V> {
		Ok(SkipListMap::put_if_absent(self, key, value))
	}

	fn clear(&self) {
		SkipListMap::clear(self)
	}

	fn for_each_in_order(&self, visitor: &mut dyn FnMut(&K, &V)) {
		SkipListMap::for_each_in_order(self, visitor)
	}
}

impl<K, V> InsertOnlyOrderedMap<K, V> for LockedSortedMap<K, V>
where
	K: Ord + Send + Sync,
	V: Clone + Send + Sync,
{
	fn name(&self) -> &'static str {
		MapKind::LockedSorted.name()
	}

	fn get(&self, key: &K) -> Option<V> {
		LockedSortedMap::get(self, key)
	}

	fn put_if_absent(&self, key: K, value: V) -> Result<V> {
		Ok(LockedSortedMap::put_if_absent(self, key, value))
	}

	fn clear(&self) {
		LockedSortedMap::clear(self)
	}

	fn for_each_in_order(&self, visitor: &mut dyn FnMut(&K, &V)) {
		LockedSortedMap::for_each_in_order(self, visitor)
	}
}

/// The available map implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKind {
	/// [`HashOrderedMap`]: lock-free hash index plus insertion chain.
	HashOrdered,
	/// [`SkipListMap`]: lock-free skip list, key-ordered.
	SkipList,
	/// [`LockedSortedMap`]: `BTreeMap` behind a reader-writer lock, key-ordered.
	LockedSorted,
}

impl MapKind {
	/// Every variant, the implementation under design first.
	pub const ALL: [MapKind; 3] = [MapKind::HashOrdered, MapKind::SkipList, MapKind::LockedSorted];

	pub const fn name(self) -> &'static str {
		match self {
			MapKind::HashOrdered => "hash-ordered",
			MapKind::SkipList => "skiplist",
			MapKind::LockedSorted => "locked-sorted",
		}
	}

	/// Whether `for_each_in_order` follows insertion order (`true`) or key
	/// order (`false`).
	pub const fn preserves_insertion_order(self) -> bool {
		matches!(self, MapKind::HashOrdered)
	}

	/// Builds an empty map of this kind.
	///
	/// `capacity` sizes the hash index of [`MapKind::HashOrdered`] and is
	/// ignored by the baselines, which grow on demand.
	pub fn build<K, V>(self, capacity: usize) -> Box<dyn InsertOnlyOrderedMap<K, V>>
	where
		K: Hash + Ord + Send + Sync + 'static,
		V: Clone + Send + Sync + 'static,
	{
		match self {
			MapKind::HashOrdered => Box::new(HashOrderedMap::<K, V>::with_capacity(capacity)),
			MapKind::SkipList => Box::new(SkipListMap::<K, V>::new()),
			MapKind::LockedSorted => Box::new(LockedSortedMap::<K, V>::new()),
		}
	}
}

impl fmt::Display for MapKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for MapKind {
	type Err = Error;

	/// Accepts the variant names plus the short benchmark names (`NBHOM`,
	/// `CSLM`), case-insensitively.
	fn from_str(s: &str) -> Result<Self> {
		match s.trim().to_ascii_lowercase().as_str() {
			"hash-ordered" | "hashordered" | "nbhom" => Ok(MapKind::HashOrdered),
			"skiplist" | "skip-list" | "cslm" => Ok(MapKind::SkipList),
			"locked-sorted" | "locked" | "btree" => Ok(MapKind::LockedSorted),
			_ => Err(Error::UnknownMapKind(s.to_string())),
		}
	}
}

#[cfg(all(test, not(loom)))]
mod tests {
	use super::*;

	#[test]
	fn parses_names_and_aliases() {
		assert_eq!("NBHOM".parse::<MapKind>().unwrap(), MapKind::HashOrdered);
		assert_eq!("cslm".parse::<MapKind>().unwrap(), MapKind::SkipList);
		assert_eq!(" Locked ".parse::<MapKind>().unwrap(), MapKind::LockedSorted);
		for kind in MapKind::ALL {
			assert_eq!(kind.to_string().parse::<MapKind>().unwrap(), kind);
		}
		assert!(matches!("treap".parse::<MapKind>(), Err(Error::UnknownMapKind(name)) if name == "treap"));
	}

	#[test]
	fn built_maps_report_their_kind() {
		for kind in MapKind::ALL {
			let map = kind.build::<u64, u64>(64);
			assert_eq!(map.name(), kind.name());
			assert_eq!(map.put_if_absent(1, 1).unwrap(), 1);
			assert_eq!(map.put_if_absent(1, 2).unwrap(), 1);
			assert_eq!(map.get(&1), Some(1));
		}
	}
}
