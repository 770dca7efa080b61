//! Key-ordered reference implementations of the insert-only map interface.
//!
//! Both adapters keep their entries sorted by key, not by insertion time, so
//! `for_each_in_order` visits keys in ascending order. That difference from
//! [`HashOrderedMap`](crate::HashOrderedMap) is intended: the baselines exist to
//! measure what the ordering by insertion costs or saves, not to reproduce it.
//!
//! - [`SkipListMap`] wraps `crossbeam_skiplist::SkipMap`, a lock-free sorted
//!   structure.
//! - [`LockedSortedMap`] wraps a `BTreeMap` behind a `parking_lot::RwLock`.
//!
//! Neither has a capacity limit, so `put_if_absent` never fails.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use crossbeam_skiplist::SkipMap;

use crate::sync::RwLock;

/// Insert-only adapter over a concurrent skip list.
pub struct SkipListMap<K, V> {
	inner: SkipMap<K, V>,
}

impl<K, V> SkipListMap<K, V>
where
	K: Ord + Send + 'static,
	V: Send + 'static,
{
	pub fn new() -> Self {
		SkipListMap {
			inner: SkipMap::new(),
		}
	}

	pub fn get<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
		V: Clone,
	{
		self.inner.get(key).map(|entry| entry.value().clone())
	}

	/// Inserts unless present; returns the value stored afterwards.
	pub fn put_if_absent(&self, key: K, value: V) -> V
	where
		V: Clone,
	{
		self.inner.get_or_insert(key, value).value().clone()
	}

	pub fn clear(&self) {
		self.inner.clear();
	}

	/// Visits entries in ascending key order.
	pub fn for_each_in_order<F>(&self, mut visitor: F)
	where
		F: FnMut(&K, &V),
	{
		for entry in self.inner.iter() {
			visitor(entry.key(), entry.value());
		}
	}
}

impl<K, V> Default for SkipListMap<K, V>
where
	K: Ord + Send + 'static,
	V: Send + 'static,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<K, V> fmt::Debug for SkipListMap<K, V>
where
	K: Ord + fmt::Debug,
	V: fmt::Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut map = f.debug_map();
		for entry in self.inner.iter() {
			map.entry(entry.key(), entry.value());
		}
		map.finish()
	}
}

/// Insert-only adapter over a `BTreeMap` guarded by a reader-writer lock.
pub struct LockedSortedMap<K, V> {
	inner: RwLock<BTreeMap<K, V>>,
}

impl<K: Ord, V> LockedSortedMap<K, V> {
	pub fn new() -> Self {
		LockedSortedMap {
			inner: RwLock::new(BTreeMap::new()),
		}
	}

	pub fn get<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Ord,
		V: Clone,
	{
		self.inner.read().get(key).cloned()
	}

	/// Inserts unless present; returns the value stored afterwards.
	///
	/// Present keys are answered under the shared lock. Only a miss takes the
	/// exclusive lock, and re-checks under it.
	pub fn put_if_absent(&self, key: K, value: V) -> V
	where
		V: Clone,
	{
		if let Some(existing) = self.inner.read().get(&key) {
			return existing.clone();
		}
		self.inner.write().entry(key).or_insert(value).clone()
	}

	pub fn clear(&self) {
		self.inner.write().clear();
	}

	/// Visits entries in ascending key order.
	///
	/// Holds the shared lock for the whole traversal; inserts wait for it.
	pub fn for_each_in_order<F>(&self, mut visitor: F)
	where
		F: FnMut(&K, &V),
	{
		for (key, value) in self.inner.read().iter() {
			visitor(key, value);
		}
	}
}

impl<K: Ord, V> Default for LockedSortedMap<K, V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for LockedSortedMap<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.inner.read().iter()).finish()
	}
}
