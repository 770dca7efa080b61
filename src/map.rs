//! The lock-free, insertion-ordered hash map.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use tracing::debug;

use crate::entry::Entry;
use crate::error::Result;
use crate::generation::{Generation, GenerationId};
use crate::index::InsertOutcome;
use crate::iter::RawIter;
use crate::slot::Slot;
use crate::sync::epoch::{self, Guard, Owned};
use crate::sync::{AtomicU64, Ordering};
use crate::{DefaultHashBuilder, DEFAULT_CAPACITY};

/// A concurrent, insert-only hash map that remembers insertion order.
///
/// # Structure
///
/// The map's root is an atomic slot pointing at the current generation: one
/// fixed-capacity hash index for lookups and one insertion chain for ordered
/// traversal. Entries are published in the index first and appended to the
/// chain second, so a `get` may briefly see an entry that
/// [`for_each_in_order`](Self::for_each_in_order) does not list yet.
///
/// [`clear`](Self::clear) swaps the root to a fresh, empty generation in one
/// atomic step. Operations that already loaded the old generation finish
/// against it; the old generation is freed through epoch-based reclamation once
/// no such operation is left.
///
/// # Type Parameters
///
/// - `K`: key type, `Hash + Eq`.
/// - `V`: value type. Reads hand out clones, so most methods need `V: Clone`;
///   [`lookup`](Self::lookup) borrows instead.
/// - `S`: hash builder, [`DefaultHashBuilder`] unless chosen explicitly.
///
/// # Example
///
/// ```
/// use hashorder::HashOrderedMap;
///
/// let map: HashOrderedMap<&str, u32> = HashOrderedMap::new();
///
/// assert_eq!(map.put_if_absent("a", 1).unwrap(), 1);
/// assert_eq!(map.put_if_absent("a", 2).unwrap(), 1); // first insert wins
/// assert_eq!(map.get(&"a"), Some(1));
///
/// let mut keys = Vec::new();
/// map.for_each_in_order(|k, _| keys.push(*k));
/// assert_eq!(keys, ["a"]);
///
/// map.clear();
/// assert_eq!(map.get(&"a"), None);
/// ```
pub struct HashOrderedMap<K, V, S = DefaultHashBuilder> {
	root: Slot<Generation<K, V>>,
	next_generation: AtomicU64,
	capacity: usize,
	hasher: S,
}

impl<K, V> HashOrderedMap<K, V, DefaultHashBuilder> {
	/// Creates a map with [`DEFAULT_CAPACITY`] buckets per generation.
	pub fn new() -> Self {
		Self::with_capacity(DEFAULT_CAPACITY)
	}

	/// Creates a map whose generations hold `capacity` buckets, rounded up to a
	/// power of two.
	///
	/// The capacity is fixed: inserting more distinct keys than buckets fails
	/// with [`Error::CapacityExceeded`](crate::Error::CapacityExceeded).
	pub fn with_capacity(capacity: usize) -> Self {
		Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
	}
}

impl<K, V, S> HashOrderedMap<K, V, S> {
	/// Creates a map with the given per-generation capacity and hash builder.
	pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
		let capacity = capacity.max(1).next_power_of_two();
		HashOrderedMap {
			root: Slot::new(Generation::new(GenerationId(0), capacity)),
			next_generation: AtomicU64::new(1),
			capacity,
			hasher,
		}
	}

	/// Number of buckets in every generation's hash index.
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn hasher(&self) -> &S {
		&self.hasher
	}

	/// Identifier of the generation currently installed.
	pub fn generation(&self) -> GenerationId {
		let guard = &epoch::pin();
		self.current(guard).id()
	}

	/// Returns `true` if no entry has been appended to the current generation.
	///
	/// Follows the insertion chain, so an insert that is visible to `get` but
	/// not yet appended still counts as empty.
	pub fn is_empty(&self) -> bool {
		let guard = &epoch::pin();
		self.current(guard).chain().is_empty(guard)
	}

	/// Calls `visitor` for every entry of the current generation, oldest first.
	///
	/// Runs concurrently with inserts: the visitor sees a consistent prefix of
	/// the chain. If `clear` runs meanwhile, the traversal finishes over the
	/// generation it started on.
	pub fn for_each_in_order<F>(&self, mut visitor: F)
	where
		F: FnMut(&K, &V),
	{
		let guard = &epoch::pin();
		self.current(guard).chain().for_each(guard, |entry| visitor(entry.key(), entry.value()));
	}

	/// Returns a cursor over the current generation in insertion order.
	pub fn raw_iter(&self) -> RawIter<'_, K, V> {
		RawIter::new(self)
	}

	/// Replaces the current generation with an empty one.
	///
	/// Safe to call from any number of threads. Inserts and lookups that already
	/// loaded the previous generation complete against it, and their effects are
	/// not visible through the map afterwards.
	pub fn clear(&self) {
		let guard = &epoch::pin();
		let id = GenerationId(self.next_generation.fetch_add(1, Ordering::Relaxed));
		let retired = self.root.replace(Owned::new(Generation::new(id, self.capacity)), guard);
		// SAFETY: the old generation is no longer reachable from the root;
		// threads that loaded it are pinned and keep it alive until they unpin
		unsafe { guard.defer_destroy(retired) };
		debug!(generation = id.get(), "installed empty generation");
	}

	/// The generation installed at the time of the call.
	#[inline]
	pub(crate) fn current<'g>(&self, guard: &'g Guard) -> &'g Generation<K, V> {
		match self.root.get(guard) {
			Some(generation) => generation,
			None => unreachable!("map root is only emptied by drop"),
		}
	}
}

impl<K, V, S> HashOrderedMap<K, V, S>
where
	K: Hash + Eq,
	S: BuildHasher,
{
	#[inline]
	fn hash<Q: ?Sized + Hash>(&self, key: &Q) -> u64 {
		self.hasher.hash_one(key)
	}

	/// Looks up `key` and passes the stored value to `f`.
	///
	/// The value is borrowed only for the duration of the closure, which allows
	/// reads without `V: Clone`.
	///
	/// # Example
	///
	/// ```
	/// use hashorder::HashOrderedMap;
	///
	/// let map: HashOrderedMap<u32, Vec<u8>> = HashOrderedMap::new();
	/// map.put_if_absent(1, vec![1, 2, 3]).unwrap();
	///
	/// assert_eq!(map.lookup(&1, |v| v.len()), Some(3));
	/// assert_eq!(map.lookup(&2, |v| v.len()), None);
	/// ```
	pub fn lookup<Q, R, F>(&self, key: &Q, f: F) -> Option<R>
	where
		K: Borrow<Q>,
		Q: ?Sized + Hash + Eq,
		F: FnOnce(&V) -> R,
	{
		let guard = &epoch::pin();
		let hash = self.hash(key);
		self.current(guard).index().lookup(hash, key, guard).map(|entry| f(entry.value()))
	}

	/// Returns a clone of the value stored for `key`.
	pub fn get<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Hash + Eq,
		V: Clone,
	{
		self.lookup(key, V::clone)
	}

	pub fn contains_key<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: ?Sized + Hash + Eq,
	{
		self.lookup(key, |_| ()).is_some()
	}

	/// Inserts `value` for `key` unless the key is already present, and returns
	/// the value the key maps to afterwards.
	///
	/// Concurrent calls for the same key race on a single compare-and-swap in
	/// the hash index: exactly one of them inserts, and all of them return the
	/// winner's value. A stored value is never replaced.
	///
	/// # Errors
	///
	/// [`Error::CapacityExceeded`](crate::Error::CapacityExceeded) if the key
	/// is new and every bucket of the current generation is taken.
	pub fn put_if_absent(&self, key: K, value: V) -> Result<V>
	where
		V: Clone,
	{
		let guard = &epoch::pin();
		let hash = self.hash(&key);
		let generation = self.current(guard);
		let candidate = Owned::new(Entry::new(hash, key, value));

		match generation.index().try_insert(candidate, guard)? {
			InsertOutcome::Inserted(entry) => {
				// SAFETY: the entry was allocated above and has just been
				// published, so this is its one and only append
				unsafe { generation.chain().append(entry, guard) };
				Ok(entry.value().clone())
			}
			InsertOutcome::AlreadyPresent(existing) => Ok(existing.value().clone()),
		}
	}
}

impl<K, V> Default for HashOrderedMap<K, V, DefaultHashBuilder> {
	fn default() -> Self {
		Self::new()
	}
}

impl<K, V, S> Drop for HashOrderedMap<K, V, S> {
	fn drop(&mut self) {
		// SAFETY: `&mut self` rules out concurrent operations, and only the root
		// points at the current generation; retired ones are owned by the epoch
		drop(unsafe { self.root.take() });
	}
}

/// Structural validation for testing.
#[cfg(any(test, feature = "test-utils"))]
impl<K: Eq + fmt::Debug, V, S> HashOrderedMap<K, V, S> {
	/// Validates the current generation. Panics with diagnostic info if any
	/// invariant is violated.
	///
	/// Call it once concurrent inserts have completed: every listed entry must
	/// be reachable through the hash index, and the index must hold nothing
	/// the insertion chain does not list.
	pub fn assert_invariants(&self) {
		let guard = &epoch::pin();
		self.current(guard).assert_invariants(guard);
	}
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for HashOrderedMap<K, V, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let guard = &epoch::pin();
		let mut map = f.debug_map();
		self.current(guard).chain().for_each(guard, |entry| {
			map.entry(entry.key(), entry.value());
		});
		map.finish()
	}
}
