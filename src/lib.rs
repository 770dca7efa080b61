//! # Hashorder: A Lock-Free, Insertion-Ordered Concurrent Map
//!
//! This crate provides [`HashOrderedMap`], an insert-only hash map that many
//! threads can read and write without locks, and that remembers the order in
//! which keys were first inserted. It is built for workloads that mostly look
//! keys up and insert new ones, and periodically discard everything at once,
//! such as caches that are flushed or evicted in bulk in insertion order.
//!
//! ## Design Overview
//!
//! ### Key Concepts
//!
//! **Atomic Slots**: Every shared location is a `Slot`, a pointer cell
//! that only changes through compare-and-swap. No operation takes a lock.
//!
//! **Hash Index**: A fixed-capacity, open-addressed table of slots
//! (`HashIndex`). A bucket goes from empty to occupied exactly once,
//! so the first CAS that lands for a key decides which value the key holds.
//!
//! **Insertion Chain**: An intrusive, append-only list threading every entry in
//! the order it was inserted (`InsertionChain`). Appends are lock-free,
//! traversals are wait-free and never observe a broken link.
//!
//! **Generations**: One index plus one chain form a generation. `clear` swaps in
//! an empty generation with a single atomic step; the old one is reclaimed by
//! `crossbeam_epoch` once the threads still using it have moved on.
//!
//! These building blocks hand out references derived from raw pointers, so
//! they stay private to the crate. Only the map and its cursor are exported:
//!
//! ```compile_fail
//! use hashorder::slot::Slot;
//! ```
//!
//! ### Map Structure
//!
//! ```text
//!                    ┌──────────────────┐
//!                    │    Root Slot     │  <- swapped by clear()
//!                    └────────┬─────────┘
//!                             │
//!                             ▼
//!                    ┌──────────────────┐
//!                    │    Generation    │
//!                    └───┬──────────┬───┘
//!                        │          │
//!            ┌───────────┘          └────────────┐
//!            ▼                                   ▼
//!   ┌──────────────────┐               ┌──────────────────┐
//!   │    Hash Index    │               │ Insertion Chain  │
//!   │ [∅][e₂][e₁][∅].. │               │ head ─► e₁ ─► e₂ │
//!   └──────────────────┘               └──────────────────┘
//!            │ lookups                        │ ordered traversal
//!            └──────────► same entries ◄──────┘
//! ```
//!
//! ### Inserting
//!
//! `put_if_absent` publishes a new entry in the hash index first and appends it
//! to the chain second. A concurrent `get` may therefore see an entry before
//! `for_each_in_order` lists it; once `put_if_absent` has returned, both do.
//! Two inserts that do not overlap in time are listed in the order they ran.
//!
//! ## Basic Usage
//!
//! ```
//! use hashorder::HashOrderedMap;
//!
//! let map = HashOrderedMap::with_capacity(1024);
//!
//! assert_eq!(map.put_if_absent("b", 2).unwrap(), 2);
//! assert_eq!(map.put_if_absent("a", 1).unwrap(), 1);
//! assert_eq!(map.put_if_absent("b", 3).unwrap(), 2); // never overwritten
//!
//! let mut order = Vec::new();
//! map.for_each_in_order(|k, v| order.push((*k, *v)));
//! assert_eq!(order, [("b", 2), ("a", 1)]);
//!
//! map.clear();
//! assert!(map.get(&"a").is_none());
//! ```
//!
//! ## Capacity
//!
//! The hash index never resizes. When every bucket on a key's probe sequence
//! holds another key, `put_if_absent` returns
//! [`Error::CapacityExceeded`] rather than degrading silently. Size the map for
//! the number of distinct keys expected between two `clear`s.
//!
//! ## Comparing Implementations
//!
//! [`InsertOnlyOrderedMap`] is the interface shared with two key-ordered
//! baselines, [`SkipListMap`] and [`LockedSortedMap`], and [`MapKind`] selects
//! one at runtime. The [`workload`] module generates the mixed read/insert
//! streams the benchmarks drive them with.

pub mod api;
pub mod baseline;
mod chain;
mod entry;
pub mod error;
mod generation;
mod index;
pub mod iter;
pub mod map;
mod slot;
mod sync;
pub mod workload;

pub use api::{InsertOnlyOrderedMap, MapKind};
pub use baseline::{LockedSortedMap, SkipListMap};
pub use error::{Error, Result};
pub use generation::GenerationId;
pub use iter::RawIter;
pub use map::HashOrderedMap;

/// Hash builder used by [`HashOrderedMap`] unless another one is supplied.
pub type DefaultHashBuilder = foldhash::fast::RandomState;

/// Buckets per generation for [`HashOrderedMap::new`].
pub const DEFAULT_CAPACITY: usize = 4096;
