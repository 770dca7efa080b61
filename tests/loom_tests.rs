//! Loom-based concurrency tests for hashorder.
//!
//! These tests use loom to systematically explore all possible thread
//! interleavings of the map's public operations. The slot and chain
//! protocols underneath are modelled by the `loom_tests` modules inside
//! `src/slot.rs` and `src/chain.rs`.
//!
//! # Running Loom Tests
//!
//! Loom tests must be run with the `loom` cfg flag:
//!
//! ```bash
//! RUSTFLAGS="--cfg loom" cargo test --lib --test loom_tests --release -- --test-threads=1
//! ```
//!
//! # Test Design
//!
//! Loom tests should be kept small (2-3 threads, few operations) because
//! the number of possible interleavings grows exponentially.
//!
//! # Limitations
//!
//! Under loom, epoch reclamation is replaced by a mock that never frees a
//! retired generation, so these tests cover the publication protocol and not
//! reclamation. `memory_tests` covers the latter against crossbeam_epoch.

#![cfg(loom)]

use hashorder::HashOrderedMap;
use loom::sync::Arc;
use loom::thread;

type FixedMap<K, V> = HashOrderedMap<K, V, foldhash::fast::FixedState>;

fn fixed_map<K, V>(capacity: usize) -> FixedMap<K, V> {
	HashOrderedMap::with_capacity_and_hasher(capacity, foldhash::fast::FixedState::default())
}

// ===========================================================================
// Map Tests Under Loom
// ===========================================================================

/// Concurrent inserts of the same key agree on one winner.
#[test]
fn loom_map_put_if_absent_single_winner() {
	loom::model(|| {
		let map = Arc::new(fixed_map::<u32, u32>(4));

		let handles: Vec<_> = [10u32, 20]
			.into_iter()
			.map(|value| {
				let map = Arc::clone(&map);
				thread::spawn(move || map.put_if_absent(7, value).unwrap())
			})
			.collect();

		let results: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
		let stored = map.get(&7).unwrap();
		assert!(stored == 10 || stored == 20);
		assert_eq!(results, vec![stored, stored]);

		let mut listed = Vec::new();
		map.for_each_in_order(|k, v| listed.push((*k, *v)));
		assert_eq!(listed, vec![(7, stored)]);
	});
}

/// Inserts of different keys are both listed once they complete.
#[test]
fn loom_map_distinct_keys_both_listed() {
	loom::model(|| {
		let map = Arc::new(fixed_map::<u32, u32>(4));

		let handles: Vec<_> = [1u32, 2]
			.into_iter()
			.map(|key| {
				let map = Arc::clone(&map);
				thread::spawn(move || map.put_if_absent(key, key).unwrap())
			})
			.collect();
		for h in handles {
			h.join().unwrap();
		}

		let mut listed = Vec::new();
		map.for_each_in_order(|k, _| listed.push(*k));
		listed.sort_unstable();
		assert_eq!(listed, vec![1, 2]);
		assert_eq!(map.get(&1), Some(1));
		assert_eq!(map.get(&2), Some(2));
	});
}

/// An insert racing a clear lands in exactly one generation; the current one
/// is consistent between lookup and traversal either way.
#[test]
fn loom_map_insert_races_clear() {
	loom::model(|| {
		let map = Arc::new(fixed_map::<u32, u32>(4));

		let inserter = {
			let map = Arc::clone(&map);
			thread::spawn(move || map.put_if_absent(1, 1).unwrap())
		};
		let clearer = {
			let map = Arc::clone(&map);
			thread::spawn(move || map.clear())
		};

		assert_eq!(inserter.join().unwrap(), 1);
		clearer.join().unwrap();

		let mut listed = Vec::new();
		map.for_each_in_order(|k, _| listed.push(*k));
		match map.get(&1) {
			Some(1) => assert_eq!(listed, vec![1]),
			None => assert!(listed.is_empty()),
			other => panic!("unexpected value {:?}", other),
		}
	});
}
