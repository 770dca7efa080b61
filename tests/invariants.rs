//! # Structural Invariant Tests
//!
//! Tests that drive a map through its public operations and then validate the
//! links between its hash index and its insertion chain:
//!
//! - Every listed entry sits inside the table and is found by a lookup
//! - No key is listed twice
//! - Occupied buckets and listed entries agree once inserts have completed
//!
//! Requires the `test-utils` feature:
//!
//! ```bash
//! cargo test --features test-utils --test invariants
//! ```

#![cfg(not(loom))]

use hashorder::HashOrderedMap;
use rand::prelude::*;
use std::hash::{BuildHasher, Hasher};
use std::sync::Arc;
use std::thread;

/// Sends every key to the same probe start.
#[derive(Clone, Default)]
struct Colliding;

struct CollidingHasher;

impl Hasher for CollidingHasher {
	fn finish(&self) -> u64 {
		60
	}

	fn write(&mut self, _bytes: &[u8]) {}
}

impl BuildHasher for Colliding {
	type Hasher = CollidingHasher;

	fn build_hasher(&self) -> CollidingHasher {
		CollidingHasher
	}
}

// ===========================================================================
// Sequential Invariant Tests
// ===========================================================================

#[test]
fn random_inserts_hold_invariants() {
	let map: HashOrderedMap<u64, u64> = HashOrderedMap::with_capacity(512);
	let mut rng = StdRng::seed_from_u64(1);

	for _ in 0..400 {
		let key = rng.random_range(0..300u64);
		map.put_if_absent(key, key).unwrap();
	}
	map.assert_invariants();
}

#[test]
fn colliding_keys_hold_invariants() {
	let map = HashOrderedMap::with_capacity_and_hasher(64, Colliding);

	// every probe starts at bucket 60 and wraps around the end
	for key in 0..40u64 {
		assert_eq!(map.put_if_absent(key, key).unwrap(), key);
	}
	for key in 0..40u64 {
		assert_eq!(map.put_if_absent(key, 0).unwrap(), key);
	}
	map.assert_invariants();

	for key in 0..40u64 {
		assert_eq!(map.get(&key), Some(key));
	}
	assert_eq!(map.get(&40), None);
}

#[test]
fn full_map_holds_invariants() {
	let map: HashOrderedMap<u64, u64> = HashOrderedMap::with_capacity(16);
	for key in 0..16 {
		map.put_if_absent(key, key).unwrap();
	}
	assert!(map.put_if_absent(99, 99).is_err());
	map.assert_invariants();

	let mut listed = 0;
	map.for_each_in_order(|_, _| listed += 1);
	assert_eq!(listed, 16);
}

#[test]
fn clear_cycles_hold_invariants() {
	let map: HashOrderedMap<u64, u64> = HashOrderedMap::with_capacity(128);
	for round in 0..10u64 {
		for key in 0..100 {
			map.put_if_absent(key, key + round).unwrap();
		}
		map.assert_invariants();
		map.clear();
		map.assert_invariants();
	}
}

// ===========================================================================
// Concurrent Invariant Tests
// ===========================================================================

#[test]
fn concurrent_colliding_inserts_hold_invariants() {
	let map = Arc::new(HashOrderedMap::with_capacity_and_hasher(4096, Colliding));

	let handles: Vec<_> = (0..4u64)
		.map(|t| {
			let map = Arc::clone(&map);
			thread::spawn(move || {
				let mut rng = StdRng::seed_from_u64(t);
				for _ in 0..500 {
					let key = rng.random_range(0..1_000u64);
					assert_eq!(map.put_if_absent(key, key).unwrap(), key);
				}
			})
		})
		.collect();

	for h in handles {
		h.join().unwrap();
	}
	map.assert_invariants();
}

#[test]
fn concurrent_inserts_and_clears_hold_invariants() {
	let map = Arc::new(HashOrderedMap::<u64, u64>::with_capacity(8192));

	let inserters: Vec<_> = (0..4u64)
		.map(|t| {
			let map = Arc::clone(&map);
			thread::spawn(move || {
				for i in 0..2_000 {
					map.put_if_absent(i * 4 + t, i).unwrap();
				}
			})
		})
		.collect();
	let clearer = {
		let map = Arc::clone(&map);
		thread::spawn(move || {
			for _ in 0..20 {
				map.clear();
				thread::yield_now();
			}
		})
	};

	for h in inserters {
		h.join().unwrap();
	}
	clearer.join().unwrap();
	map.assert_invariants();
}
