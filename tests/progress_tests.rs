//! # Progress and Reentrancy Tests
//!
//! The hash-ordered map takes no locks, so no interleaving of its operations
//! may stall. These tests detect a stuck operation with a timeout:
//!
//! - Same-thread reentrancy: inserting or clearing from inside a traversal
//! - Appends contending on a single tail
//! - Readers and writers on a nearly full index
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test progress_tests
//! ```

#![cfg(not(loom))]

use hashorder::{HashOrderedMap, MapKind};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// ===========================================================================
// Timeout Helpers
// ===========================================================================

/// Runs a closure on its own thread, panicking if it does not complete within
/// `timeout`.
fn run_with_timeout<F, R>(timeout: Duration, name: &str, f: F) -> R
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	let (tx, rx) = channel();
	let name = name.to_string();

	let handle = thread::spawn(move || {
		let result = f();
		let _ = tx.send(result);
	});

	match rx.recv_timeout(timeout) {
		Ok(result) => {
			handle.join().expect("Thread panicked");
			result
		}
		Err(RecvTimeoutError::Timeout) => {
			panic!("TIMEOUT: '{}' did not complete within {:?} - operation stalled", name, timeout);
		}
		Err(RecvTimeoutError::Disconnected) => {
			handle.join().expect("Thread panicked without sending result");
			panic!("Thread terminated unexpectedly without completing");
		}
	}
}

/// Runs `f(thread_index)` on `num_threads` threads under one shared timeout.
fn run_concurrent_with_timeout<F>(timeout: Duration, name: &str, num_threads: usize, f: F)
where
	F: Fn(usize) + Send + Sync + 'static,
{
	let f = Arc::new(f);
	let (tx, rx) = channel();

	let handles: Vec<_> = (0..num_threads)
		.map(|i| {
			let f = Arc::clone(&f);
			let tx = tx.clone();
			thread::spawn(move || {
				f(i);
				let _ = tx.send(i);
			})
		})
		.collect();
	drop(tx);

	let start = Instant::now();
	let mut completed = 0;
	while completed < num_threads {
		let remaining = timeout.saturating_sub(start.elapsed());
		match rx.recv_timeout(remaining) {
			Ok(_) => completed += 1,
			Err(RecvTimeoutError::Timeout) => panic!(
				"TIMEOUT: '{}' - only {}/{} threads completed within {:?}",
				name, completed, num_threads, timeout
			),
			Err(RecvTimeoutError::Disconnected) => break,
		}
	}

	for handle in handles {
		handle.join().expect("Thread panicked");
	}
}

// ===========================================================================
// Same-Thread Reentrancy Tests
// ===========================================================================

/// Inserting from inside a traversal neither blocks nor breaks the traversal.
#[test]
fn insert_from_inside_traversal() {
	let listed = run_with_timeout(Duration::from_secs(5), "insert_from_inside_traversal", || {
		let map: HashOrderedMap<u32, u32> = HashOrderedMap::with_capacity(256);
		for key in 0..10 {
			map.put_if_absent(key, key).unwrap();
		}

		let mut listed = Vec::new();
		map.for_each_in_order(|k, _| {
			listed.push(*k);
			if *k < 10 {
				map.put_if_absent(*k + 100, 0).unwrap();
			}
		});
		listed
	});

	// the traversal may pick up entries appended behind it, all of them in order
	assert!(listed.len() >= 10 && listed.len() <= 20);
	assert_eq!(&listed[..10], &(0..10).collect::<Vec<_>>()[..]);
	for (offset, key) in listed[10..].iter().enumerate() {
		assert_eq!(*key, 100 + offset as u32);
	}
}

/// Clearing from inside a traversal leaves the traversal on its generation.
#[test]
fn clear_from_inside_traversal() {
	let listed = run_with_timeout(Duration::from_secs(5), "clear_from_inside_traversal", || {
		let map: HashOrderedMap<u32, u32> = HashOrderedMap::with_capacity(64);
		for key in 0..20 {
			map.put_if_absent(key, key).unwrap();
		}

		let mut listed = Vec::new();
		map.for_each_in_order(|k, _| {
			if *k == 5 {
				map.clear();
				map.put_if_absent(99, 99).unwrap();
			}
			listed.push(*k);
		});
		assert_eq!(map.get(&99), Some(99));
		assert_eq!(map.get(&5), None);
		listed
	});

	assert_eq!(listed, (0..20).collect::<Vec<_>>());
}

/// A raw cursor held across inserts and clears on the same thread.
#[test]
fn cursor_held_across_mutations() {
	run_with_timeout(Duration::from_secs(5), "cursor_held_across_mutations", || {
		let map: HashOrderedMap<u32, u32> = HashOrderedMap::with_capacity(64);
		map.put_if_absent(1, 1).unwrap();

		let mut iter = map.raw_iter();
		assert_eq!(iter.next(), Some((&1, &1)));
		map.put_if_absent(2, 2).unwrap();
		assert_eq!(iter.next(), Some((&2, &2)));
		map.clear();
		map.put_if_absent(3, 3).unwrap();
		assert_eq!(iter.next(), None);
	});
}

/// The lock-free skip list baseline tolerates the same reentrancy.
#[test]
fn skiplist_insert_from_inside_traversal() {
	run_with_timeout(Duration::from_secs(5), "skiplist_insert_from_inside_traversal", || {
		let map = MapKind::SkipList.build::<u32, u32>(0);
		for key in 0..10 {
			map.put_if_absent(key, key).unwrap();
		}
		let mut count = 0;
		map.for_each_in_order(&mut |k, _| {
			count += 1;
			if *k < 10 {
				map.put_if_absent(*k + 1_000, 0).unwrap();
			}
		});
		assert!(count >= 10);
	});
}

// ===========================================================================
// Contention Tests
// ===========================================================================

/// Many threads appending at once all finish.
#[test]
fn contended_appends_complete() {
	let map = Arc::new(HashOrderedMap::<u64, u64>::with_capacity(1 << 15));
	let shared = Arc::clone(&map);
	run_concurrent_with_timeout(Duration::from_secs(30), "contended_appends_complete", 16, move |t| {
		for i in 0..1_000u64 {
			let key = (t as u64) << 32 | i;
			shared.put_if_absent(key, i).unwrap();
		}
	});

	let mut count = 0;
	map.for_each_in_order(|_, _| count += 1);
	assert_eq!(count, 16_000);
}

/// Lookups for missing keys in a nearly full index still terminate.
#[test]
fn missing_key_lookups_on_crowded_index() {
	let map = Arc::new(HashOrderedMap::<u64, u64>::with_capacity(1024));
	for key in 0..1_023 {
		map.put_if_absent(key, key).unwrap();
	}

	let shared = Arc::clone(&map);
	run_concurrent_with_timeout(Duration::from_secs(30), "missing_key_lookups_on_crowded_index", 4, move |t| {
		for i in 0..2_000u64 {
			assert_eq!(shared.get(&(10_000 + t as u64 * 2_000 + i)), None);
		}
	});

	// one bucket left: the next new key fits, the one after fails
	assert!(map.put_if_absent(5_000, 0).is_ok());
	assert!(map.put_if_absent(5_001, 0).is_err());
}

/// Concurrent clears and inserts on a tiny index make progress; inserts either
/// succeed or report the full index.
#[test]
fn tiny_index_with_clears_makes_progress() {
	let map = Arc::new(HashOrderedMap::<u64, u64>::with_capacity(8));
	run_concurrent_with_timeout(Duration::from_secs(30), "tiny_index_with_clears_makes_progress", 4, move |t| {
		for i in 0..5_000u64 {
			if t == 0 && i % 16 == 0 {
				map.clear();
			}
			let _ = map.put_if_absent(i % 64, i);
			let _ = map.get(&(i % 64));
		}
	});
}
