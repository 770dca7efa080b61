//! Mixed read/insert workloads for driving an [`InsertOnlyOrderedMap`].
//!
//! This is the stream of keys a benchmark feeds a map, kept apart from the
//! maps themselves: a map never knows it is being driven by a workload.
//!
//! A [`Workload`] owns a pool of random `u64` keys and a shared insert cursor.
//! The first `warmup` keys are inserted up front by [`Workload::warm_up`]; after
//! that each thread drives the map through its own [`Worker`]:
//!
//! - with probability `read_ratio` the worker reads, walking a batch of
//!   `batch_size` consecutive keys starting at a random position among the
//!   keys inserted so far;
//! - otherwise it inserts, claiming the next `batch_size` keys of the pool from
//!   the shared cursor so that no two threads insert the same batch.
//!
//! Keys are inserted with themselves as value.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::api::InsertOnlyOrderedMap;
use crate::error::{Error, Result};
use crate::sync::{AtomicUsize, Ordering};

/// Parameters of a workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadConfig {
	/// Probability of an operation being a read, in `[0, 1]`.
	pub read_ratio: f64,
	/// Number of keys in the pool.
	pub key_count: usize,
	/// Keys inserted before measurement starts.
	pub warmup: usize,
	/// Consecutive keys handled per read or insert batch.
	pub batch_size: usize,
	/// Threads used for warm-up.
	pub threads: usize,
	/// Seed of the key pool.
	pub seed: u64,
}

impl Default for WorkloadConfig {
	fn default() -> Self {
		WorkloadConfig {
			read_ratio: 0.1,
			key_count: 1 << 20,
			warmup: 100_000,
			batch_size: 100,
			threads: 4,
			seed: 42,
		}
	}
}

impl WorkloadConfig {
	/// Parses a JSON configuration; missing fields take their default.
	///
	/// ```
	/// use hashorder::workload::WorkloadConfig;
	///
	/// let config = WorkloadConfig::from_json(r#"{ "read_ratio": 0.9, "key_count": 10000, "warmup": 1000 }"#).unwrap();
	/// assert_eq!(config.read_ratio, 0.9);
	/// assert_eq!(config.batch_size, 100);
	/// ```
	pub fn from_json(json: &str) -> Result<Self> {
		let config: WorkloadConfig = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	/// Checks that the parameters describe a runnable workload.
	pub fn validate(&self) -> Result<()> {
		if !(0.0..=1.0).contains(&self.read_ratio) {
			return Err(Error::InvalidConfig(format!(
				"read_ratio must be within [0, 1], got {}",
				self.read_ratio
			)));
		}
		if self.batch_size == 0 {
			return Err(Error::InvalidConfig("batch_size must be at least 1".into()));
		}
		if self.threads == 0 {
			return Err(Error::InvalidConfig("threads must be at least 1".into()));
		}
		match self.warmup.checked_add(self.batch_size) {
			Some(needed) if needed <= self.key_count => Ok(()),
			_ => Err(Error::InvalidConfig(format!(
				"key_count {} cannot hold warmup {} plus one batch of {}",
				self.key_count, self.warmup, self.batch_size
			))),
		}
	}
}

/// The random keys a workload draws from, in insertion order.
#[derive(Debug, Clone)]
pub struct KeyPool {
	keys: Arc<[u64]>,
}

impl KeyPool {
	/// Generates `count` keys from a seeded generator.
	pub fn generate(count: usize, seed: u64) -> Self {
		let mut rng = StdRng::seed_from_u64(seed);
		KeyPool {
			keys: (0..count).map(|_| rng.random()).collect(),
		}
	}

	#[inline]
	pub fn get(&self, index: usize) -> Option<u64> {
		self.keys.get(index).copied()
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	pub fn as_slice(&self) -> &[u64] {
		&self.keys
	}
}

/// One operation produced by a [`Worker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
	Read(u64),
	Insert(u64),
}

/// Counters of a [`Worker::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
	pub reads: usize,
	/// Reads that found their key.
	pub hits: usize,
	pub inserts: usize,
	/// Whether the run stopped early because the key pool ran out.
	pub exhausted: bool,
}

/// Shared state of a workload: configuration, key pool and insert cursor.
#[derive(Debug)]
pub struct Workload {
	config: WorkloadConfig,
	keys: KeyPool,
	next_insert: AtomicUsize,
}

impl Workload {
	/// Validates `config` and generates its key pool.
	pub fn new(config: WorkloadConfig) -> Result<Self> {
		config.validate()?;
		let keys = KeyPool::generate(config.key_count, config.seed);
		Ok(Workload {
			next_insert: AtomicUsize::new(config.warmup),
			config,
			keys,
		})
	}

	pub fn config(&self) -> &WorkloadConfig {
		&self.config
	}

	pub fn keys(&self) -> &KeyPool {
		&self.keys
	}

	/// Number of pool keys handed out for insertion so far, warm-up included.
	pub fn claimed(&self) -> usize {
		self.next_insert.load(Ordering::Acquire).min(self.keys.len())
	}

	/// Rewinds the insert cursor to just after the warm-up keys, for reuse
	/// against a freshly cleared map.
	pub fn reset(&self) {
		self.next_insert.store(self.config.warmup, Ordering::Release);
	}

	/// Inserts the first `warmup` keys, split across `threads` threads.
	pub fn warm_up(&self, map: &dyn InsertOnlyOrderedMap<u64, u64>) -> Result<()> {
		let warmup = &self.keys.as_slice()[..self.config.warmup];
		let per_thread = warmup.len().div_ceil(self.config.threads).max(1);
		debug!(map = map.name(), keys = warmup.len(), threads = self.config.threads, "warming up");

		std::thread::scope(|scope| {
			let handles: Vec<_> = warmup
				.chunks(per_thread)
				.map(|chunk| {
					scope.spawn(move || -> Result<()> {
						for &key in chunk {
							map.put_if_absent(key, key)?;
						}
						trace!(keys = chunk.len(), "warm-up chunk done");
						Ok(())
					})
				})
				.collect();

			handles.into_iter().try_for_each(|handle| match handle.join() {
				Ok(result) => result,
				Err(panic) => std::panic::resume_unwind(panic),
			})
		})
	}

	/// Creates a per-thread operation generator.
	pub fn worker(&self, seed: u64) -> Worker<'_> {
		Worker {
			workload: self,
			rng: StdRng::seed_from_u64(seed),
			insert_offset: 0,
			inserts_remaining: 0,
			read_offset: 0,
			reads_remaining: 0,
		}
	}
}

/// Per-thread view of a [`Workload`], producing [`Op`]s.
#[derive(Debug)]
pub struct Worker<'w> {
	workload: &'w Workload,
	rng: StdRng,
	insert_offset: usize,
	inserts_remaining: usize,
	read_offset: usize,
	reads_remaining: usize,
}

impl Worker<'_> {
	/// Produces the next operation, or `None` once the key pool has no batch
	/// left to insert.
	pub fn next_op(&mut self) -> Option<Op> {
		let batch = self.workload.config.batch_size;

		if self.rng.random::<f64>() < self.workload.config.read_ratio {
			if self.reads_remaining == 0 {
				// start the batch far enough back that all of it was claimed
				let span = self.workload.claimed().saturating_sub(batch).max(1);
				self.read_offset = self.rng.random_range(0..span);
				self.reads_remaining = batch;
			}
			let index = self.read_offset;
			self.read_offset += 1;
			self.reads_remaining -= 1;
			self.workload.keys.get(index).map(Op::Read)
		} else {
			if self.inserts_remaining == 0 {
				let start = self.workload.next_insert.fetch_add(batch, Ordering::AcqRel);
				if start.saturating_add(batch) > self.workload.keys.len() {
					return None;
				}
				self.insert_offset = start;
				self.inserts_remaining = batch;
			}
			let index = self.insert_offset;
			self.insert_offset += 1;
			self.inserts_remaining -= 1;
			self.workload.keys.get(index).map(Op::Insert)
		}
	}

	/// Applies up to `ops` operations to `map`.
	///
	/// Stops early, with [`RunStats::exhausted`] set, when the key pool runs
	/// out. Fails if the map rejects an insert.
	pub fn run(&mut self, map: &dyn InsertOnlyOrderedMap<u64, u64>, ops: usize) -> Result<RunStats> {
		let mut stats = RunStats::default();
		for _ in 0..ops {
			match self.next_op() {
				Some(Op::Read(key)) => {
					stats.reads += 1;
					if map.get(&key).is_some() {
						stats.hits += 1;
					}
				}
				Some(Op::Insert(key)) => {
					map.put_if_absent(key, key)?;
					stats.inserts += 1;
				}
				None => {
					stats.exhausted = true;
					break;
				}
			}
		}
		Ok(stats)
	}
}
