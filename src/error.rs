//! # Error Types
//!
//! The map has no recoverable errors in steady state: looking up an absent key
//! yields `None`, and `put_if_absent` always settles on a value. The one core
//! failure is running out of buckets in the fixed-capacity hash index, which is
//! a sizing problem for the caller and is reported distinctly from absence.
//!
//! ```text
//! put_if_absent(k, v)
//!      │
//!      ▼
//! probe bucket sequence ───► exhausted ───► Err(CapacityExceeded)
//!      │
//!      ├──► empty bucket claimed ───► Ok(v)
//!      │
//!      └──► equal key found ────────► Ok(stored value)
//! ```
//!
//! The remaining variants belong to the workload side: selecting a map variant
//! by name and validating a [`WorkloadConfig`](crate::workload::WorkloadConfig).

use thiserror::Error;

/// Errors produced by the map and the workload driver.
#[derive(Error, Debug)]
pub enum Error {
	/// Every bucket on the probe sequence holds a different key.
	///
	/// The index never grows. Construct the map with a larger capacity, or
	/// `clear` it more often.
	#[error("hash index capacity of {capacity} buckets exceeded")]
	CapacityExceeded {
		/// Number of buckets in the exhausted index.
		capacity: usize,
	},

	/// A map variant name that does not correspond to any [`MapKind`](crate::MapKind).
	#[error("unknown map kind {0:?}")]
	UnknownMapKind(String),

	/// A workload configuration that cannot be run.
	#[error("invalid workload configuration: {0}")]
	InvalidConfig(String),

	/// A workload configuration that could not be parsed.
	#[error("malformed workload configuration: {0}")]
	Json(#[from] serde_json::Error),
}

/// A Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
