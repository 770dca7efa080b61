//! Synchronization primitives with loom support.
//!
//! Under normal compilation, re-exports from std, parking_lot and crossbeam.
//! Under `cfg(loom)`, uses loom's equivalents so the slot, chain and map
//! protocols can be model-checked.
//!
//! Every module in this crate imports its atomics from here rather than from
//! `std::sync::atomic` directly:
//!
//! ```ignore
//! use crate::sync::{AtomicU64, Ordering};
//! use crate::sync::epoch::{self, Atomic, Guard, Owned, Shared};
//! ```

// Some items are only used under one of the two configurations
#![allow(unused)]

pub mod epoch;

// ===========================================================================
// Atomic Primitives
// ===========================================================================

#[cfg(not(loom))]
pub use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[cfg(loom)]
pub use loom::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Gives up the current time slice inside a retry loop.
///
/// Loom only explores other interleavings of a spinning thread if the spin
/// yields through loom itself.
#[inline]
pub(crate) fn yield_now() {
	#[cfg(not(loom))]
	std::thread::yield_now();
	#[cfg(loom)]
	loom::thread::yield_now();
}

// ===========================================================================
// RwLock
// ===========================================================================

// parking_lot hands out guards directly while loom wraps them in a Result,
// so loom's lock gets a thin wrapper with parking_lot's surface.

#[cfg(not(loom))]
pub use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[cfg(loom)]
mod loom_rwlock {
	use loom::sync::{
		RwLock as LoomRwLock, RwLockReadGuard as LoomReadGuard, RwLockWriteGuard as LoomWriteGuard,
	};

	/// loom's RwLock behind parking_lot's API.
	pub struct RwLock<T>(LoomRwLock<T>);

	impl<T> RwLock<T> {
		pub fn new(value: T) -> Self {
			RwLock(LoomRwLock::new(value))
		}

		pub fn read(&self) -> RwLockReadGuard<'_, T> {
			RwLockReadGuard(self.0.read().unwrap())
		}

		pub fn write(&self) -> RwLockWriteGuard<'_, T> {
			RwLockWriteGuard(self.0.write().unwrap())
		}
	}

	pub struct RwLockReadGuard<'a, T>(LoomReadGuard<'a, T>);

	impl<T> std::ops::Deref for RwLockReadGuard<'_, T> {
		type Target = T;
		fn deref(&self) -> &T {
			&self.0
		}
	}

	pub struct RwLockWriteGuard<'a, T>(LoomWriteGuard<'a, T>);

	impl<T> std::ops::Deref for RwLockWriteGuard<'_, T> {
		type Target = T;
		fn deref(&self) -> &T {
			&self.0
		}
	}

	impl<T> std::ops::DerefMut for RwLockWriteGuard<'_, T> {
		fn deref_mut(&mut self) -> &mut T {
			&mut self.0
		}
	}
}

#[cfg(loom)]
pub use loom_rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard};
