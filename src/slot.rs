//! The atomic slot: one pointer-sized cell with lock-free compare-and-swap.
//!
//! Every other structure in the crate (hash buckets, chain links, the map's
//! generation root) is a `Slot`. A slot never frees what it points to. Memory
//! published through a slot is released either by the owner of the whole
//! structure on drop, or through `Guard::defer_destroy` once it has been
//! unlinked, which is what makes handing out `&'g T` for a pinned guard sound.
//!
//! None of the operations retry internally; retry policy belongs to the caller.

use std::fmt;

use crate::sync::epoch::{self, Atomic, Guard, Owned, Shared};
use crate::sync::Ordering;

/// An atomic, nullable pointer to a `T`.
pub struct Slot<T> {
	ptr: Atomic<T>,
}

impl<T> Slot<T> {
	/// Creates an empty slot.
	pub fn null() -> Self {
		Slot {
			ptr: Atomic::null(),
		}
	}

	/// Creates a slot that already points at a freshly allocated `value`.
	pub fn new(value: T) -> Self {
		Slot {
			ptr: Atomic::new(value),
		}
	}

	/// Loads the raw pointer with acquire ordering.
	#[inline]
	pub fn load<'g>(&self, guard: &'g Guard) -> Shared<'g, T> {
		self.ptr.load(Ordering::Acquire, guard)
	}

	/// Loads and dereferences the slot.
	#[inline]
	pub fn get<'g>(&self, guard: &'g Guard) -> Option<&'g T> {
		// SAFETY: anything stored in a slot stays allocated until it is either
		// dropped by the exclusive owner of the structure, or retired through
		// the epoch after which no newly pinned guard can reach it.
		unsafe { self.load(guard).as_ref() }
	}

	/// Returns `true` if the slot currently holds no pointer.
	#[inline]
	pub fn is_null(&self, guard: &Guard) -> bool {
		self.load(guard).is_null()
	}

	/// Replaces `expected` with `new` if the slot still holds `expected`.
	///
	/// A successful swap is released to every thread that later loads the
	/// slot; a failed one has no effect.
	#[inline]
	pub fn compare_and_swap<'g>(
		&self,
		expected: Shared<'_, T>,
		new: Shared<'g, T>,
		guard: &'g Guard,
	) -> bool {
		self.ptr.compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire, guard).is_ok()
	}

	/// Publishes `new` if the slot is empty.
	///
	/// On failure the occupant is returned together with the untouched
	/// candidate, so the caller can inspect the winner and reuse or drop its
	/// own allocation.
	pub fn claim<'g>(&self, new: Owned<T>, guard: &'g Guard) -> Result<&'g T, (&'g T, Owned<T>)> {
		match self.ptr.compare_exchange(
			Shared::null(),
			new,
			Ordering::AcqRel,
			Ordering::Acquire,
			guard,
		) {
			// SAFETY: the pointer was just published from a live allocation
			Ok(published) => Ok(unsafe { published.deref() }),
			// SAFETY: the exchange only fails on a non-null occupant
			Err(e) => Err((unsafe { e.current.deref() }, e.new)),
		}
	}

	/// Links an already published value into an empty slot.
	///
	/// Returns the occupant if another thread linked first.
	pub fn link<'g>(&self, new: &'g T, guard: &'g Guard) -> Result<(), &'g T> {
		let new = Shared::from(new as *const T);
		match self.ptr.compare_exchange(
			Shared::null(),
			new,
			Ordering::AcqRel,
			Ordering::Acquire,
			guard,
		) {
			Ok(_) => Ok(()),
			// SAFETY: the exchange only fails on a non-null occupant
			Err(e) => Err(unsafe { e.current.deref() }),
		}
	}

	/// Unconditionally installs `new`, returning the previous pointer.
	///
	/// The previous value is still reachable by threads that loaded it before
	/// the swap; it must only be freed through `Guard::defer_destroy`.
	pub fn replace<'g>(&self, new: Owned<T>, guard: &'g Guard) -> Shared<'g, T> {
		self.ptr.swap(new, Ordering::AcqRel, guard)
	}

	/// Empties the slot and takes ownership of its pointee.
	///
	/// # Safety
	///
	/// No other thread may access the slot or its pointee any more, and the
	/// pointee must not be owned by anything else.
	pub(crate) unsafe fn take(&mut self) -> Option<Owned<T>> {
		let guard = epoch::unprotected();
		let old = self.ptr.swap(Shared::null(), Ordering::Relaxed, guard);
		if old.is_null() {
			None
		} else {
			Some(old.into_owned())
		}
	}
}

impl<T> Default for Slot<T> {
	fn default() -> Self {
		Self::null()
	}
}

impl<T> fmt::Debug for Slot<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let guard = &epoch::pin();
		f.debug_tuple("Slot").field(&self.load(guard).as_raw()).finish()
	}
}
