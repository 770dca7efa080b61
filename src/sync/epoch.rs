//! Epoch-based memory reclamation with loom support.
//!
//! Under normal compilation, re-exports crossbeam_epoch.
//! Under `cfg(loom)`, provides a mock with the same API surface whose atomics
//! are loom's, so every pointer publication is visible to the model checker.
//!
//! # Loom Mock
//!
//! The mock never reclaims retired memory: `defer_destroy` is a no-op and a
//! retired generation simply leaks for the remainder of the model run. Memory
//! owned by a structure that is dropped normally (an insertion chain, a map
//! root) is still released through `Shared::into_owned`.

// Allow unused items - some are only used under loom cfg
#![allow(unused)]

#[cfg(not(loom))]
pub use crossbeam_epoch::{pin, unprotected, Atomic, CompareExchangeError, Guard, Owned, Shared};

#[cfg(loom)]
mod mock_epoch {
	use std::marker::PhantomData;
	use std::ptr;

	use loom::sync::atomic::AtomicPtr;

	use crate::sync::Ordering;

	/// Marker standing in for a pinned participant.
	pub struct Guard {
		_private: (),
	}

	static UNPROTECTED: Guard = Guard {
		_private: (),
	};

	impl Guard {
		/// Retired memory is leaked under the mock.
		///
		/// # Safety
		///
		/// Same contract as `crossbeam_epoch::Guard::defer_destroy`.
		pub unsafe fn defer_destroy<T>(&self, _ptr: Shared<'_, T>) {}

		pub fn flush(&self) {}
	}

	pub fn pin() -> Guard {
		Guard {
			_private: (),
		}
	}

	/// # Safety
	///
	/// Same contract as `crossbeam_epoch::unprotected`.
	pub unsafe fn unprotected() -> &'static Guard {
		&UNPROTECTED
	}

	/// Conversion between owning or borrowed pointers and raw pointers, the
	/// subset of `crossbeam_epoch::Pointer` the crate relies on.
	pub trait Pointer<T> {
		fn into_ptr(self) -> *mut T;

		/// # Safety
		///
		/// `ptr` must come from `into_ptr` on the same pointer kind.
		unsafe fn from_ptr(ptr: *mut T) -> Self;
	}

	pub struct Shared<'g, T> {
		ptr: *const T,
		_marker: PhantomData<(&'g (), *const T)>,
	}

	impl<T> Clone for Shared<'_, T> {
		fn clone(&self) -> Self {
			*self
		}
	}

	impl<T> Copy for Shared<'_, T> {}

	impl<T> PartialEq for Shared<'_, T> {
		fn eq(&self, other: &Self) -> bool {
			self.ptr == other.ptr
		}
	}

	impl<T> From<*const T> for Shared<'_, T> {
		fn from(ptr: *const T) -> Self {
			Shared {
				ptr,
				_marker: PhantomData,
			}
		}
	}

	impl<'g, T> Shared<'g, T> {
		pub fn null() -> Self {
			Shared::from(ptr::null())
		}

		pub fn is_null(&self) -> bool {
			self.ptr.is_null()
		}

		pub fn as_raw(&self) -> *const T {
			self.ptr
		}

		/// # Safety
		///
		/// The pointer must be non-null and valid for `'g`.
		pub unsafe fn deref(&self) -> &'g T {
			&*self.ptr
		}

		/// # Safety
		///
		/// If non-null, the pointer must be valid for `'g`.
		pub unsafe fn as_ref(&self) -> Option<&'g T> {
			self.ptr.as_ref()
		}

		/// # Safety
		///
		/// The caller must be the only owner of the pointee.
		pub unsafe fn into_owned(self) -> Owned<T> {
			Owned::from_ptr(self.ptr as *mut T)
		}
	}

	impl<T> Pointer<T> for Shared<'_, T> {
		fn into_ptr(self) -> *mut T {
			self.ptr as *mut T
		}

		unsafe fn from_ptr(ptr: *mut T) -> Self {
			Shared::from(ptr as *const T)
		}
	}

	pub struct Owned<T> {
		data: Box<T>,
	}

	impl<T> Owned<T> {
		pub fn new(value: T) -> Self {
			Owned {
				data: Box::new(value),
			}
		}

		pub fn into_shared<'g>(self, _guard: &'g Guard) -> Shared<'g, T> {
			Shared::from(Box::into_raw(self.data) as *const T)
		}

		pub fn into_box(self) -> Box<T> {
			self.data
		}
	}

	impl<T> Pointer<T> for Owned<T> {
		fn into_ptr(self) -> *mut T {
			Box::into_raw(self.data)
		}

		unsafe fn from_ptr(ptr: *mut T) -> Self {
			Owned {
				data: Box::from_raw(ptr),
			}
		}
	}

	impl<T> std::ops::Deref for Owned<T> {
		type Target = T;
		fn deref(&self) -> &T {
			&self.data
		}
	}

	impl<T> std::ops::DerefMut for Owned<T> {
		fn deref_mut(&mut self) -> &mut T {
			&mut self.data
		}
	}

	/// Atomic pointer that, like crossbeam's, never frees its pointee on drop.
	pub struct Atomic<T> {
		ptr: AtomicPtr<T>,
	}

	unsafe impl<T: Send + Sync> Send for Atomic<T> {}
	unsafe impl<T: Send + Sync> Sync for Atomic<T> {}

	impl<T> Atomic<T> {
		pub fn null() -> Self {
			Atomic {
				ptr: AtomicPtr::new(ptr::null_mut()),
			}
		}

		pub fn new(value: T) -> Self {
			Atomic {
				ptr: AtomicPtr::new(Box::into_raw(Box::new(value))),
			}
		}

		pub fn load<'g>(&self, order: Ordering, _guard: &'g Guard) -> Shared<'g, T> {
			Shared::from(self.ptr.load(order) as *const T)
		}

		pub fn swap<'g, P: Pointer<T>>(
			&self,
			new: P,
			order: Ordering,
			_guard: &'g Guard,
		) -> Shared<'g, T> {
			Shared::from(self.ptr.swap(new.into_ptr(), order) as *const T)
		}

		pub fn compare_exchange<'g, P: Pointer<T>>(
			&self,
			current: Shared<'_, T>,
			new: P,
			success: Ordering,
			failure: Ordering,
			_guard: &'g Guard,
		) -> Result<Shared<'g, T>, CompareExchangeError<'g, T, P>> {
			let new = new.into_ptr();
			match self.ptr.compare_exchange(current.as_raw() as *mut T, new, success, failure) {
				Ok(_) => Ok(Shared::from(new as *const T)),
				Err(found) => Err(CompareExchangeError {
					current: Shared::from(found as *const T),
					// SAFETY: `new` came from `into_ptr` just above and was not published
					new: unsafe { P::from_ptr(new) },
				}),
			}
		}
	}

	pub struct CompareExchangeError<'g, T, P: Pointer<T>> {
		pub current: Shared<'g, T>,
		pub new: P,
	}
}

#[cfg(loom)]
pub use mock_epoch::*;
