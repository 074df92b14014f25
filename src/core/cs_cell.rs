//! Critical section protected cell
//!
//! Zero-overhead wrapper for port state that must only be touched with
//! interrupts masked.

use core::cell::UnsafeCell;
use crate::critical::CriticalSection;

/// A cell that can only be accessed within a critical section.
pub struct CsCell<T>(UnsafeCell<T>);

unsafe impl<T> Sync for CsCell<T> {}

impl<T> CsCell<T> {
    /// Create a new CsCell
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }

    /// Get a mutable reference to the inner value
    ///
    /// Only one reference obtained through the same guard may be live at a
    /// time.
    #[allow(clippy::mut_from_ref)]
    #[inline(always)]
    pub fn get(&self, _cs: &CriticalSection) -> &mut T {
        unsafe { &mut *self.0.get() }
    }

    /// Get a mutable reference from code that runs masked by construction
    /// (switch traps, interrupt prologues).
    ///
    /// # Safety
    /// Interrupts must be masked and no other reference may be live.
    #[allow(clippy::mut_from_ref)]
    #[inline(always)]
    pub unsafe fn get_unchecked(&self) -> &mut T {
        unsafe { &mut *self.0.get() }
    }

    /// Run `f` on the inner value inside a fresh critical section
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let cs = CriticalSection::enter();
        f(self.get(&cs))
    }
}
