//! Critical section handling for the port layer
//!
//! Masking interrupts is the only synchronization primitive: there is a single
//! executor per core. A [`CriticalSection`] saves the interrupt-enable state,
//! masks, and puts the *saved* state back when dropped, so sections nest.
//!
//! With the `profiling` feature the outermost section also measures how long
//! interrupts stayed masked.

use portable_atomic::{AtomicU32, AtomicU8, Ordering};

use crate::port::{ActivePort, Port};
use crate::types::{CpuSr, OsTs};

/// Nesting depth of live critical sections
static CS_NESTING: AtomicU8 = AtomicU8::new(0);

/// Timestamp at which interrupts were last masked
static INT_DIS_START: AtomicU32 = AtomicU32::new(0);
/// Longest masked window since the last reset by the switch hook
static INT_DIS_MAX_CUR: AtomicU32 = AtomicU32::new(0);
/// Longest masked window since boot
static INT_DIS_MAX: AtomicU32 = AtomicU32::new(0);

/// RAII guard for critical sections
///
/// When this guard is created, interrupts are disabled.
/// When it is dropped, interrupts are restored to their previous state.
pub struct CriticalSection {
    sr: CpuSr,
}

impl CriticalSection {
    /// Enter a critical section by disabling interrupts.
    ///
    /// Returns a guard that will restore interrupt state when dropped.
    #[inline(always)]
    pub fn enter() -> Self {
        let sr = ActivePort::int_disable();
        CS_NESTING.fetch_add(1, Ordering::Relaxed);
        if cfg!(feature = "profiling") && sr {
            INT_DIS_START.store(crate::ts::os_ts_get(), Ordering::Relaxed);
        }
        CriticalSection { sr }
    }

    /// Check if we're currently in a critical section
    #[inline(always)]
    pub fn is_active() -> bool {
        CS_NESTING.load(Ordering::Relaxed) > 0
    }

    /// Interrupt-enable state that will be restored on drop
    #[inline(always)]
    pub fn saved_state(&self) -> CpuSr {
        self.sr
    }
}

impl Drop for CriticalSection {
    #[inline(always)]
    fn drop(&mut self) {
        if cfg!(feature = "profiling") && self.sr {
            let elapsed = crate::ts::os_ts_get()
                .wrapping_sub(INT_DIS_START.load(Ordering::Relaxed));
            INT_DIS_MAX_CUR.fetch_max(elapsed, Ordering::Relaxed);
            INT_DIS_MAX.fetch_max(elapsed, Ordering::Relaxed);
        }
        CS_NESTING.fetch_sub(1, Ordering::Relaxed);
        ActivePort::int_restore(self.sr);
    }
}

/// Execute a closure with interrupts disabled
///
/// The closure receives a reference to the critical section guard,
/// which can be used to access [`CsCell`](crate::core::cs_cell::CsCell)
/// protected data.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    let cs = CriticalSection::enter();
    f(&cs)
}

/// Longest interrupts-disabled window since the last call, then reset it
pub fn int_dis_meas_max_cur_reset() -> OsTs {
    INT_DIS_MAX_CUR.swap(0, Ordering::Relaxed)
}

/// Longest interrupts-disabled window since boot
pub fn int_dis_meas_max() -> OsTs {
    INT_DIS_MAX.load(Ordering::Relaxed)
}

/// Clear interrupts-disabled measurements
pub fn int_dis_meas_reset() {
    INT_DIS_MAX_CUR.store(0, Ordering::Relaxed);
    INT_DIS_MAX.store(0, Ordering::Relaxed);
}

/// Check if currently executing in an ISR context
#[inline]
pub fn is_isr_context() -> bool {
    #[cfg(all(feature = "port-cortex-m", target_arch = "arm"))]
    {
        let ipsr: u32;
        unsafe {
            core::arch::asm!(
                "mrs {}, IPSR",
                out(reg) ipsr,
                options(nomem, nostack, preserves_flags)
            );
        }
        ipsr != 0
    }

    #[cfg(not(all(feature = "port-cortex-m", target_arch = "arm")))]
    {
        critical_section(|cs| crate::kernel::PORT.get(cs).int_nesting() > 0)
    }
}
