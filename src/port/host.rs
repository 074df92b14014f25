//! Host port
//!
//! Simulated CPU used on targets without a hardware port (development and
//! `cargo test`). It keeps an interrupt-enable flag, a manually advanced cycle
//! counter and counts trap requests so the core can be observed from tests.
//! There is no restore sequence: starting the first task panics.

use portable_atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use super::cortex_m4::ArmV7mFrame;
use super::Port;
use crate::types::{CpuSr, OsStkElement, OsTs};

static INT_ENABLED: AtomicBool = AtomicBool::new(true);
static CYCLES: AtomicU32 = AtomicU32::new(0);
static CTX_SW_REQ: AtomicU32 = AtomicU32::new(0);
static INT_CTX_SW_REQ: AtomicU32 = AtomicU32::new(0);
static ISR_STK_SWITCHES: AtomicU32 = AtomicU32::new(0);
static ISR_STK_TOP: AtomicUsize = AtomicUsize::new(0);

/// Simulated CPU
pub struct HostPort;

impl Port for HostPort {
    type Arch = ArmV7mFrame;

    fn int_disable() -> CpuSr {
        INT_ENABLED.swap(false, Ordering::SeqCst)
    }

    fn int_restore(sr: CpuSr) {
        INT_ENABLED.store(sr, Ordering::SeqCst);
    }

    fn ts_read() -> OsTs {
        CYCLES.load(Ordering::Relaxed)
    }

    fn ctx_sw() {
        CTX_SW_REQ.fetch_add(1, Ordering::Relaxed);
    }

    fn int_ctx_sw() {
        INT_CTX_SW_REQ.fetch_add(1, Ordering::Relaxed);
    }

    fn isr_stack_switch(top: *mut OsStkElement) {
        ISR_STK_TOP.store(top as usize, Ordering::Relaxed);
        ISR_STK_SWITCHES.fetch_add(1, Ordering::Relaxed);
    }

    unsafe fn start_high_rdy(_isr_top: *mut OsStkElement) -> ! {
        panic!("start_high_rdy not available on this platform");
    }

    fn idle() {
        core::hint::spin_loop();
    }

    fn fatal() -> ! {
        panic!("fatal port error");
    }
}

/// Inspection and control of the simulated CPU
pub mod sim {
    use super::*;

    /// Whether the simulated interrupt flag is set
    pub fn interrupts_enabled() -> bool {
        INT_ENABLED.load(Ordering::SeqCst)
    }

    /// Set the cycle counter
    pub fn set_cycles(value: OsTs) {
        CYCLES.store(value, Ordering::Relaxed);
    }

    /// Advance the cycle counter
    pub fn advance_cycles(delta: OsTs) {
        CYCLES.fetch_add(delta, Ordering::Relaxed);
    }

    /// Task-level switch traps raised so far
    pub fn ctx_sw_requests() -> u32 {
        CTX_SW_REQ.load(Ordering::Relaxed)
    }

    /// Interrupt-exit switch requests raised so far
    pub fn int_ctx_sw_requests() -> u32 {
        INT_CTX_SW_REQ.load(Ordering::Relaxed)
    }

    /// Times the interrupt stack was entered
    pub fn isr_stack_switches() -> u32 {
        ISR_STK_SWITCHES.load(Ordering::Relaxed)
    }

    /// Stack pointer loaded by the last interrupt stack switch
    pub fn isr_stack_top() -> usize {
        ISR_STK_TOP.load(Ordering::Relaxed)
    }

    /// Return the simulated CPU to its reset state
    pub fn reset() {
        INT_ENABLED.store(true, Ordering::SeqCst);
        CYCLES.store(0, Ordering::Relaxed);
        CTX_SW_REQ.store(0, Ordering::Relaxed);
        INT_CTX_SW_REQ.store(0, Ordering::Relaxed);
        ISR_STK_SWITCHES.store(0, Ordering::Relaxed);
        ISR_STK_TOP.store(0, Ordering::Relaxed);
    }
}
