//! Port layer - CPU-specific implementations
//!
//! Every architecture contributes two halves:
//!
//! - a [`ArchDescriptor`](crate::frame::ArchDescriptor) describing its saved
//!   register image (compiled everywhere, so layouts are testable on the host)
//! - a [`Port`] implementation driving the real hardware, compiled only for
//!   the matching target
//!
//! The active port is picked with a `port-*` Cargo feature. On any other
//! target the [`host`] port simulates the CPU.

use crate::frame::ArchDescriptor;
use crate::types::{CpuSr, OsStkElement, OsTs};

pub mod arm;
pub mod cortex_m4;
pub mod host;
pub mod ppc_e200;
pub mod riscv32;

#[cfg(any(
    all(feature = "port-cortex-m", any(feature = "port-arm", feature = "port-riscv32", feature = "port-ppc-e200")),
    all(feature = "port-arm", any(feature = "port-riscv32", feature = "port-ppc-e200")),
    all(feature = "port-riscv32", feature = "port-ppc-e200"),
))]
compile_error!("select exactly one `port-*` feature");

/// CPU operations the architecture-independent core relies on.
///
/// All methods are associated functions: a CPU is a process-wide singleton.
pub trait Port: 'static {
    /// Saved register image layout
    type Arch: ArchDescriptor;

    /// Mask interrupts, returning whether they were enabled before.
    fn int_disable() -> CpuSr;

    /// Restore the interrupt-enable state saved by [`Port::int_disable`].
    fn int_restore(sr: CpuSr);

    /// Free-running cycle counter.
    fn ts_read() -> OsTs;

    /// Raise the task-level context switch trap.
    fn ctx_sw();

    /// Request a context switch on the way out of the outermost interrupt.
    fn int_ctx_sw();

    /// Move the active stack pointer onto the shared interrupt stack.
    ///
    /// Cores that bank a dedicated interrupt stack pointer in hardware leave
    /// this empty.
    fn isr_stack_switch(_top: *mut OsStkElement) {}

    /// Restore the first task prepared by the core and never return.
    ///
    /// # Safety
    /// The core must have prepared a pending switch to a task with a valid
    /// frame, and interrupts must be masked.
    unsafe fn start_high_rdy(isr_top: *mut OsStkElement) -> !;

    /// Wait for the next interrupt.
    fn idle();

    /// Service an on-chip debug channel, if the core has one.
    fn debug_poll() {}

    /// Halt after an unrecoverable error.
    fn fatal() -> !;
}

// ============ Port selection ============

#[cfg(all(feature = "port-cortex-m", target_arch = "arm"))]
pub type ActivePort = cortex_m4::CortexM4;

#[cfg(all(feature = "port-arm", target_arch = "arm"))]
pub type ActivePort = arm::ArmClassic;

#[cfg(all(feature = "port-riscv32", target_arch = "riscv32"))]
pub type ActivePort = riscv32::Rv32;

#[cfg(all(feature = "port-ppc-e200", target_arch = "powerpc"))]
pub type ActivePort = ppc_e200::E200;

#[cfg(not(any(
    all(feature = "port-cortex-m", target_arch = "arm"),
    all(feature = "port-arm", target_arch = "arm"),
    all(feature = "port-riscv32", target_arch = "riscv32"),
    all(feature = "port-ppc-e200", target_arch = "powerpc"),
)))]
pub type ActivePort = host::HostPort;
