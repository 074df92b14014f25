//! μC/OS-III style CPU port layer in Rust
//!
//! The architecture-dependent half of a preemptive real-time kernel:
//! - Initial stack frame construction for new tasks
//! - Context-switch protocol driven by per-architecture trap handlers
//! - Interrupt nesting tracking and the shared interrupt stack
//! - Application hook dispatch and stack redzone checking
//! - Timestamps, interrupt-masking critical sections
//! - A polled debug communication channel
//!
//! Ports exist for ARM Cortex-M, classic ARM, RISC-V RV32 and PowerPC e200;
//! on other targets a simulated CPU stands in.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![cfg_attr(all(feature = "port-ppc-e200", target_arch = "powerpc"), feature(asm_experimental_arch))]

// ============ Critical Section ============

#[cfg(any(
    all(feature = "port-cortex-m", target_arch = "arm"),
    all(feature = "port-arm", target_arch = "arm"),
    all(feature = "port-riscv32", target_arch = "riscv32"),
    all(feature = "port-ppc-e200", target_arch = "powerpc"),
))]
mod cs_impl {
    use critical_section::{set_impl, Impl, RawRestoreState};

    use crate::port::{ActivePort, Port};

    struct PortCriticalSection;
    set_impl!(PortCriticalSection);

    unsafe impl Impl for PortCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            ActivePort::int_disable()
        }

        unsafe fn release(was_active: RawRestoreState) {
            ActivePort::int_restore(was_active)
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod port;

// ============ Re-exports ============

pub use self::core::config;
pub use self::core::config::*;
pub use self::core::critical;
pub use self::core::critical::{critical_section, CriticalSection};
pub use self::core::ctx;
pub use self::core::ctx::{PortContext, SchedQuery, Scheduler, SwitchState};
pub use self::core::dcc;
pub use self::core::error;
pub use self::core::error::{PortError, PortResult};
pub use self::core::frame;
pub use self::core::frame::{ArchDescriptor, TaskStack};
pub use self::core::hooks;
pub use self::core::hooks::HookTable;
pub use self::core::kernel;
pub use self::core::kernel::{os_init, os_start};
pub use self::core::nesting;
pub use self::core::redzone;
pub use self::core::task;
pub use self::core::task::{OsTaskFn, OsTcb};
pub use self::core::ts;
pub use self::core::types;
pub use self::core::types::*;
