//! Compile-time configuration for the port layer
//!
//! These constants control resource limits and optional behaviour.

use crate::types::OsStkElement;

/// Minimum task stack size in words
pub const CFG_STK_SIZE_MIN: usize = 64;

/// Size of the shared interrupt stack in words
pub const CFG_ISR_STK_SIZE: usize = 256;

/// Deepest interrupt nesting the tracker accepts
pub const CFG_INT_NESTING_MAX: u8 = 250;

/// Number of guard words at the far end of each checked stack
pub const CFG_STK_REDZONE_DEPTH: usize = 8;

/// Pattern written into every redzone word
pub const CFG_STK_REDZONE_VAL: OsStkElement = 0xABCD_2345;

/// Fill general registers of a fresh frame with per-register patterns
pub const CFG_STK_POISON: bool = cfg!(debug_assertions);

/// Timestamp service enabled
pub const CFG_TS_EN: bool = cfg!(feature = "ts");

/// Per-task profiling fields maintained at switch time
pub const CFG_PROF_EN: bool = cfg!(feature = "profiling");

/// Redzone check on every context switch
pub const CFG_REDZONE_EN: bool = cfg!(feature = "redzone");

/// CLINT machine software interrupt pending register (hart 0)
pub const CFG_RISCV_MSIP_ADDR: usize = 0x0200_0000;
