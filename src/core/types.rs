//! Core type definitions for the port layer
//!
//! These types give the port contract strong, architecture-neutral names.

/// Stack element type (one machine word on every supported 32-bit core)
pub type OsStkElement = u32;

/// Saved interrupt-enable state returned by a mask operation.
///
/// `true` means interrupts were enabled before masking.
pub type CpuSr = bool;

/// Timestamp counter value
pub type OsTs = u32;

/// Accumulated cycle counter
pub type OsCycles = u64;

/// Interrupt nesting counter
pub type OsNestingCtr = u8;

/// Context switch counter
pub type OsCtxSwCtr = u32;

/// Option flags for task creation
pub type OsOpt = u16;

/// Stack growth direction of an architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackGrowth {
    /// Push decrements the stack pointer (most cores)
    Descending,
    /// Push increments the stack pointer
    Ascending,
}

/// Task creation options understood by the port layer
pub mod opt {
    use super::OsOpt;

    pub const TASK_NONE: OsOpt = 0x0000;
    /// Enable the stack redzone for this task
    pub const TASK_STK_CHK: OsOpt = 0x0001;
    /// Zero the whole stack region before the frame is built
    pub const TASK_STK_CLR: OsOpt = 0x0002;
}
