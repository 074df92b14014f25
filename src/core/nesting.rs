//! Interrupt nesting tracker
//!
//! One counter (0 = task context, 1 = outermost interrupt, >1 = nested) and
//! one interrupt stack shared by every interrupt level. Both are only touched
//! with interrupts masked, from interrupt entry and exit.

use crate::config::{CFG_INT_NESTING_MAX, CFG_ISR_STK_SIZE};
use crate::error::{PortError, PortResult};
use crate::types::{OsNestingCtr, OsStkElement};

/// Outcome of an interrupt entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntEnter {
    /// Outermost entry: the active stack moved to the interrupt stack
    Outermost,
    /// Entry while already inside an interrupt
    Nested,
}

/// Outcome of an interrupt exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntExit {
    /// Still inside an outer interrupt; return straight to it
    Nested,
    /// Back in task context, resuming the interrupted task
    Resume,
    /// Back in task context, switching to the task the scheduler selected
    Switch,
    /// Exit without a matching entry; counter left at 0
    Unbalanced,
}

/// Shared interrupt stack
#[repr(C, align(8))]
pub struct IsrStack([OsStkElement; CFG_ISR_STK_SIZE]);

impl IsrStack {
    pub const fn new() -> Self {
        Self([0; CFG_ISR_STK_SIZE])
    }

    /// Zero the whole region
    pub fn clear(&mut self) {
        self.0.fill(0);
    }

    /// Initial stack pointer (one past the highest word)
    #[inline(always)]
    pub fn top(&mut self) -> *mut OsStkElement {
        self.0.as_mut_ptr_range().end
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[OsStkElement] {
        &self.0
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [OsStkElement] {
        &mut self.0
    }
}

impl Default for IsrStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt nesting counter
#[derive(Debug, Default)]
pub struct IntNesting {
    ctr: OsNestingCtr,
}

impl IntNesting {
    pub const fn new() -> Self {
        Self { ctr: 0 }
    }

    #[inline(always)]
    pub fn get(&self) -> OsNestingCtr {
        self.ctr
    }

    #[inline(always)]
    pub fn reset(&mut self) {
        self.ctr = 0;
    }

    /// Count one interrupt entry.
    ///
    /// `on_outermost` runs before the counter leaves 0.
    pub fn enter(&mut self, on_outermost: impl FnOnce()) -> PortResult<IntEnter> {
        if self.ctr >= CFG_INT_NESTING_MAX {
            return Err(PortError::IntNestingOvf);
        }
        let outer = self.ctr == 0;
        if outer {
            on_outermost();
        }
        self.ctr += 1;
        Ok(if outer { IntEnter::Outermost } else { IntEnter::Nested })
    }

    /// Count one interrupt exit, returning the new depth
    pub fn exit(&mut self) -> Option<OsNestingCtr> {
        if self.ctr == 0 {
            return None;
        }
        self.ctr -= 1;
        Some(self.ctr)
    }
}
