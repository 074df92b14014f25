//! Stack redzone and usage checks
//!
//! The redzone is `CFG_STK_REDZONE_DEPTH` words at the far end of a task's
//! stack, in the growth direction, filled with a known pattern when the task
//! is created. A word that no longer holds the pattern means the task ran
//! past its stack.

use core::slice;

use crate::config::{CFG_STK_REDZONE_DEPTH, CFG_STK_REDZONE_VAL};
use crate::task::OsTcb;
use crate::types::{OsStkElement, StackGrowth};

/// Stack occupancy reported by [`stk_chk`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StkUsage {
    /// Untouched words at the far end of the stack
    pub free: usize,
    /// Words that have been written at some point
    pub used: usize,
}

fn region(tcb: &OsTcb) -> Option<&'static mut [OsStkElement]> {
    if tcb.stk_base.is_null() || tcb.stk_size == 0 {
        return None;
    }
    Some(unsafe { slice::from_raw_parts_mut(tcb.stk_base, tcb.stk_size) })
}

fn guard_words(stack: &mut [OsStkElement], growth: StackGrowth) -> &mut [OsStkElement] {
    let depth = CFG_STK_REDZONE_DEPTH.min(stack.len());
    match growth {
        StackGrowth::Descending => &mut stack[..depth],
        StackGrowth::Ascending => {
            let len = stack.len();
            &mut stack[len - depth..]
        }
    }
}

/// Paint the redzone of a task that asked for stack checking.
pub fn init(tcb: &OsTcb) {
    if !tcb.stk_chk_enabled() {
        return;
    }
    if let Some(stack) = region(tcb) {
        guard_words(stack, tcb.stk_growth).fill(CFG_STK_REDZONE_VAL);
    }
}

/// Check the redzone. Tasks without stack checking always pass.
pub fn check(tcb: &OsTcb) -> bool {
    if !tcb.stk_chk_enabled() {
        return true;
    }
    match region(tcb) {
        Some(stack) => guard_words(stack, tcb.stk_growth)
            .iter()
            .all(|w| *w == CFG_STK_REDZONE_VAL),
        None => true,
    }
}

/// Count untouched words from the far end of a stack cleared at creation.
///
/// Redzone words count as free as long as they still hold their pattern.
pub fn stk_chk(tcb: &OsTcb) -> Option<StkUsage> {
    let stack = region(tcb)?;
    let untouched = |w: &OsStkElement| *w == 0 || *w == CFG_STK_REDZONE_VAL;
    let free = match tcb.stk_growth {
        StackGrowth::Descending => stack.iter().take_while(|w| untouched(w)).count(),
        StackGrowth::Ascending => stack.iter().rev().take_while(|w| untouched(w)).count(),
    };
    Some(StkUsage {
        free,
        used: stack.len() - free,
    })
}
