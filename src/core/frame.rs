//! Stack frame builder
//!
//! Seeds a new task's stack with a synthetic saved-register image so the
//! architecture's ordinary restore sequence "returns" into the task as if it
//! had been preempted just before its first instruction.
//!
//! Each architecture describes its image with an [`ArchDescriptor`]: an
//! ordered list of [`Slot`]s in restore order (the word at the saved stack
//! pointer first), plus alignment, growth direction and the initial status
//! word. The builder is the only code that interprets the list, so register
//! ordering stays per-architecture while the sequencing is shared.

use core::mem::size_of;
use core::slice;

use crate::config::{CFG_STK_POISON, CFG_STK_SIZE_MIN};
use crate::error::{PortError, PortResult};
use crate::task::OsTaskFn;
use crate::types::{opt, OsOpt, OsStkElement, StackGrowth};

/// One word of a saved register image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// General register `n`: zero, or a per-register pattern in debug builds
    Gpr(u8),
    /// First-parameter register of the calling convention
    Arg,
    /// Status/flags word, restored with interrupts enabled
    Status,
    /// Resume address
    Pc,
    /// Return address of the entry function: the task-return trap
    Return,
    /// Back-chain pointer to the innermost (null-terminated) frame
    Backchain,
    /// Constant value
    Fixed(OsStkElement),
    /// Register the architecture samples from the creating context
    Anchor(u8),
}

/// Saved register image layout of one architecture
pub trait ArchDescriptor {
    /// Human-readable architecture name
    const NAME: &'static str;
    /// Stack growth direction
    const GROWTH: StackGrowth;
    /// Stack pointer alignment required by the ABI at task entry, in bytes
    const ALIGN: usize;
    /// Saved register image in restore order
    const FRAME: &'static [Slot];
    /// Words of the null-terminated innermost frame (0 = no back chain)
    const INNER_FRAME_WORDS: usize = 0;

    /// Status word for a task entered at `entry`
    fn status_word(entry: usize) -> OsStkElement;

    /// Resume address encoding for `entry`
    fn pc_word(entry: usize) -> OsStkElement {
        entry as OsStkElement
    }

    /// Value of an [`Slot::Anchor`] register
    fn anchor(_reg: u8) -> OsStkElement {
        0
    }
}

/// Words a frame of `A` occupies, excluding alignment padding
pub const fn frame_words<A: ArchDescriptor>() -> usize {
    A::FRAME.len() + A::INNER_FRAME_WORDS
}

/// Index of the first occurrence of `slot` in the layout of `A`
pub fn slot_index<A: ArchDescriptor>(slot: Slot) -> Option<usize> {
    A::FRAME.iter().position(|s| *s == slot)
}

/// Debug fill pattern of general register `n`: its number in BCD, repeated
/// in every byte (r4 -> 0x04040404, r10 -> 0x10101010).
pub const fn gpr_pattern(n: u8) -> OsStkElement {
    let bcd = ((n / 10) << 4 | (n % 10)) as OsStkElement;
    bcd * 0x0101_0101
}

/// Address stored as the return address of every task entry function
#[inline]
pub fn task_return_addr() -> OsStkElement {
    crate::kernel::os_task_return as *const () as usize as OsStkElement
}

const WORD: usize = size_of::<OsStkElement>();

/// Build the initial frame of a task in `stack`.
///
/// Returns the index of the word the saved stack pointer must point at.
///
/// # Panics
/// If `stack` is smaller than [`CFG_STK_SIZE_MIN`] or cannot hold the frame.
/// Both are configuration errors; [`TaskStack`] rejects them at compile time.
pub fn build_frame<A: ArchDescriptor>(
    stack: &mut [OsStkElement],
    task_fn: OsTaskFn,
    arg: *mut (),
    opt: OsOpt,
) -> usize {
    let pad = A::ALIGN / WORD;
    assert!(
        stack.len() >= CFG_STK_SIZE_MIN && stack.len() >= frame_words::<A>() + pad,
        "task stack too small for the initial frame"
    );

    if opt & opt::TASK_STK_CLR != 0 {
        stack.fill(0);
    }

    let entry = task_fn as usize;
    let base = stack.as_ptr() as usize;
    let mask = A::ALIGN - 1;
    let n = A::FRAME.len();

    match A::GROWTH {
        StackGrowth::Descending => {
            let top_addr = (base + stack.len() * WORD) & !mask;
            let mut top = (top_addr - base) / WORD;

            let inner = top - A::INNER_FRAME_WORDS;
            stack[inner..top].fill(0);
            top = inner;

            let sp = top - n;
            let backchain = (base + inner * WORD) as OsStkElement;
            for (i, slot) in A::FRAME.iter().enumerate() {
                stack[sp + i] = slot_value::<A>(*slot, entry, arg, backchain);
            }
            sp
        }
        StackGrowth::Ascending => {
            let first_addr = (base + mask) & !mask;
            let inner = (first_addr - base) / WORD;
            stack[inner..inner + A::INNER_FRAME_WORDS].fill(0);

            let sp = inner + A::INNER_FRAME_WORDS + n - 1;
            let backchain = (base + inner * WORD) as OsStkElement;
            for (i, slot) in A::FRAME.iter().enumerate() {
                stack[sp - i] = slot_value::<A>(*slot, entry, arg, backchain);
            }
            sp
        }
    }
}

fn slot_value<A: ArchDescriptor>(
    slot: Slot,
    entry: usize,
    arg: *mut (),
    backchain: OsStkElement,
) -> OsStkElement {
    match slot {
        Slot::Gpr(n) if CFG_STK_POISON => gpr_pattern(n),
        Slot::Gpr(_) => 0,
        Slot::Arg => arg as usize as OsStkElement,
        Slot::Status => A::status_word(entry),
        Slot::Pc => A::pc_word(entry),
        Slot::Return => task_return_addr(),
        Slot::Backchain => backchain,
        Slot::Fixed(v) => v,
        Slot::Anchor(r) => A::anchor(r),
    }
}

/// Initialize task stack from a raw region.
///
/// `stk_limit` may be null; otherwise the frame must not reach past it.
///
/// # Returns
/// * `Ok(sp)` - Saved stack pointer of the new task
/// * `Err(PortError::StkInvalid)` - `stk_base` is null
/// * `Err(PortError::StkSizeInvalid)` - Region too small for the frame
/// * `Err(PortError::StkOvf)` - Frame crosses `stk_limit`
///
/// # Safety
/// `stk_base..stk_base + stk_size` must be one writable region owned by the
/// caller and not in use by a running task.
pub unsafe fn os_task_stk_init<A: ArchDescriptor>(
    task_fn: OsTaskFn,
    arg: *mut (),
    stk_base: *mut OsStkElement,
    stk_limit: *mut OsStkElement,
    stk_size: usize,
    opt: OsOpt,
) -> PortResult<*mut OsStkElement> {
    if stk_base.is_null() {
        return Err(PortError::StkInvalid);
    }
    if stk_size < CFG_STK_SIZE_MIN || stk_size < frame_words::<A>() + A::ALIGN / WORD {
        return Err(PortError::StkSizeInvalid);
    }

    let stack = unsafe { slice::from_raw_parts_mut(stk_base, stk_size) };
    let sp = build_frame::<A>(stack, task_fn, arg, opt);

    if !stk_limit.is_null() {
        let limit = (stk_limit as usize).saturating_sub(stk_base as usize) / WORD;
        let clear = match A::GROWTH {
            StackGrowth::Descending => sp >= limit,
            StackGrowth::Ascending => sp <= limit,
        };
        if !clear {
            return Err(PortError::StkOvf);
        }
    }

    Ok(unsafe { stk_base.add(sp) })
}

/// Statically sized task stack
///
/// Sizes below [`CFG_STK_SIZE_MIN`] fail to compile.
#[repr(C, align(16))]
pub struct TaskStack<const N: usize>([OsStkElement; N]);

impl<const N: usize> TaskStack<N> {
    pub const fn new() -> Self {
        const { assert!(N >= CFG_STK_SIZE_MIN, "task stack below CFG_STK_SIZE_MIN") };
        Self([0; N])
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [OsStkElement] {
        &mut self.0
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[OsStkElement] {
        &self.0
    }
}

impl<const N: usize> Default for TaskStack<N> {
    fn default() -> Self {
        Self::new()
    }
}
