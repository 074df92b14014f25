//! Task Control Block (TCB) as seen by the port layer
//!
//! The scheduler owns task objects; the port reads and writes only the fields
//! defined here: the saved stack pointer, the stack region, and the
//! profiling counters updated at switch time.

use core::ptr;

use crate::frame::{os_task_stk_init, ArchDescriptor};
use crate::types::{
    opt, OsCtxSwCtr, OsCycles, OsOpt, OsStkElement, OsTs, StackGrowth,
};
use crate::config::{CFG_STK_REDZONE_DEPTH, CFG_STK_SIZE_MIN};
use crate::error::{PortError, PortResult};

/// Task entry point function type
///
/// Entry functions are expected to loop forever or delete themselves;
/// returning lands in the task-return trap.
pub type OsTaskFn = extern "C" fn(*mut ());

/// Task Control Block
#[repr(C)]
pub struct OsTcb {
    // ============ Stack pointer ============
    /// Current stack pointer
    pub stk_ptr: *mut OsStkElement,

    // ============ Stack information ============
    /// Base of stack
    pub stk_base: *mut OsStkElement,
    /// Stack limit pointer (first word past the redzone)
    pub stk_limit: *mut OsStkElement,
    /// Stack size in words
    pub stk_size: usize,
    /// Stack growth direction of the architecture that built the frame
    pub stk_growth: StackGrowth,

    // ============ Task identification ============
    /// Task name
    pub name: &'static str,
    /// Task options
    pub opt: OsOpt,

    // ============ Task entry point ============
    /// Task function address
    pub task_entry_addr: usize,
    /// Task argument
    pub task_entry_arg: *mut (),
    /// Set once the entry function has returned into the trap
    pub returned: bool,

    // ============ Profiling ============
    /// Timestamp at which the task was last switched in
    pub cycles_start: OsTs,
    /// Length of the last run
    pub cycles_delta: OsTs,
    /// Total cycles spent running
    pub cycles_total: OsCycles,
    /// Longest interrupts-disabled window while this task ran
    pub int_dis_time_max: OsTs,
    /// Longest scheduler-lock window while this task ran
    pub sched_lock_time_max: OsTs,
    /// Number of times the task was switched in
    pub ctx_sw_ctr: OsCtxSwCtr,

    // ============ Extension pointer ============
    /// User-defined extension data
    pub ext_ptr: *mut (),
}

impl OsTcb {
    /// Create a new, uninitialized TCB
    pub const fn new() -> Self {
        OsTcb {
            stk_ptr: ptr::null_mut(),
            stk_base: ptr::null_mut(),
            stk_limit: ptr::null_mut(),
            stk_size: 0,
            stk_growth: StackGrowth::Descending,

            name: "",
            opt: 0,

            task_entry_addr: 0,
            task_entry_arg: ptr::null_mut(),
            returned: false,

            cycles_start: 0,
            cycles_delta: 0,
            cycles_total: 0,
            int_dis_time_max: 0,
            sched_lock_time_max: 0,
            ctx_sw_ctr: 0,

            ext_ptr: ptr::null_mut(),
        }
    }

    /// Initialize TCB to default values
    pub fn init(&mut self) {
        *self = Self::new();
    }

    /// Bind the TCB to a stack region and build the task's initial frame.
    ///
    /// The stack must stay owned by the caller for as long as the task
    /// exists. The redzone is not painted here; that happens in the task
    /// creation hook.
    pub fn prepare<A: ArchDescriptor>(
        &mut self,
        name: &'static str,
        task_fn: OsTaskFn,
        arg: *mut (),
        stack: &'static mut [OsStkElement],
        opt: OsOpt,
    ) -> PortResult<()> {
        if stack.len() < CFG_STK_SIZE_MIN {
            return Err(PortError::StkSizeInvalid);
        }

        self.init();
        self.name = name;
        self.opt = opt;
        self.stk_size = stack.len();
        self.stk_base = stack.as_mut_ptr();
        self.stk_growth = A::GROWTH;

        let depth = if opt & opt::TASK_STK_CHK != 0 {
            CFG_STK_REDZONE_DEPTH
        } else {
            0
        };
        self.stk_limit = match A::GROWTH {
            StackGrowth::Descending => unsafe { self.stk_base.add(depth) },
            StackGrowth::Ascending => unsafe { self.stk_base.add(self.stk_size - 1 - depth) },
        };

        self.stk_ptr = unsafe {
            os_task_stk_init::<A>(task_fn, arg, self.stk_base, self.stk_limit, self.stk_size, opt)?
        };

        self.task_entry_addr = task_fn as usize;
        self.task_entry_arg = arg;
        Ok(())
    }

    /// Index of the saved stack pointer within the stack region
    #[inline]
    pub fn stk_ptr_index(&self) -> usize {
        (self.stk_ptr as usize - self.stk_base as usize) / core::mem::size_of::<OsStkElement>()
    }

    /// Check if stack checking was requested at creation
    #[inline]
    pub fn stk_chk_enabled(&self) -> bool {
        self.opt & opt::TASK_STK_CHK != 0
    }
}

impl Default for OsTcb {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for OsTcb {}
unsafe impl Sync for OsTcb {}
