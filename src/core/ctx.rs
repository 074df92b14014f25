//! Context-switch protocol
//!
//! [`PortContext`] owns every piece of process-wide port state: the current
//! and next task, the interrupt nesting counter, the shared interrupt stack
//! and the hook table. The architecture's trap handlers only move registers;
//! the mask -> save -> select -> restore -> unmask sequencing lives here.
//!
//! All methods assume interrupts are masked (or that the caller runs inside
//! the switch trap / an interrupt handler). [`crate::kernel`] wraps the
//! process-wide instance with the critical sections.

use core::marker::PhantomData;
use core::ptr::{self, NonNull};

use crate::config::{CFG_PROF_EN, CFG_REDZONE_EN};
use crate::critical;
use crate::error::{PortError, PortResult};
use crate::hooks::HookTable;
use crate::nesting::{IntEnter, IntExit, IntNesting, IsrStack};
use crate::port::Port;
use crate::redzone;
use crate::task::OsTcb;
use crate::ts;
use crate::types::{OsCtxSwCtr, OsNestingCtr, OsStkElement, OsTs};

/// What the port needs from the scheduler
pub trait Scheduler {
    /// Highest-priority ready task
    fn highest_ready(&mut self) -> Option<NonNull<OsTcb>>;

    /// Whether preemption is currently held off
    fn is_locked(&self) -> bool {
        false
    }
}

/// Scheduler reached through plain functions
///
/// Interrupt exits driven from an assembly epilogue have no scheduler value
/// at hand, so the port keeps one of these.
#[derive(Clone, Copy)]
pub struct SchedQuery {
    pub highest_ready: fn() -> Option<NonNull<OsTcb>>,
    pub is_locked: fn() -> bool,
}

impl SchedQuery {
    /// Never selects a task
    pub const NONE: Self = Self {
        highest_ready: no_task,
        is_locked: unlocked,
    };
}

fn no_task() -> Option<NonNull<OsTcb>> {
    None
}

fn unlocked() -> bool {
    false
}

impl Scheduler for SchedQuery {
    #[inline]
    fn highest_ready(&mut self) -> Option<NonNull<OsTcb>> {
        (self.highest_ready)()
    }

    #[inline]
    fn is_locked(&self) -> bool {
        (self.is_locked)()
    }
}

/// Switch state of the single executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    /// Multitasking not started
    Stopped,
    /// A task owns the CPU
    Running(NonNull<OsTcb>),
    /// A switch trap has been raised and not yet serviced
    SwitchPending,
    /// The trap handler committed the switch and is reloading this task
    Restoring(NonNull<OsTcb>),
}

/// Process-wide port state
pub struct PortContext<P: Port> {
    state: SwitchState,
    tcb_cur: Option<NonNull<OsTcb>>,
    tcb_high_rdy: Option<NonNull<OsTcb>>,
    nesting: IntNesting,
    isr_stk: IsrStack,
    hooks: HookTable,
    hooks_installed: bool,
    sched: SchedQuery,
    initialized: bool,
    running: bool,
    ctx_sw_ctr: OsCtxSwCtr,
    sched_lock_time_max_cur: OsTs,
    _port: PhantomData<fn() -> P>,
}

impl<P: Port> PortContext<P> {
    pub const fn new() -> Self {
        Self {
            state: SwitchState::Stopped,
            tcb_cur: None,
            tcb_high_rdy: None,
            nesting: IntNesting::new(),
            isr_stk: IsrStack::new(),
            hooks: HookTable::new(),
            hooks_installed: false,
            sched: SchedQuery::NONE,
            initialized: false,
            running: false,
            ctx_sw_ctr: 0,
            sched_lock_time_max_cur: 0,
            _port: PhantomData,
        }
    }

    // ============ Configuration ============

    /// Reset port state and run the init hook.
    ///
    /// Zeroes the interrupt stack and the nesting counter.
    pub fn init(&mut self) -> PortResult<()> {
        if self.running {
            return Err(PortError::OsRunning);
        }

        self.isr_stk.clear();
        self.nesting.reset();
        self.state = SwitchState::Stopped;
        self.tcb_cur = None;
        self.tcb_high_rdy = None;
        self.ctx_sw_ctr = 0;
        self.sched_lock_time_max_cur = 0;
        self.initialized = true;

        crate::info!("port init: {}", <P::Arch as crate::frame::ArchDescriptor>::NAME);
        self.hooks.call_init();
        Ok(())
    }

    /// Install the application hook table. Allowed once, before start.
    pub fn install_hooks(&mut self, hooks: HookTable) -> PortResult<()> {
        if self.running {
            return Err(PortError::OsRunning);
        }
        if self.hooks_installed {
            return Err(PortError::HooksInstalled);
        }
        self.hooks = hooks;
        self.hooks_installed = true;
        crate::debug!("hook table installed");
        Ok(())
    }

    /// Install the scheduler consulted by [`PortContext::interrupt_return`]
    pub fn install_sched(&mut self, sched: SchedQuery) {
        self.sched = sched;
    }

    // ============ Accessors ============

    #[inline(always)]
    pub fn hooks(&self) -> &HookTable {
        &self.hooks
    }

    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline(always)]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[inline(always)]
    pub fn int_nesting(&self) -> OsNestingCtr {
        self.nesting.get()
    }

    #[inline(always)]
    pub fn state(&self) -> SwitchState {
        self.state
    }

    #[inline(always)]
    pub fn tcb_cur(&self) -> Option<NonNull<OsTcb>> {
        self.tcb_cur
    }

    #[inline(always)]
    pub fn tcb_high_rdy(&self) -> Option<NonNull<OsTcb>> {
        self.tcb_high_rdy
    }

    #[inline(always)]
    pub fn ctx_sw_ctr(&self) -> OsCtxSwCtr {
        self.ctx_sw_ctr
    }

    #[inline(always)]
    pub fn isr_stack(&self) -> &IsrStack {
        &self.isr_stk
    }

    #[inline(always)]
    pub fn isr_stack_top(&mut self) -> *mut OsStkElement {
        self.isr_stk.top()
    }

    // ============ First-task start ============

    /// Stage the first task: a pending switch with no outgoing task.
    ///
    /// The port's start sequence then services it like any other switch.
    pub fn prepare_start(&mut self, first: NonNull<OsTcb>) -> PortResult<()> {
        if !self.initialized {
            return Err(PortError::OsNotInit);
        }
        if self.running {
            return Err(PortError::OsRunning);
        }

        self.tcb_cur = None;
        self.tcb_high_rdy = Some(first);
        self.state = SwitchState::SwitchPending;
        self.running = true;
        crate::info!("starting first task: {}", unsafe { first.as_ref() }.name);
        Ok(())
    }

    /// Stage and service the first switch, returning the stack pointer the
    /// restore sequence must load.
    pub fn start(&mut self, first: NonNull<OsTcb>) -> PortResult<*mut OsStkElement> {
        self.prepare_start(first)?;
        Ok(self.switch_context(ptr::null_mut()))
    }

    // ============ Task-level switch ============

    /// Record a voluntary switch to `next`.
    ///
    /// Must be called from task context. Returns whether the caller has to
    /// raise the switch trap; switching to the running task needs none.
    ///
    /// The trap is left to the caller because on some cores it runs the
    /// switch synchronously, and the switch reaches this context again
    /// through [`crate::kernel::ucport_switch_context`].
    pub fn ctx_sw(&mut self, next: NonNull<OsTcb>) -> PortResult<bool> {
        self.settle();

        if !self.running {
            return Err(PortError::OsNotRunning);
        }
        if self.nesting.get() > 0 {
            return Err(PortError::CtxSwIsr);
        }
        if self.tcb_cur == Some(next) {
            return Ok(false);
        }

        self.tcb_high_rdy = Some(next);
        self.state = SwitchState::SwitchPending;
        Ok(true)
    }

    // ============ Interrupt nesting ============

    /// Count an interrupt entry. The outermost entry moves onto the shared
    /// interrupt stack before the counter leaves 0.
    pub fn enter_interrupt(&mut self) -> PortResult<IntEnter> {
        self.settle();

        let top = self.isr_stk.top();
        let res = self.nesting.enter(|| P::isr_stack_switch(top));
        if res.is_err() {
            crate::error!("interrupt nesting overflow");
        }
        res
    }

    /// Count an interrupt exit.
    ///
    /// Only the exit that brings the counter back to 0 consults the
    /// scheduler; a switch it selects is carried out by the interrupt-time
    /// switch on the way back to task context.
    pub fn exit_interrupt<S: Scheduler>(&mut self, sched: &mut S) -> IntExit {
        match self.nesting.exit() {
            None => IntExit::Unbalanced,
            Some(n) if n > 0 => IntExit::Nested,
            Some(_) => {
                if !self.running || sched.is_locked() {
                    return IntExit::Resume;
                }
                match sched.highest_ready() {
                    Some(next) if Some(next) != self.tcb_cur => {
                        self.tcb_high_rdy = Some(next);
                        self.state = SwitchState::SwitchPending;
                        P::int_ctx_sw();
                        IntExit::Switch
                    }
                    _ => IntExit::Resume,
                }
            }
        }
    }

    /// Interrupt entry for prologues written in assembly.
    ///
    /// `sp` points at the frame the prologue pushed. Counts the entry and
    /// returns the stack the handler runs on: the top of the interrupt stack
    /// for the outermost entry, `sp` itself when nested.
    pub fn interrupt_entry(&mut self, sp: *mut OsStkElement) -> PortResult<*mut OsStkElement> {
        Ok(match self.enter_interrupt()? {
            IntEnter::Outermost => self.isr_stk.top(),
            IntEnter::Nested => sp,
        })
    }

    /// Interrupt exit for epilogues written in assembly.
    ///
    /// `frame` is the frame [`PortContext::interrupt_entry`] was given.
    /// Returns the frame to restore: `frame` while still nested, otherwise
    /// whichever task the installed scheduler selected.
    pub fn interrupt_return(&mut self, frame: *mut OsStkElement) -> *mut OsStkElement {
        let mut sched = self.sched;
        match self.exit_interrupt(&mut sched) {
            IntExit::Nested => frame,
            IntExit::Unbalanced => {
                crate::error!("interrupt exit without matching entry");
                frame
            }
            // A switch trap deferred while nested is serviced here too
            IntExit::Resume | IntExit::Switch => self.switch_context(frame),
        }
    }

    // ============ Switch trap ============

    /// Body of every switch trap.
    ///
    /// `cur_sp` is the outgoing task's stack pointer after the trap pushed
    /// its registers, or null when there is no outgoing task. Returns the
    /// incoming task's saved stack pointer. A trap with no switch pending
    /// resumes the interrupted context unchanged, and so does a trap taken
    /// inside a nested interrupt: the switch stays pending until the
    /// outermost exit.
    pub fn switch_context(&mut self, cur_sp: *mut OsStkElement) -> *mut OsStkElement {
        if self.nesting.get() > 0 {
            return cur_sp;
        }

        let mut next = match (self.state, self.tcb_high_rdy) {
            (SwitchState::SwitchPending, Some(next)) => next,
            _ => return cur_sp,
        };

        if let Some(mut cur) = self.tcb_cur {
            if !cur_sp.is_null() {
                unsafe { cur.as_mut().stk_ptr = cur_sp };
            }
        }

        self.task_sw_hook(next);

        let next_ref = unsafe { next.as_mut() };
        next_ref.ctx_sw_ctr = next_ref.ctx_sw_ctr.wrapping_add(1);
        self.ctx_sw_ctr = self.ctx_sw_ctr.wrapping_add(1);

        self.tcb_cur = Some(next);
        self.state = SwitchState::Restoring(next);
        next_ref.stk_ptr
    }

    /// Promote a finished restore to `Running`.
    ///
    /// Any entry into the port after a switch trap runs on behalf of (or
    /// interrupts) the restored task, so the restore has completed.
    #[inline(always)]
    pub fn settle(&mut self) {
        if let SwitchState::Restoring(tcb) = self.state {
            self.state = SwitchState::Running(tcb);
        }
    }

    fn task_sw_hook(&mut self, mut next: NonNull<OsTcb>) {
        let cur = self.tcb_cur.map(|c| unsafe { &*c.as_ptr() });
        self.hooks.call_task_sw(cur, unsafe { next.as_ref() });

        if CFG_PROF_EN {
            let ts = ts::read::<P>();
            let int_dis = critical::int_dis_meas_max_cur_reset();
            let sched_lock = core::mem::take(&mut self.sched_lock_time_max_cur);

            if let Some(c) = self.tcb_cur {
                let c = unsafe { &mut *c.as_ptr() };
                c.cycles_delta = ts.wrapping_sub(c.cycles_start);
                c.cycles_total += c.cycles_delta as u64;
                c.int_dis_time_max = c.int_dis_time_max.max(int_dis);
                c.sched_lock_time_max = c.sched_lock_time_max.max(sched_lock);
            }
            unsafe { next.as_mut() }.cycles_start = ts;
        }

        if CFG_REDZONE_EN {
            if let Some(c) = self.tcb_cur {
                let c = unsafe { c.as_ref() };
                if !redzone::check(c) {
                    self.redzone_violation(c);
                }
            }
        }
    }

    fn redzone_violation(&self, tcb: &OsTcb) -> ! {
        crate::error!(
            "stack redzone violated by task {} (error {})",
            tcb.name,
            PortError::StkOvf.code()
        );
        self.hooks.call_redzone_hit(tcb);
        P::fatal()
    }

    // ============ Lifecycle dispatch ============

    /// A task was created: paint its redzone and run the create hook.
    pub fn task_created(&self, tcb: &mut OsTcb) {
        redzone::init(tcb);
        self.hooks.call_task_create(tcb);
    }

    /// A task is being deleted.
    pub fn task_deleted(&self, tcb: &mut OsTcb) {
        self.hooks.call_task_del(tcb);
    }

    /// The current task's entry function returned into the trap.
    ///
    /// The return hook fires once per task; the task must never run again.
    pub fn task_returned(&mut self) -> PortResult<()> {
        self.settle();

        let mut cur = self.tcb_cur.ok_or(PortError::TcbInvalid)?;
        let tcb = unsafe { cur.as_mut() };
        if !tcb.returned {
            tcb.returned = true;
            crate::error!(
                "task {} returned from its entry function (error {})",
                tcb.name,
                PortError::FatalReturn.code()
            );
            self.hooks.call_task_return(tcb);
        }
        Ok(())
    }

    /// Record the length of one scheduler-lock window
    pub fn sched_lock_time_record(&mut self, elapsed: OsTs) {
        self.sched_lock_time_max_cur = self.sched_lock_time_max_cur.max(elapsed);
    }
}

impl<P: Port> Default for PortContext<P> {
    fn default() -> Self {
        Self::new()
    }
}
