//! Application hook table
//!
//! Optional callbacks invoked by the port at fixed lifecycle points. An
//! empty slot is a no-op. The table is installed once during configuration
//! and only read afterwards.

use crate::task::OsTcb;

/// Hook without arguments
pub type OsHookFn = fn();
/// Hook receiving the task concerned
pub type OsTaskHookFn = fn(&mut OsTcb);
/// Hook receiving a task that can no longer be trusted to run
pub type OsTaskFaultHookFn = fn(&OsTcb);
/// Hook receiving the outgoing (absent on first start) and incoming task
pub type OsTaskSwHookFn = fn(Option<&OsTcb>, &OsTcb);

/// Process-wide hook slots
#[derive(Clone, Copy, Default)]
pub struct HookTable {
    pub idle: Option<OsHookFn>,
    pub init: Option<OsHookFn>,
    pub stat: Option<OsHookFn>,
    pub tick: Option<OsHookFn>,
    pub task_create: Option<OsTaskHookFn>,
    pub task_del: Option<OsTaskHookFn>,
    pub task_return: Option<OsTaskFaultHookFn>,
    pub task_sw: Option<OsTaskSwHookFn>,
    pub redzone_hit: Option<OsTaskFaultHookFn>,
}

impl HookTable {
    /// Table with every slot empty
    pub const fn new() -> Self {
        Self {
            idle: None,
            init: None,
            stat: None,
            tick: None,
            task_create: None,
            task_del: None,
            task_return: None,
            task_sw: None,
            redzone_hit: None,
        }
    }

    pub const fn with_idle(mut self, f: OsHookFn) -> Self {
        self.idle = Some(f);
        self
    }

    pub const fn with_init(mut self, f: OsHookFn) -> Self {
        self.init = Some(f);
        self
    }

    pub const fn with_stat(mut self, f: OsHookFn) -> Self {
        self.stat = Some(f);
        self
    }

    pub const fn with_tick(mut self, f: OsHookFn) -> Self {
        self.tick = Some(f);
        self
    }

    pub const fn with_task_create(mut self, f: OsTaskHookFn) -> Self {
        self.task_create = Some(f);
        self
    }

    pub const fn with_task_del(mut self, f: OsTaskHookFn) -> Self {
        self.task_del = Some(f);
        self
    }

    pub const fn with_task_return(mut self, f: OsTaskFaultHookFn) -> Self {
        self.task_return = Some(f);
        self
    }

    pub const fn with_task_sw(mut self, f: OsTaskSwHookFn) -> Self {
        self.task_sw = Some(f);
        self
    }

    pub const fn with_redzone_hit(mut self, f: OsTaskFaultHookFn) -> Self {
        self.redzone_hit = Some(f);
        self
    }

    // ============ Dispatch ============

    #[inline]
    pub(crate) fn call_idle(&self) {
        if let Some(f) = self.idle {
            f();
        }
    }

    #[inline]
    pub(crate) fn call_init(&self) {
        if let Some(f) = self.init {
            f();
        }
    }

    #[inline]
    pub(crate) fn call_stat(&self) {
        if let Some(f) = self.stat {
            f();
        }
    }

    #[inline]
    pub(crate) fn call_tick(&self) {
        if let Some(f) = self.tick {
            f();
        }
    }

    #[inline]
    pub(crate) fn call_task_create(&self, tcb: &mut OsTcb) {
        if let Some(f) = self.task_create {
            f(tcb);
        }
    }

    #[inline]
    pub(crate) fn call_task_del(&self, tcb: &mut OsTcb) {
        if let Some(f) = self.task_del {
            f(tcb);
        }
    }

    #[inline]
    pub(crate) fn call_task_return(&self, tcb: &OsTcb) {
        if let Some(f) = self.task_return {
            f(tcb);
        }
    }

    #[inline]
    pub(crate) fn call_task_sw(&self, cur: Option<&OsTcb>, next: &OsTcb) {
        if let Some(f) = self.task_sw {
            f(cur, next);
        }
    }

    #[inline]
    pub(crate) fn call_redzone_hit(&self, tcb: &OsTcb) {
        if let Some(f) = self.redzone_hit {
            f(tcb);
        }
    }
}
