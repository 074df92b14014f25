//! Process-wide port instance and the entry points the scheduler calls
//!
//! The scheduler collaborator only talks to the port through the functions
//! in this module; the architecture's trap handlers call back through
//! [`ucport_switch_context`], and assembly interrupt entries through
//! [`ucport_int_enter`] and [`ucport_int_exit`].

use core::ptr::NonNull;

use crate::core::cs_cell::CsCell;
use crate::critical::critical_section;
use crate::ctx::{PortContext, SchedQuery, Scheduler};
use crate::error::PortResult;
use crate::hooks::HookTable;
use crate::nesting::{IntEnter, IntExit};
use crate::port::{ActivePort, Port};
use crate::task::OsTcb;
use crate::types::{OsCtxSwCtr, OsNestingCtr, OsStkElement, OsTs};

// ============ Global Instances ============

/// Global port state instance
pub static PORT: CsCell<PortContext<ActivePort>> = CsCell::new(PortContext::new());

// ============ Initialization ============

/// Initialize the port layer
///
/// Zeroes the interrupt stack, resets the nesting counter and runs the init
/// hook. Must be called before any other port function.
///
/// # Returns
/// * `Ok(())` - Initialization successful
/// * `Err(PortError::OsRunning)` - Multitasking already started
pub fn os_init() -> PortResult<()> {
    critical_section(|cs| PORT.get(cs).init())
}

/// Install the application hook table (once, before start)
pub fn os_hooks_set(hooks: HookTable) -> PortResult<()> {
    critical_section(|cs| PORT.get(cs).install_hooks(hooks))
}

/// Install the scheduler consulted when an assembly interrupt entry returns
/// to task level
pub fn os_sched_set(sched: SchedQuery) {
    critical_section(|cs| PORT.get(cs).install_sched(sched))
}

/// Start multitasking with `first`, whose frame was built by
/// [`OsTcb::prepare`].
///
/// # Returns
/// This function does not return under normal operation.
/// * `Err(PortError::OsNotInit)` - Port not initialized
/// * `Err(PortError::OsRunning)` - Already started
pub fn os_start(first: NonNull<OsTcb>) -> PortResult<()> {
    let isr_top = critical_section(|cs| -> PortResult<*mut OsStkElement> {
        let port = PORT.get(cs);
        port.prepare_start(first)?;
        Ok(port.isr_stack_top())
    })?;

    ActivePort::int_disable();
    unsafe { ActivePort::start_high_rdy(isr_top) }
}

// ============ Context switching ============

/// Request a voluntary switch to `next` from task context
///
/// The trap is raised once the port state is released, still masked.
pub fn os_ctx_sw(next: NonNull<OsTcb>) -> PortResult<()> {
    critical_section(|cs| {
        if PORT.get(cs).ctx_sw(next)? {
            ActivePort::ctx_sw();
        }
        Ok(())
    })
}

/// Body of every architecture's switch trap
///
/// Runs with interrupts masked. Receives the outgoing stack pointer (null
/// when there is none) and returns the incoming one.
#[no_mangle]
pub unsafe extern "C" fn ucport_switch_context(cur_sp: *mut OsStkElement) -> *mut OsStkElement {
    unsafe { PORT.get_unchecked().switch_context(cur_sp) }
}

/// Interrupt prologue of assembly entry sequences
///
/// Runs masked with `sp` pointing at the frame just pushed. Returns the
/// stack the handler must run on. Overflowing the nesting limit halts.
#[no_mangle]
pub unsafe extern "C" fn ucport_int_enter(sp: *mut OsStkElement) -> *mut OsStkElement {
    match unsafe { PORT.get_unchecked().interrupt_entry(sp) } {
        Ok(sp) => sp,
        Err(_) => ActivePort::fatal(),
    }
}

/// Interrupt epilogue of assembly entry sequences
///
/// Runs masked with the frame [`ucport_int_enter`] was given. Returns the
/// frame to restore.
#[no_mangle]
pub unsafe extern "C" fn ucport_int_exit(frame: *mut OsStkElement) -> *mut OsStkElement {
    unsafe { PORT.get_unchecked().interrupt_return(frame) }
}

/// Return address of every task entry function
///
/// Reports the task once through the return hook and parks it; the hook is
/// expected to have the scheduler delete the task.
#[no_mangle]
pub extern "C" fn os_task_return() -> ! {
    if critical_section(|cs| PORT.get(cs).task_returned()).is_err() {
        ActivePort::fatal();
    }
    loop {
        ActivePort::idle();
    }
}

// ============ Interrupts ============

/// Interrupt prologue
pub fn os_int_enter() -> PortResult<IntEnter> {
    critical_section(|cs| PORT.get(cs).enter_interrupt())
}

/// Interrupt epilogue
pub fn os_int_exit<S: Scheduler>(sched: &mut S) -> IntExit {
    critical_section(|cs| PORT.get(cs).exit_interrupt(sched))
}

/// Get interrupt nesting level
pub fn os_int_nesting() -> OsNestingCtr {
    critical_section(|cs| PORT.get(cs).int_nesting())
}

// ============ Hook call points ============

/// Task creation hook: paints the redzone, then calls the application
pub fn os_task_create_hook(tcb: &mut OsTcb) {
    critical_section(|cs| PORT.get(cs).task_created(tcb))
}

/// Task deletion hook
pub fn os_task_del_hook(tcb: &mut OsTcb) {
    critical_section(|cs| PORT.get(cs).task_deleted(tcb))
}

/// Idle task hook, also services the debug channel
///
/// Application hooks run with interrupts enabled.
pub fn os_idle_task_hook() {
    hooks().call_idle();
    ActivePort::debug_poll();
}

/// Statistics task hook
pub fn os_stat_task_hook() {
    hooks().call_stat();
}

/// Tick hook, also services the debug channel
pub fn os_time_tick_hook() {
    hooks().call_tick();
    ActivePort::debug_poll();
}

fn hooks() -> HookTable {
    critical_section(|cs| *PORT.get(cs).hooks())
}

/// Report one scheduler-lock window
pub fn os_sched_lock_time_record(elapsed: OsTs) {
    critical_section(|cs| PORT.get(cs).sched_lock_time_record(elapsed))
}

/// Number of context switches since start
pub fn os_ctx_sw_ctr() -> OsCtxSwCtr {
    critical_section(|cs| PORT.get(cs).ctx_sw_ctr())
}
