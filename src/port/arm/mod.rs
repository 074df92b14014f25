//! Classic ARM (ARM7/ARM9, A32/T32) port implementation
//!
//! Tasks run in SVC mode. A task-level switch is a plain call into the
//! switch routine, which pushes a full frame onto the caller's stack and
//! asks `ucport_switch_context` for the stack to restore. IRQ entry builds
//! the same frame on the interrupted stack; `ucport_int_enter` counts the
//! level and moves the outermost one onto the shared interrupt stack, and
//! `ucport_int_exit` picks the frame to restore, so a pending switch is
//! taken on the way out of the outermost interrupt without a separate flag.
//!
//! Frame, from the saved stack pointer upward:
//!
//! ```text
//! CPSR | r0 | r1 .. r12 | lr | pc
//! ```

use crate::frame::{ArchDescriptor, Slot};
use crate::types::{OsStkElement, StackGrowth};

/// SVC mode, IRQ and FIQ enabled
const CPSR_SVC: OsStkElement = 0x0000_0013;
/// Thumb state
const CPSR_T: OsStkElement = 0x0000_0020;

/// ARMv4T/ARMv5 saved register image
pub struct ArmFrame;

impl ArchDescriptor for ArmFrame {
    const NAME: &'static str = "ARM";
    const GROWTH: StackGrowth = StackGrowth::Descending;
    const ALIGN: usize = 8;
    const FRAME: &'static [Slot] = &[
        Slot::Status,
        Slot::Arg,
        Slot::Gpr(1),
        Slot::Gpr(2),
        Slot::Gpr(3),
        Slot::Gpr(4),
        Slot::Gpr(5),
        Slot::Gpr(6),
        Slot::Gpr(7),
        Slot::Gpr(8),
        Slot::Gpr(9),
        Slot::Gpr(10),
        Slot::Gpr(11),
        Slot::Gpr(12),
        Slot::Return,
        Slot::Pc,
    ];

    /// Entry addresses with bit 0 set are Thumb code
    fn status_word(entry: usize) -> OsStkElement {
        if entry & 1 != 0 {
            CPSR_SVC | CPSR_T
        } else {
            CPSR_SVC
        }
    }

    fn pc_word(entry: usize) -> OsStkElement {
        (entry as OsStkElement) & !1
    }
}

const _: () = assert!(crate::frame::frame_words::<ArmFrame>() + 2 <= crate::config::CFG_STK_SIZE_MIN);

#[cfg(all(feature = "port-arm", target_arch = "arm"))]
pub use hw::*;

#[cfg(all(feature = "port-arm", target_arch = "arm"))]
mod hw {
    use core::arch::{asm, global_asm};

    use super::ArmFrame;
    use crate::core::cs_cell::CsCell;
    use crate::dcc::{DccRegisters, DebugChannel, RawMemory};
    use crate::port::Port;
    use crate::types::{CpuSr, OsStkElement, OsTs};

    const CPSR_I: u32 = 0x80;
    const CPSR_F: u32 = 0x40;

    extern "C" {
        fn ucport_arm_ctx_sw();
        fn ucport_arm_start(sp: *mut OsStkElement) -> !;
        /// Board timestamp counter, supplied by the BSP
        fn ucport_bsp_ts_read() -> OsTs;
    }

    /// ARM7/ARM9 CPU
    pub struct ArmClassic;

    impl Port for ArmClassic {
        type Arch = ArmFrame;

        #[inline(always)]
        fn int_disable() -> CpuSr {
            let cpsr: u32;
            unsafe {
                asm!(
                    "mrs {0}, cpsr",
                    "orr {1}, {0}, #0xC0",
                    "msr cpsr_c, {1}",
                    out(reg) cpsr,
                    out(reg) _,
                );
            }
            cpsr & (CPSR_I | CPSR_F) == 0
        }

        #[inline(always)]
        fn int_restore(sr: CpuSr) {
            if sr {
                unsafe {
                    asm!(
                        "mrs {0}, cpsr",
                        "bic {0}, {0}, #0xC0",
                        "msr cpsr_c, {0}",
                        out(reg) _,
                    );
                }
            }
        }

        #[inline(always)]
        fn ts_read() -> OsTs {
            unsafe { ucport_bsp_ts_read() }
        }

        /// Save a frame on the caller's stack and switch
        #[inline(always)]
        fn ctx_sw() {
            unsafe { ucport_arm_ctx_sw() }
        }

        /// The IRQ exit sequence always consults the switch routine
        #[inline(always)]
        fn int_ctx_sw() {}

        unsafe fn start_high_rdy(_isr_top: *mut OsStkElement) -> ! {
            let sp = unsafe { crate::kernel::ucport_switch_context(core::ptr::null_mut()) };
            unsafe { ucport_arm_start(sp) }
        }

        fn idle() {
            // ARM926 wait-for-interrupt
            unsafe { asm!("mcr p15, 0, {0}, c7, c0, 4", in(reg) 0u32) };
        }

        fn debug_poll() {
            DCC.with(|ch| {
                ch.poll();
            });
        }

        fn fatal() -> ! {
            Self::int_disable();
            loop {
                unsafe { asm!("udf #0") };
            }
        }
    }

    /// CP14 debug communications channel
    pub struct Cp14;

    impl DccRegisters for Cp14 {
        #[inline(always)]
        fn ctrl(&mut self) -> u32 {
            let v: u32;
            unsafe { asm!("mrc p14, 0, {0}, c0, c0, 0", out(reg) v) };
            v
        }

        #[inline(always)]
        fn read_data(&mut self) -> u32 {
            let v: u32;
            unsafe { asm!("mrc p14, 0, {0}, c1, c0, 0", out(reg) v) };
            v
        }

        #[inline(always)]
        fn write_data(&mut self, value: u32) {
            unsafe { asm!("mcr p14, 0, {0}, c1, c0, 0", in(reg) value) };
        }
    }

    static DCC: CsCell<DebugChannel<Cp14, RawMemory>> =
        CsCell::new(DebugChannel::new(Cp14, unsafe { RawMemory::new() }));

    // ucport_arm_ctx_sw: called from SVC mode with interrupts masked.
    // ucport_arm_irq:    IRQ vector. Nesting is counted here; the BSP's
    //                    `ucport_bsp_irq` only dispatches and may re-enable
    //                    IRQ to let higher-priority sources nest.
    // ucport_arm_start:  restore the frame at r0.
    global_asm!(
        ".arm",
        ".global ucport_arm_ctx_sw",
        "ucport_arm_ctx_sw:",
        "    stmfd sp!, {{lr}}",
        "    stmfd sp!, {{lr}}",
        "    stmfd sp!, {{r0-r12}}",
        "    mrs   r4, cpsr",
        "    stmfd sp!, {{r4}}",
        "    mov   r0, sp",
        "    bic   sp, sp, #7",
        "    bl    ucport_switch_context",
        "    b     ucport_arm_start",
        "",
        ".global ucport_arm_irq",
        "ucport_arm_irq:",
        "    sub   lr, lr, #4",
        "    stmfd sp!, {{r0-r3}}",
        "    mov   r1, sp",
        "    add   sp, sp, #16",
        "    mov   r2, lr",
        "    mrs   r3, spsr",
        "    msr   cpsr_c, #0xD3",
        "    stmfd sp!, {{r2}}",
        "    stmfd sp!, {{lr}}",
        "    stmfd sp!, {{r4-r12}}",
        "    ldmfd r1!, {{r4-r7}}",
        "    stmfd sp!, {{r4-r7}}",
        "    stmfd sp!, {{r3}}",
        "    mov   r4, sp",
        "    bic   sp, sp, #7",
        "    mov   r0, r4",
        "    bl    ucport_int_enter",
        "    bic   sp, r0, #7",
        "    bl    ucport_bsp_irq",
        "    msr   cpsr_c, #0xD3",
        "    mov   r0, r4",
        "    bl    ucport_int_exit",
        "",
        ".global ucport_arm_start",
        "ucport_arm_start:",
        "    mov   sp, r0",
        "    ldmfd sp!, {{r4}}",
        "    msr   spsr_cxsf, r4",
        "    ldmfd sp!, {{r0-r12, lr, pc}}^",
    );
}
