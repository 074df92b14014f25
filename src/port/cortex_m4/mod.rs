//! Cortex-M (ARMv7-M) port implementation
//!
//! Context switching goes through the PendSV exception at the lowest
//! priority. Hardware stacks r0-r3, r12, lr, pc and xPSR on exception entry;
//! PendSV pushes a pad word, r4-r11 and the task's EXC_RETURN below them.
//! On FPU targets a task whose hardware frame carries FP state (EXC_RETURN
//! bit 4 clear) also gets s16-s31 saved above that block. Interrupt handlers
//! run on MSP, which points at the shared interrupt stack from start on, so
//! `isr_stack_switch` is left to the hardware.
//!
//! Frame, from the saved stack pointer upward:
//!
//! ```text
//! pad | r4 .. r11 | EXC_RETURN | [s16 .. s31] | r0 r1 r2 r3 r12 lr pc xPSR
//! ```

use crate::frame::{ArchDescriptor, Slot};
use crate::types::{OsStkElement, StackGrowth};

/// Initial xPSR: Thumb state
const INITIAL_XPSR: OsStkElement = 0x0100_0000;

/// Return to thread mode on PSP with a basic (no FP) frame
pub const EXC_RETURN_THREAD_PSP: OsStkElement = 0xFFFF_FFFD;

/// ARMv7-M saved register image
pub struct ArmV7mFrame;

impl ArchDescriptor for ArmV7mFrame {
    const NAME: &'static str = "ARMv7-M";
    const GROWTH: StackGrowth = StackGrowth::Descending;
    const ALIGN: usize = 8;
    const FRAME: &'static [Slot] = &[
        // Pushed by PendSV
        Slot::Fixed(0),
        Slot::Gpr(4),
        Slot::Gpr(5),
        Slot::Gpr(6),
        Slot::Gpr(7),
        Slot::Gpr(8),
        Slot::Gpr(9),
        Slot::Gpr(10),
        Slot::Gpr(11),
        Slot::Fixed(EXC_RETURN_THREAD_PSP),
        // Stacked by hardware
        Slot::Arg,
        Slot::Gpr(1),
        Slot::Gpr(2),
        Slot::Gpr(3),
        Slot::Gpr(12),
        Slot::Return,
        Slot::Pc,
        Slot::Status,
    ];

    fn status_word(_entry: usize) -> OsStkElement {
        INITIAL_XPSR
    }

    // The stacked PC must be halfword aligned; Thumb state lives in xPSR.
    fn pc_word(entry: usize) -> OsStkElement {
        (entry as OsStkElement) & !1
    }
}

const _: () = assert!(crate::frame::frame_words::<ArmV7mFrame>() + 2 <= crate::config::CFG_STK_SIZE_MIN);

#[cfg(all(feature = "port-cortex-m", target_arch = "arm"))]
pub use hw::*;

#[cfg(all(feature = "port-cortex-m", target_arch = "arm"))]
mod hw {
    use core::arch::{asm, naked_asm};

    use cortex_m::peripheral::scb::SystemHandler;
    use cortex_m::peripheral::syst::SystClkSource;
    use cortex_m::register::primask;

    use super::ArmV7mFrame;
    use crate::port::Port;
    use crate::types::{CpuSr, OsStkElement, OsTs};

    /// Cortex-M4 CPU
    pub struct CortexM4;

    impl Port for CortexM4 {
        type Arch = ArmV7mFrame;

        #[inline(always)]
        fn int_disable() -> CpuSr {
            let was_active = primask::read().is_active();
            cortex_m::interrupt::disable();
            was_active
        }

        #[inline(always)]
        fn int_restore(sr: CpuSr) {
            if sr {
                unsafe { cortex_m::interrupt::enable() }
            }
        }

        #[inline(always)]
        fn ts_read() -> OsTs {
            cortex_m::peripheral::DWT::cycle_count()
        }

        /// Trigger context switch from task level
        #[inline(always)]
        fn ctx_sw() {
            cortex_m::peripheral::SCB::set_pendsv();
        }

        /// Trigger context switch from interrupt level
        #[inline(always)]
        fn int_ctx_sw() {
            cortex_m::peripheral::SCB::set_pendsv();
        }

        /// Start the highest priority ready task
        unsafe fn start_high_rdy(isr_top: *mut OsStkElement) -> ! {
            unsafe {
                let mut scb = cortex_m::Peripherals::steal().SCB;

                if crate::config::CFG_TS_EN {
                    os_cpu_ts_init();
                }

                // PendSV and SysTick at the lowest priority
                scb.set_priority(SystemHandler::PendSV, 0xF0);
                scb.set_priority(SystemHandler::SysTick, 0xF0);

                // MSP onto the shared interrupt stack; PSP = 0 marks
                // "no outgoing task" for the first PendSV
                let msp_top = (isr_top as u32) & !7;
                asm!("msr msp, {0}", in(reg) msp_top);
                asm!("msr psp, {0}", in(reg) 0);

                cortex_m::peripheral::SCB::set_pendsv();
                cortex_m::interrupt::enable();
            }
            loop {
                cortex_m::asm::wfi();
            }
        }

        #[inline(always)]
        fn idle() {
            cortex_m::asm::wfi();
        }

        fn fatal() -> ! {
            cortex_m::interrupt::disable();
            loop {
                cortex_m::asm::udf();
            }
        }
    }

    /// Start the DWT cycle counter used by the timestamp service
    pub fn os_cpu_ts_init() {
        let mut p = unsafe { cortex_m::Peripherals::steal() };
        p.DCB.enable_trace();
        p.DWT.enable_cycle_counter();
    }

    /// Initialize SysTick timer for system tick generation
    ///
    /// # Arguments
    /// * `cnts` - Reload value
    ///
    /// # Example
    /// For 16MHz clock with 1000Hz tick rate: cnts = 16_000_000 / 1000 = 16_000
    pub fn os_cpu_systick_init(cnts: u32) {
        let mut p = unsafe { cortex_m::Peripherals::steal() };

        p.SYST.set_reload(cnts - 1);
        p.SYST.clear_current();
        p.SYST.set_clock_source(SystClkSource::Core);
        p.SYST.enable_interrupt();
        p.SYST.enable_counter();
    }

    /// Whether the core has an FPU whose state the hardware may stack
    const HAS_FPU: u32 = cfg!(target_abi = "eabihf") as u32;

    /// PendSV exception handler - performs full context switch
    ///
    /// 1. Save s16-s31 if the task has FP context, then the pad word,
    ///    r4-r11 and EXC_RETURN to the current task's PSP (skipped when PSP
    ///    is 0, i.e. first task)
    /// 2. `ucport_switch_context` commits the save and picks the next task
    /// 3. Restore the same block from the new task's stack
    /// 4. Exception return with the new task's EXC_RETURN unstacks the rest
    #[no_mangle]
    #[unsafe(naked)]
    pub unsafe extern "C" fn PendSV() {
        naked_asm!(
            "cpsid i",
            "dsb",
            "isb",

            "mrs r0, psp",
            "cbz r0, 1f",
            ".if {fpu}",
            "tst lr, #0x10",
            "it eq",
            "vstmdbeq r0!, {{s16-s31}}",
            ".endif",
            // r3 is the pad word; the hardware frame holds the real one
            "stmdb r0!, {{r3-r11, lr}}",

            "1:",
            "push {{r0, lr}}",
            "bl ucport_switch_context",
            "pop {{r1, lr}}",

            "cbz r0, 2f",
            "ldmia r0!, {{r3-r11, lr}}",
            ".if {fpu}",
            "tst lr, #0x10",
            "it eq",
            "vldmiaeq r0!, {{s16-s31}}",
            ".endif",
            "msr psp, r0",

            "2:",
            "cpsie i",
            "dsb",
            "isb",

            "bx lr",
            fpu = const HAS_FPU,
        );
    }
}
