//! PowerPC e200 (Book E, 32-bit) port implementation
//!
//! The EABI requires every frame to start with a back-chain word and an LR
//! save word, so a task's initial frame sits on top of a null-terminated
//! two-word innermost frame. The small-data anchors r2 and r13 are copied
//! from the creating context; every task shares them.
//!
//! Frame (40 words, 160 bytes), from the saved stack pointer upward:
//!
//! ```text
//!  0 back chain    1 LR save    2 SRR0    3 SRR1
//!  4 LR            5 CTR        6 XER     7 CR
//!  8 r0            9 r2        10 r3 .. 38 r31     39 pad
//! ```
//!
//! `rN` for N >= 2 lives at word `N + 7`, so `stmw r2`/`lmw r2` move the
//! whole upper block at once.

use crate::frame::{ArchDescriptor, Slot};
use crate::types::{OsStkElement, StackGrowth};

/// CE | EE | ME
const MSR_INIT: OsStkElement = 0x0002_9000;

/// e200 EABI saved register image
pub struct E200Frame;

impl ArchDescriptor for E200Frame {
    const NAME: &'static str = "PowerPC e200";
    const GROWTH: StackGrowth = StackGrowth::Descending;
    const ALIGN: usize = 8;
    const INNER_FRAME_WORDS: usize = 2;
    const FRAME: &'static [Slot] = &[
        Slot::Backchain,
        Slot::Fixed(0),
        Slot::Pc,
        Slot::Status,
        Slot::Return,
        // CTR, XER, CR
        Slot::Fixed(0),
        Slot::Fixed(0),
        Slot::Fixed(0),
        Slot::Gpr(0),
        Slot::Anchor(2),
        Slot::Arg,
        Slot::Gpr(4),
        Slot::Gpr(5),
        Slot::Gpr(6),
        Slot::Gpr(7),
        Slot::Gpr(8),
        Slot::Gpr(9),
        Slot::Gpr(10),
        Slot::Gpr(11),
        Slot::Gpr(12),
        Slot::Anchor(13),
        Slot::Gpr(14),
        Slot::Gpr(15),
        Slot::Gpr(16),
        Slot::Gpr(17),
        Slot::Gpr(18),
        Slot::Gpr(19),
        Slot::Gpr(20),
        Slot::Gpr(21),
        Slot::Gpr(22),
        Slot::Gpr(23),
        Slot::Gpr(24),
        Slot::Gpr(25),
        Slot::Gpr(26),
        Slot::Gpr(27),
        Slot::Gpr(28),
        Slot::Gpr(29),
        Slot::Gpr(30),
        Slot::Gpr(31),
        Slot::Fixed(0),
    ];

    fn status_word(_entry: usize) -> OsStkElement {
        MSR_INIT
    }

    fn anchor(reg: u8) -> OsStkElement {
        #[cfg(target_arch = "powerpc")]
        {
            let v: OsStkElement;
            unsafe {
                match reg {
                    2 => core::arch::asm!("mr {0}, 2", out(reg) v),
                    13 => core::arch::asm!("mr {0}, 13", out(reg) v),
                    _ => v = 0,
                }
            }
            v
        }
        #[cfg(not(target_arch = "powerpc"))]
        {
            let _ = reg;
            0
        }
    }
}

const _: () = assert!(crate::frame::frame_words::<E200Frame>() + 2 <= crate::config::CFG_STK_SIZE_MIN);

#[cfg(all(feature = "port-ppc-e200", target_arch = "powerpc"))]
pub use hw::*;

#[cfg(all(feature = "port-ppc-e200", target_arch = "powerpc"))]
mod hw {
    use core::arch::{asm, global_asm};
    use core::ptr;

    use super::E200Frame;
    use crate::port::Port;
    use crate::types::{CpuSr, OsStkElement, OsTs};

    const MSR_EE: u32 = 0x8000;

    extern "C" {
        fn ucport_e200_restore(sp: *mut OsStkElement) -> !;
    }

    /// e200z core
    pub struct E200;

    impl Port for E200 {
        type Arch = E200Frame;

        #[inline(always)]
        fn int_disable() -> CpuSr {
            let msr: u32;
            unsafe { asm!("mfmsr {0}", "wrteei 0", out(reg) msr) };
            msr & MSR_EE != 0
        }

        #[inline(always)]
        fn int_restore(sr: CpuSr) {
            if sr {
                unsafe { asm!("wrteei 1") };
            }
        }

        /// Lower half of the time base
        #[inline(always)]
        fn ts_read() -> OsTs {
            let tb: u32;
            unsafe { asm!("mftb {0}", out(reg) tb) };
            tb
        }

        /// System call trap (IVOR8)
        #[inline(always)]
        fn ctx_sw() {
            unsafe { asm!("sc") };
        }

        /// The external interrupt exit always consults the switch routine
        #[inline(always)]
        fn int_ctx_sw() {}

        unsafe fn start_high_rdy(_isr_top: *mut OsStkElement) -> ! {
            unsafe {
                let sp = crate::kernel::ucport_switch_context(ptr::null_mut());
                ucport_e200_restore(sp)
            }
        }

        #[inline(always)]
        fn idle() {
            unsafe { asm!("wait") };
        }

        fn fatal() -> ! {
            Self::int_disable();
            loop {
                unsafe { asm!("trap") };
            }
        }
    }

    // ucport_e200_sc:      IVOR8 handler, saves a frame and switches.
    // ucport_e200_ext:     IVOR4 handler. Nesting is counted here;
    //                      `ucport_bsp_irq` only dispatches and may set EE
    //                      to let other sources nest.
    // ucport_e200_restore: load the frame at r3 and `rfi`.
    global_asm!(
        ".macro SAVE_FRAME",
        "    stwu  1, -160(1)",
        "    stw   0, 32(1)",
        "    stmw  2, 36(1)",
        "    mfsrr0 0",
        "    stw   0, 8(1)",
        "    mfsrr1 0",
        "    stw   0, 12(1)",
        "    mflr  0",
        "    stw   0, 16(1)",
        "    mfctr 0",
        "    stw   0, 20(1)",
        "    mfxer 0",
        "    stw   0, 24(1)",
        "    mfcr  0",
        "    stw   0, 28(1)",
        ".endm",
        "",
        ".global ucport_e200_sc",
        ".align 4",
        "ucport_e200_sc:",
        "    SAVE_FRAME",
        "    mr    3, 1",
        "    bl    ucport_switch_context",
        "    b     ucport_e200_restore",
        "",
        ".global ucport_e200_ext",
        ".align 4",
        "ucport_e200_ext:",
        "    SAVE_FRAME",
        "    mr    31, 1",
        "    mr    3, 1",
        "    bl    ucport_int_enter",
        "    clrrwi 1, 3, 4",
        "    li    0, 0",
        "    stwu  0, -16(1)",
        "    bl    ucport_bsp_irq",
        "    wrteei 0",
        "    mr    3, 31",
        "    bl    ucport_int_exit",
        "",
        ".global ucport_e200_restore",
        "ucport_e200_restore:",
        "    mr    1, 3",
        "    lwz   0, 28(1)",
        "    mtcr  0",
        "    lwz   0, 24(1)",
        "    mtxer 0",
        "    lwz   0, 20(1)",
        "    mtctr 0",
        "    lwz   0, 16(1)",
        "    mtlr  0",
        "    lwz   0, 8(1)",
        "    mtsrr0 0",
        "    lwz   0, 12(1)",
        "    mtsrr1 0",
        "    lwz   0, 32(1)",
        "    lmw   2, 36(1)",
        "    addi  1, 1, 160",
        "    rfi",
    );
}
