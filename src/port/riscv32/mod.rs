//! RISC-V RV32 (machine mode) port implementation
//!
//! Task-level switches are taken in the machine software interrupt: `ctx_sw`
//! sets MSIP and the trap fires as soon as interrupts are re-enabled. Other
//! traps are counted by `ucport_int_enter`, handed to the BSP (on the shared
//! interrupt stack at the outermost level) and leave through
//! `ucport_int_exit`, which also carries out interrupt-time switches.
//!
//! Frame (32 words, 128 bytes). Register `xN` for N in 5..=31 lives at word
//! `N - 4`; `ra` at word 0, `mepc` at 28, `mstatus` at 29, two pad words.

use crate::frame::{ArchDescriptor, Slot};
use crate::types::{OsStkElement, StackGrowth};

/// MPP = machine, MPIE set: `mret` enters the task with MIE on
const MSTATUS_INIT: OsStkElement = 0x0000_1880;

/// RV32 ILP32 saved register image
pub struct Rv32Frame;

impl ArchDescriptor for Rv32Frame {
    const NAME: &'static str = "RV32";
    const GROWTH: StackGrowth = StackGrowth::Descending;
    const ALIGN: usize = 16;
    const FRAME: &'static [Slot] = &[
        Slot::Return,
        // t0-t2
        Slot::Gpr(5),
        Slot::Gpr(6),
        Slot::Gpr(7),
        // s0-s1
        Slot::Gpr(8),
        Slot::Gpr(9),
        // a0-a7
        Slot::Arg,
        Slot::Gpr(11),
        Slot::Gpr(12),
        Slot::Gpr(13),
        Slot::Gpr(14),
        Slot::Gpr(15),
        Slot::Gpr(16),
        Slot::Gpr(17),
        // s2-s11
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
        // t3-t6
        Slot::Gpr(28),
        Slot::Gpr(29),
        Slot::Gpr(30),
        Slot::Gpr(31),
        Slot::Pc,
        Slot::Status,
        Slot::Fixed(0),
        Slot::Fixed(0),
    ];

    fn status_word(_entry: usize) -> OsStkElement {
        MSTATUS_INIT
    }
}

const _: () = assert!(crate::frame::frame_words::<Rv32Frame>() + 4 <= crate::config::CFG_STK_SIZE_MIN);

#[cfg(all(feature = "port-riscv32", target_arch = "riscv32"))]
pub use hw::*;

#[cfg(all(feature = "port-riscv32", target_arch = "riscv32"))]
mod hw {
    use core::arch::{asm, global_asm};
    use core::ptr;

    use riscv::register::{mcycle, mie, mstatus};

    use super::Rv32Frame;
    use crate::config::CFG_RISCV_MSIP_ADDR;
    use crate::port::Port;
    use crate::types::{CpuSr, OsStkElement, OsTs};

    const MSIP: *mut u32 = CFG_RISCV_MSIP_ADDR as *mut u32;

    extern "C" {
        fn ucport_rv32_trap();
        fn ucport_rv32_restore(sp: *mut OsStkElement) -> !;
    }

    /// RV32 hart in machine mode
    pub struct Rv32;

    impl Port for Rv32 {
        type Arch = Rv32Frame;

        #[inline(always)]
        fn int_disable() -> CpuSr {
            let was = mstatus::read().mie();
            unsafe { mstatus::clear_mie() };
            was
        }

        #[inline(always)]
        fn int_restore(sr: CpuSr) {
            if sr {
                unsafe { mstatus::set_mie() };
            }
        }

        #[inline(always)]
        fn ts_read() -> OsTs {
            mcycle::read() as OsTs
        }

        #[inline(always)]
        fn ctx_sw() {
            unsafe { ptr::write_volatile(MSIP, 1) };
        }

        /// The trap exit sequence already consults the switch routine
        #[inline(always)]
        fn int_ctx_sw() {}

        unsafe fn start_high_rdy(_isr_top: *mut OsStkElement) -> ! {
            unsafe {
                asm!("csrw mtvec, {0}", in(reg) ucport_rv32_trap as usize);
                mie::set_msoft();
                let sp = crate::kernel::ucport_switch_context(ptr::null_mut());
                ucport_rv32_restore(sp)
            }
        }

        #[inline(always)]
        fn idle() {
            unsafe { asm!("wfi") };
        }

        fn fatal() -> ! {
            Self::int_disable();
            loop {
                unsafe { asm!("unimp") };
            }
        }
    }

    // ucport_rv32_trap:    mtvec entry (direct mode). Software interrupts
    //                      switch; everything else goes to `ucport_bsp_trap`
    //                      (mcause in a0), which may set MIE to nest.
    // ucport_rv32_restore: load the frame at a0 and `mret`.
    global_asm!(
        ".macro SAVE_GPRS",
        "    sw ra, 0(sp)",
        "    .irp n, 5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24,25,26,27,28,29,30,31",
        "    sw x\\n, (\\n - 4) * 4(sp)",
        "    .endr",
        ".endm",
        "",
        ".section .text.ucport_rv32_trap",
        ".global ucport_rv32_trap",
        ".align 4",
        "ucport_rv32_trap:",
        "    addi sp, sp, -128",
        "    SAVE_GPRS",
        "    csrr t0, mepc",
        "    sw   t0, 112(sp)",
        "    csrr t0, mstatus",
        "    sw   t0, 116(sp)",
        "    csrr t0, mcause",
        "    li   t1, 0x80000003",
        "    bne  t0, t1, 1f",
        "    li   t0, {msip}",
        "    sw   zero, 0(t0)",
        "    mv   a0, sp",
        "    call ucport_switch_context",
        "    j    ucport_rv32_restore",
        "1:",
        "    mv   s0, sp",
        "    mv   a0, sp",
        "    call ucport_int_enter",
        "    andi sp, a0, -16",
        "    csrr a0, mcause",
        "    call ucport_bsp_trap",
        "    csrci mstatus, 8",
        "    mv   a0, s0",
        "    call ucport_int_exit",
        "",
        ".global ucport_rv32_restore",
        "ucport_rv32_restore:",
        "    mv   sp, a0",
        "    lw   t0, 112(sp)",
        "    csrw mepc, t0",
        "    lw   t0, 116(sp)",
        "    csrw mstatus, t0",
        "    lw   ra, 0(sp)",
        "    .irp n, 5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24,25,26,27,28,29,30,31",
        "    lw   x\\n, (\\n - 4) * 4(sp)",
        "    .endr",
        "    addi sp, sp, 128",
        "    mret",
        msip = const CFG_RISCV_MSIP_ADDR,
    );
}
