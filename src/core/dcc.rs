//! Debug communication channel (DCC)
//!
//! Lets an external debugger peek and poke target memory through a pair of
//! narrow registers: a control/status register and a 32-bit data register.
//! The link is half duplex and polled from the idle and tick hooks.
//!
//! Inbound words carry either an address (bit 0 clear) or a command (bit 0
//! set). Command word layout:
//!
//! | bits   | meaning                                               |
//! |--------|-------------------------------------------------------|
//! | 0      | [`op::COMMAND`]                                       |
//! | 1..=16 | 16-bit write payload (high half for [`op::WRITE_U32`])|
//! | 2..=17 | item count - 1 for reads                              |
//! | 24..31 | opcode flags, see [`op`]                              |
//!
//! A 32-bit write is sent as a command without opcode carrying the low half,
//! followed by `WRITE_U32` carrying the high half. Because bit 0 marks
//! commands, odd addresses are sent as an [`op::ODD_ADDR`] command followed
//! by the even address. Words whose opcode bits select nothing are ignored.
//!
//! At most one outbound word is outstanding: a read item is only exported
//! when the control register reports the data register free, otherwise the
//! poll leaves it for the next one.

use core::ptr;

use crate::critical::CriticalSection;

/// Control register: an inbound word is waiting in the data register
pub const DCC_CTRL_R: u32 = 1 << 0;
/// Control register: the last outbound word has not been consumed yet
pub const DCC_CTRL_W: u32 = 1 << 1;

/// Signature in the upper half of the capability word
pub const DCC_SIGNATURE: u32 = 0x91CA_0000;
/// Supported operations, one bit per opcode flag
pub const DCC_CAPS: u32 = (op::READ_U32
    | op::READ_U16
    | op::READ_U8
    | op::GET_CAPS
    | op::WRITE_U32
    | op::WRITE_U16
    | op::WRITE_U8)
    >> 24;

/// Command word flags
pub mod op {
    pub const COMMAND: u32 = 0x0000_0001;
    pub const READ_U32: u32 = 0x0100_0000;
    pub const READ_U16: u32 = 0x0200_0000;
    pub const READ_U8: u32 = 0x0400_0000;
    pub const GET_CAPS: u32 = 0x0800_0000;
    pub const WRITE_U32: u32 = 0x1000_0000;
    pub const WRITE_U16: u32 = 0x2000_0000;
    pub const WRITE_U8: u32 = 0x4000_0000;
    pub const ODD_ADDR: u32 = 0x8000_0000;

    pub const READ_ANY: u32 = READ_U32 | READ_U16 | READ_U8;
}

/// Memory access width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    U8,
    U16,
    U32,
}

impl Width {
    #[inline]
    pub const fn bytes(self) -> u32 {
        match self {
            Width::U8 => 1,
            Width::U16 => 2,
            Width::U32 => 4,
        }
    }

    #[inline]
    pub const fn mask(self) -> u32 {
        match self {
            Width::U8 => 0xFF,
            Width::U16 => 0xFFFF,
            Width::U32 => 0xFFFF_FFFF,
        }
    }

    fn of_read(cmd: u32) -> Option<Width> {
        if cmd & op::READ_U32 != 0 {
            Some(Width::U32)
        } else if cmd & op::READ_U16 != 0 {
            Some(Width::U16)
        } else if cmd & op::READ_U8 != 0 {
            Some(Width::U8)
        } else {
            None
        }
    }

    fn of_write(cmd: u32) -> Option<Width> {
        if cmd & op::WRITE_U32 != 0 {
            Some(Width::U32)
        } else if cmd & op::WRITE_U16 != 0 {
            Some(Width::U16)
        } else if cmd & op::WRITE_U8 != 0 {
            Some(Width::U8)
        } else {
            None
        }
    }
}

// ============ Command encoding (debugger side) ============

/// Read `items` consecutive values of `width` (1..=65536)
pub const fn cmd_read(width: Width, items: u32) -> u32 {
    let flag = match width {
        Width::U8 => op::READ_U8,
        Width::U16 => op::READ_U16,
        Width::U32 => op::READ_U32,
    };
    op::COMMAND | flag | ((items.saturating_sub(1) & 0xFFFF) << 2)
}

/// Write the low `width` bits of a 16-bit payload (the high half for U32)
pub const fn cmd_write(width: Width, payload: u16) -> u32 {
    let flag = match width {
        Width::U8 => op::WRITE_U8,
        Width::U16 => op::WRITE_U16,
        Width::U32 => op::WRITE_U32,
    };
    op::COMMAND | flag | ((payload as u32) << 1)
}

/// Latch the low half of a following 32-bit write
pub const fn cmd_data(low: u16) -> u32 {
    op::COMMAND | ((low as u32) << 1)
}

/// Mark the next address as odd
pub const fn cmd_odd_addr() -> u32 {
    op::COMMAND | op::ODD_ADDR
}

/// Ask for the capability word
pub const fn cmd_get_caps() -> u32 {
    op::COMMAND | op::GET_CAPS
}

// ============ Hardware bindings ============

/// The control/status and data register pair
pub trait DccRegisters {
    /// Read the control/status register
    fn ctrl(&mut self) -> u32;
    /// Take the inbound word
    fn read_data(&mut self) -> u32;
    /// Hand an outbound word to the debugger
    fn write_data(&mut self, value: u32);
}

/// Target memory as seen by the debugger
pub trait DccMemory {
    fn read(&mut self, addr: u32, width: Width) -> u32;
    fn write(&mut self, addr: u32, width: Width, value: u32);
}

/// Direct volatile access to the physical address space
pub struct RawMemory {
    _private: (),
}

impl RawMemory {
    /// # Safety
    /// The debugger may then read and write any address. Only hand this to a
    /// channel when the attached tool is trusted.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl DccMemory for RawMemory {
    fn read(&mut self, addr: u32, width: Width) -> u32 {
        let addr = addr as usize;
        unsafe {
            match width {
                Width::U8 => ptr::read_volatile(addr as *const u8) as u32,
                Width::U16 => ptr::read_volatile(addr as *const u16) as u32,
                Width::U32 => ptr::read_volatile(addr as *const u32),
            }
        }
    }

    fn write(&mut self, addr: u32, width: Width, value: u32) {
        let addr = addr as usize;
        unsafe {
            match width {
                Width::U8 => ptr::write_volatile(addr as *mut u8, value as u8),
                Width::U16 => ptr::write_volatile(addr as *mut u16, value as u16),
                Width::U32 => ptr::write_volatile(addr as *mut u32, value),
            }
        }
    }
}

// ============ Protocol state machine ============

/// Channel state carried between polls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DccState {
    /// Last command word
    pub cmd: u32,
    /// Current target address
    pub addr: u32,
    /// Read items still to export
    pub item_cnt: u32,
    /// Write payload being assembled
    pub data: u32,
}

/// Protocol phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DccPhase {
    Idle,
    /// A multi-item read is being exported
    AwaitingDataReady,
}

/// What one poll did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DccEvent {
    /// Nothing inbound and nothing to export
    Idle,
    /// Latched an address
    Address,
    /// Processed a command word
    Command,
    /// Exported one item
    Sent,
    /// An item is ready but the data register is still occupied
    Blocked,
}

/// Debug channel over a register pair
pub struct DebugChannel<R: DccRegisters, M: DccMemory> {
    regs: R,
    mem: M,
    state: DccState,
}

impl<R: DccRegisters, M: DccMemory> DebugChannel<R, M> {
    pub const fn new(regs: R, mem: M) -> Self {
        Self {
            regs,
            mem,
            state: DccState {
                cmd: 0,
                addr: 0,
                item_cnt: 0,
                data: 0,
            },
        }
    }

    #[inline]
    pub fn state(&self) -> &DccState {
        &self.state
    }

    #[inline]
    pub fn phase(&self) -> DccPhase {
        if self.state.item_cnt > 0 {
            DccPhase::AwaitingDataReady
        } else {
            DccPhase::Idle
        }
    }

    #[inline]
    pub fn regs_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    #[inline]
    pub fn mem_mut(&mut self) -> &mut M {
        &mut self.mem
    }

    /// Service the channel once: consume one inbound word, or export one
    /// read item.
    pub fn poll(&mut self) -> DccEvent {
        let _cs = CriticalSection::enter();

        if self.regs.ctrl() & DCC_CTRL_R != 0 {
            let word = self.regs.read_data();
            return if word & op::COMMAND != 0 {
                self.command(word);
                DccEvent::Command
            } else {
                self.address(word);
                DccEvent::Address
            };
        }

        if self.state.item_cnt == 0 {
            return DccEvent::Idle;
        }
        if self.regs.ctrl() & DCC_CTRL_W != 0 {
            return DccEvent::Blocked;
        }
        self.export();
        DccEvent::Sent
    }

    fn address(&mut self, word: u32) {
        let odd = self.state.cmd & op::ODD_ADDR != 0;
        self.state.addr = word | odd as u32;
        self.state.cmd = 0;
        self.state.item_cnt = 0;
    }

    fn command(&mut self, word: u32) {
        let s = &mut self.state;
        s.cmd = word;
        s.item_cnt = 0;

        if word & op::WRITE_U32 != 0 {
            s.data |= (word << 15) & 0xFFFF_0000;
        } else {
            s.data = (word >> 1) & 0xFFFF;
        }

        if word & op::READ_ANY != 0 {
            s.item_cnt = ((word >> 2) & 0xFFFF) + 1;
        } else if word & op::GET_CAPS != 0 {
            s.item_cnt = 1;
        } else if let Some(width) = Width::of_write(word) {
            self.mem.write(s.addr, width, s.data & width.mask());
            s.addr = s.addr.wrapping_add(width.bytes());
        }
    }

    fn export(&mut self) {
        let s = &mut self.state;
        let value = match Width::of_read(s.cmd) {
            Some(width) => {
                let v = self.mem.read(s.addr, width);
                s.addr = s.addr.wrapping_add(width.bytes());
                v
            }
            None => {
                crate::debug!("dcc capability query");
                DCC_SIGNATURE | DCC_CAPS
            }
        };
        self.regs.write_data(value);
        s.item_cnt -= 1;
    }
}
