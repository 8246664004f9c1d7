//! The shared pin bus.
//!
//! Every chip reads and writes the same 64-bit value. Bit positions are a
//! fixed contract:
//!
//! | Bits  | Lines                                   |
//! |-------|-----------------------------------------|
//! | 0-15  | A0-A15 address bus                      |
//! | 16-23 | D0-D7 data bus                          |
//! | 24-34 | M1 MREQ IORQ RD WR HALT INT RES NMI WAIT RFSH |
//! | 37-38 | IEIO, RETI (interrupt daisy chain)      |
//! | 40-63 | chip-specific lines (chip select, flags) |
//!
//! Only one tick's worth of state is ever live. The value is `Copy` and is
//! handed from chip to chip within a tick.

use core::fmt;

/// Pin state for one tick.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pins(u64);

impl Pins {
    pub const ADDR_MASK: u64 = 0xFFFF;
    pub const DATA_SHIFT: u32 = 16;
    pub const DATA_MASK: u64 = 0xFF << Self::DATA_SHIFT;

    /// Machine cycle one (opcode fetch or interrupt acknowledge).
    pub const M1: u64 = 1 << 24;
    /// Memory request.
    pub const MREQ: u64 = 1 << 25;
    /// IO request.
    pub const IORQ: u64 = 1 << 26;
    pub const RD: u64 = 1 << 27;
    pub const WR: u64 = 1 << 28;
    pub const HALT: u64 = 1 << 29;
    /// Maskable interrupt request (level).
    pub const INT: u64 = 1 << 30;
    pub const RES: u64 = 1 << 31;
    /// Non-maskable interrupt (edge).
    pub const NMI: u64 = 1 << 32;
    pub const WAIT: u64 = 1 << 33;
    /// Refresh cycle.
    pub const RFSH: u64 = 1 << 34;

    /// Interrupt enable in/out. High means "no higher-priority device is
    /// being serviced".
    pub const IEIO: u64 = 1 << 37;
    /// Virtual line asserted by the CPU when it decodes RETI.
    pub const RETI: u64 = 1 << 38;

    /// Lines the CPU drives afresh every tick.
    pub const CTRL: u64 = Self::M1 | Self::MREQ | Self::IORQ | Self::RD | Self::WR | Self::RFSH;

    /// First bit available for chip-specific lines.
    pub const CHIP_BASE: u32 = 40;

    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Mask for chip-specific line `n` (40..64).
    #[must_use]
    pub const fn chip_line(n: u32) -> u64 {
        assert!(n >= Self::CHIP_BASE && n < 64, "chip line out of range");
        1 << n
    }

    /// Address bus (A0-A15).
    #[must_use]
    pub const fn address(self) -> u16 {
        (self.0 & Self::ADDR_MASK) as u16
    }

    #[must_use]
    pub const fn with_address(self, addr: u16) -> Self {
        Self((self.0 & !Self::ADDR_MASK) | addr as u64)
    }

    /// Data bus (D0-D7).
    #[must_use]
    pub const fn data(self) -> u8 {
        ((self.0 & Self::DATA_MASK) >> Self::DATA_SHIFT) as u8
    }

    #[must_use]
    pub const fn with_data(self, data: u8) -> Self {
        Self((self.0 & !Self::DATA_MASK) | ((data as u64) << Self::DATA_SHIFT))
    }

    #[must_use]
    pub const fn with_address_data(self, addr: u16, data: u8) -> Self {
        self.with_address(addr).with_data(data)
    }

    pub fn set_control(&mut self, mask: u64) {
        self.0 |= mask;
    }

    pub fn clear_control(&mut self, mask: u64) {
        self.0 &= !mask;
    }

    /// Set or clear `mask` depending on `on`.
    #[must_use]
    pub const fn with_control(self, mask: u64, on: bool) -> Self {
        if on {
            Self(self.0 | mask)
        } else {
            Self(self.0 & !mask)
        }
    }

    #[must_use]
    pub const fn without(self, mask: u64) -> Self {
        Self(self.0 & !mask)
    }

    /// True if every line in `mask` is set.
    #[must_use]
    pub const fn is_set(self, mask: u64) -> bool {
        self.0 & mask == mask
    }

    /// True if any line in `mask` is set.
    #[must_use]
    pub const fn any(self, mask: u64) -> bool {
        self.0 & mask != 0
    }
}

impl fmt::Debug for Pins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(u64, &str); 13] = [
            (Pins::M1, "M1"),
            (Pins::MREQ, "MREQ"),
            (Pins::IORQ, "IORQ"),
            (Pins::RD, "RD"),
            (Pins::WR, "WR"),
            (Pins::HALT, "HALT"),
            (Pins::INT, "INT"),
            (Pins::RES, "RES"),
            (Pins::NMI, "NMI"),
            (Pins::WAIT, "WAIT"),
            (Pins::RFSH, "RFSH"),
            (Pins::IEIO, "IEIO"),
            (Pins::RETI, "RETI"),
        ];
        write!(f, "Pins(A={:04X} D={:02X}", self.address(), self.data())?;
        for (mask, name) in NAMES {
            if self.0 & mask != 0 {
                write!(f, " {name}")?;
            }
        }
        let chip = self.0 >> Self::CHIP_BASE;
        if chip != 0 {
            write!(f, " chip={chip:#x}")?;
        }
        write!(f, ")")
    }
}

impl From<Pins> for u64 {
    fn from(p: Pins) -> Self {
        p.0
    }
}
