//! Per-tick event schedule.
//!
//! Four independent lanes share one `u64`, 16 bits each. Bit 0 of a lane
//! fires on the current tick; bit n fires n ticks from now. After each
//! tick every lane shifts down by one.

/// Run the next micro-step of the instruction register.
pub const STEP: u64 = 1;
/// Latch the data bus into the instruction register (opcode fetch T3).
pub const LOAD_IR: u64 = 1 << 16;
/// Sample the WAIT input; while it is low the CPU freezes.
pub const WAIT: u64 = 1 << 32;
/// The instruction is complete: check interrupts, then fetch.
pub const BOUNDARY: u64 = 1 << 48;

const LANE_TOP: u64 = 0x8000_8000_8000_8000;

/// Longest delay a lane can express.
pub const MAX_DELAY: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pipeline(u64);

impl Pipeline {
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Only the boundary bit set: the next tick starts an instruction.
    #[must_use]
    pub const fn at_boundary() -> Self {
        Self(BOUNDARY)
    }

    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Schedule `event` (one of the lane constants) `delay` ticks from now.
    pub fn schedule(&mut self, event: u64, delay: u32) {
        debug_assert!(delay <= MAX_DELAY);
        self.0 |= event << delay;
    }

    /// Does `event` fire on this tick?
    #[must_use]
    pub const fn fires(self, event: u64) -> bool {
        self.0 & event != 0
    }

    /// Move every lane on by one tick.
    pub fn advance(&mut self) {
        self.0 = (self.0 >> 1) & !LANE_TOP;
    }

    /// Nothing scheduled at all. A CPU in this state would never run again.
    #[must_use]
    pub const fn is_idle(self) -> bool {
        self.0 == 0
    }
}
