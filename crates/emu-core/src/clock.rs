//! Real-time pacing.

use crate::Ticks;

/// Converts host time into tick budgets and carries overrun between frames.
///
/// The host asks for a budget, runs the system for at least that many
/// ticks (instructions cannot stop midway, so the actual count usually
/// overshoots), then reports what was executed. The overshoot is taken off
/// the next budget, so the long-run average rate matches `frequency_hz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Clock {
    frequency_hz: u64,
    ticks_to_run: u64,
    overrun: u64,
}

impl Clock {
    /// Crystal frequency in Hz (e.g. `3_546_900` for a PAL Spectrum).
    ///
    /// # Panics
    ///
    /// If `frequency_hz` is not greater than 1.
    #[must_use]
    pub fn new(frequency_hz: u64) -> Self {
        assert!(frequency_hz > 1, "clock frequency must be > 1 Hz");
        Self {
            frequency_hz,
            ticks_to_run: 0,
            overrun: 0,
        }
    }

    #[must_use]
    pub const fn frequency_hz(&self) -> u64 {
        self.frequency_hz
    }

    /// Ticks carried over from the previous frame.
    #[must_use]
    pub const fn overrun(&self) -> Ticks {
        Ticks::new(self.overrun)
    }

    /// Budget for a frame that lasted `elapsed_us` microseconds. Never less
    /// than one tick.
    ///
    /// # Panics
    ///
    /// If `elapsed_us` is zero.
    pub fn ticks_to_run(&mut self, elapsed_us: u64) -> Ticks {
        assert!(elapsed_us > 0, "elapsed time must be positive");
        let raw = (u128::from(self.frequency_hz) * u128::from(elapsed_us) / 1_000_000) as u64;
        self.ticks_to_run = raw.saturating_sub(self.overrun).max(1);
        Ticks::new(self.ticks_to_run)
    }

    /// Record how many ticks the frame actually ran.
    pub fn ticks_executed(&mut self, executed: Ticks) {
        self.overrun = executed.get().saturating_sub(self.ticks_to_run);
    }
}
