//! The tick contract shared by every chip.

use crate::{Pins, Ticks};

/// A chip advanced one clock tick at a time over the pin bus.
///
/// `tick` is a function from the incoming pin state to the outgoing pin
/// state. A chip reads the lines it cares about, updates its own state and
/// drives its outputs. It never panics and always returns a pin value, even
/// when it has nothing to do.
pub trait Chip {
    /// Advance by one tick.
    fn tick(&mut self, pins: Pins) -> Pins;

    /// Advance by `ticks` with the same input pins each time.
    ///
    /// The default calls `tick()` in a loop. Chips may override for speed
    /// but must produce identical results.
    fn advance(&mut self, pins: Pins, ticks: Ticks) -> Pins {
        let mut out = pins;
        for _ in 0..ticks.get() {
            out = self.tick(pins);
        }
        out
    }
}
