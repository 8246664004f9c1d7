//! Core types for tick-driven chip emulation.
//!
//! Every chip is a function from pin state to pin state, advanced one
//! clock tick at a time. A system is built by threading one [`Pins`] value
//! through its chips in a fixed order each tick. [`Clock`] turns host time
//! into tick budgets.

mod chip;
mod clock;
mod daisy;
mod observable;
mod pins;
mod ticks;

pub use chip::Chip;
pub use clock::Clock;
pub use daisy::{DaisyChain, IntState};
pub use observable::{Observable, Value};
pub use pins::Pins;
pub use ticks::Ticks;
