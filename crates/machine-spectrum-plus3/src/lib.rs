//! A Spectrum +3 style machine assembled from the chip crates.
//!
//! One Z80 at 3.5469 MHz on 64K of flat RAM, the keyboard and beeper on
//! the ULA port, and a uPD765 with two 3" drives on the +3 ports. There is
//! no video and no memory paging: the machine exists to run the chips
//! against each other one T-state at a time.

pub mod capture;
mod config;
pub mod keys;
mod machine;

pub use config::Plus3Config;
pub use keys::SpectrumKey;
pub use machine::{FRAME_TICKS, INT_TICKS, Observer, Plus3};
