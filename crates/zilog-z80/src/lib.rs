//! Zilog Z80 driven at the pin level.
//!
//! Each call to `tick()` advances exactly one T-state. The CPU reads the
//! data bus from the pins it is handed and returns its address, data and
//! control outputs; memory, IO and interrupt controllers live outside.

mod alu;
mod cpu;
mod decode;
mod flags;
mod pipeline;
mod registers;

pub use cpu::Z80;
pub use flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
pub use pipeline::Pipeline;
pub use registers::Registers;
