//! Flag register bits and the lookup helpers shared by the ALU.

/// Sign: bit 7 of the result.
pub const SF: u8 = 0b1000_0000;
/// Zero.
pub const ZF: u8 = 0b0100_0000;
/// Undocumented copy of result bit 5.
pub const YF: u8 = 0b0010_0000;
/// Half carry out of bit 3 (bit 11 for 16-bit adds).
pub const HF: u8 = 0b0001_0000;
/// Undocumented copy of result bit 3.
pub const XF: u8 = 0b0000_1000;
/// Parity or overflow, depending on the instruction.
pub const PF: u8 = 0b0000_0100;
/// Last operation was a subtraction.
pub const NF: u8 = 0b0000_0010;
/// Carry.
pub const CF: u8 = 0b0000_0001;

/// S, Z and the undocumented Y/X bits of a result.
#[must_use]
pub const fn sz53(value: u8) -> u8 {
    let z = if value == 0 { ZF } else { 0 };
    z | (value & (SF | YF | XF))
}

/// [`sz53`] plus even parity.
#[must_use]
pub const fn sz53p(value: u8) -> u8 {
    let p = if value.count_ones() % 2 == 0 { PF } else { 0 };
    sz53(value) | p
}
