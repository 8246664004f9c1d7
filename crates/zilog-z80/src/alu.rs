//! ALU operations.
//!
//! Each function returns the result and the flags it defines. Callers
//! merge in any flags the instruction leaves untouched.

use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, sz53, sz53p};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u8,
    pub flags: u8,
}

impl AluResult {
    const fn new(value: u8, flags: u8) -> Self {
        Self { value, flags }
    }
}

#[must_use]
pub fn add8(a: u8, b: u8, carry: bool) -> AluResult {
    let res = u16::from(a) + u16::from(b) + u16::from(carry);
    let value = res as u8;
    let mut flags = sz53(value) | ((a ^ b ^ value) & HF);
    if (a ^ b) & 0x80 == 0 && (a ^ value) & 0x80 != 0 {
        flags |= PF;
    }
    if res > 0xFF {
        flags |= CF;
    }
    AluResult::new(value, flags)
}

#[must_use]
pub fn sub8(a: u8, b: u8, carry: bool) -> AluResult {
    let res = u16::from(a)
        .wrapping_sub(u16::from(b))
        .wrapping_sub(u16::from(carry));
    let value = res as u8;
    let mut flags = NF | sz53(value) | ((a ^ b ^ value) & HF);
    if (a ^ b) & 0x80 != 0 && (a ^ value) & 0x80 != 0 {
        flags |= PF;
    }
    if res > 0xFF {
        flags |= CF;
    }
    AluResult::new(value, flags)
}

/// `CP`: a subtraction whose Y/X flags come from the operand.
#[must_use]
pub fn cp8(a: u8, b: u8) -> AluResult {
    let r = sub8(a, b, false);
    AluResult::new(a, (r.flags & !(YF | XF)) | (b & (YF | XF)))
}

#[must_use]
pub fn and8(a: u8, b: u8) -> AluResult {
    let value = a & b;
    AluResult::new(value, sz53p(value) | HF)
}

#[must_use]
pub fn xor8(a: u8, b: u8) -> AluResult {
    let value = a ^ b;
    AluResult::new(value, sz53p(value))
}

#[must_use]
pub fn or8(a: u8, b: u8) -> AluResult {
    let value = a | b;
    AluResult::new(value, sz53p(value))
}

/// The eight accumulator operations selected by opcode bits 3-5:
/// ADD, ADC, SUB, SBC, AND, XOR, OR, CP.
#[must_use]
pub fn alu_op(y: u8, a: u8, b: u8, f: u8) -> AluResult {
    let carry = f & CF != 0;
    match y & 7 {
        0 => add8(a, b, false),
        1 => add8(a, b, carry),
        2 => sub8(a, b, false),
        3 => sub8(a, b, carry),
        4 => and8(a, b),
        5 => xor8(a, b),
        6 => or8(a, b),
        _ => cp8(a, b),
    }
}

/// Flags exclude carry, which `INC` leaves alone.
#[must_use]
pub fn inc8(a: u8) -> AluResult {
    let value = a.wrapping_add(1);
    let mut flags = sz53(value) | ((a ^ value) & HF);
    if value == 0x80 {
        flags |= PF;
    }
    AluResult::new(value, flags)
}

/// Flags exclude carry, which `DEC` leaves alone.
#[must_use]
pub fn dec8(a: u8) -> AluResult {
    let value = a.wrapping_sub(1);
    let mut flags = NF | sz53(value) | ((a ^ value) & HF);
    if value == 0x7F {
        flags |= PF;
    }
    AluResult::new(value, flags)
}

/// CB-prefixed rotates and shifts selected by opcode bits 3-5:
/// RLC, RRC, RL, RR, SLA, SRA, SLL, SRL.
#[must_use]
pub fn shift_op(y: u8, v: u8, f: u8) -> AluResult {
    let cin = f & CF;
    let (value, carry) = match y & 7 {
        0 => (v.rotate_left(1), v >> 7),
        1 => (v.rotate_right(1), v & 1),
        2 => ((v << 1) | cin, v >> 7),
        3 => ((v >> 1) | (cin << 7), v & 1),
        4 => (v << 1, v >> 7),
        5 => ((v >> 1) | (v & 0x80), v & 1),
        6 => ((v << 1) | 1, v >> 7),
        _ => (v >> 1, v & 1),
    };
    AluResult::new(value, sz53p(value) | carry)
}

/// `BIT n`. Y/X come from `xy_source`: the operand for registers, WZ's
/// high byte for memory operands.
#[must_use]
pub fn bit(n: u8, v: u8, xy_source: u8, f: u8) -> u8 {
    let masked = v & (1 << (n & 7));
    let mut flags = (f & CF) | HF | (xy_source & (YF | XF));
    if masked == 0 {
        flags |= ZF | PF;
    }
    flags | (masked & SF)
}

/// Accumulator rotates `RLCA`, `RRCA`, `RLA`, `RRA` (opcode bits 3-5 = 0-3).
/// S, Z and P/V survive.
#[must_use]
pub fn rotate_a(y: u8, a: u8, f: u8) -> AluResult {
    let r = shift_op(y, a, f);
    AluResult::new(
        r.value,
        (f & (SF | ZF | PF)) | (r.value & (YF | XF)) | (r.flags & CF),
    )
}

#[must_use]
pub fn daa(a: u8, f: u8) -> AluResult {
    let mut diff = 0u8;
    let mut carry = f & CF;
    let lo = a & 0x0F;
    if f & HF != 0 || lo > 9 {
        diff |= 0x06;
    }
    if carry != 0 || a > 0x99 {
        diff |= 0x60;
        carry = CF;
    }
    let (value, half) = if f & NF != 0 {
        (a.wrapping_sub(diff), f & HF != 0 && lo < 6)
    } else {
        (a.wrapping_add(diff), lo > 9)
    };
    let h = if half { HF } else { 0 };
    AluResult::new(value, sz53p(value) | (f & NF) | carry | h)
}

/// `ADD HL,rr`: returns the sum and its H, C and Y/X flags.
#[must_use]
pub fn add16(a: u16, b: u16) -> (u16, u8) {
    let res = u32::from(a) + u32::from(b);
    let value = res as u16;
    let hi = (value >> 8) as u8;
    let mut flags = (hi & (YF | XF)) | (((a ^ b ^ value) >> 8) as u8 & HF);
    if res > 0xFFFF {
        flags |= CF;
    }
    (value, flags)
}

/// `ADC HL,rr`: full flag set.
#[must_use]
pub fn adc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let res = u32::from(a) + u32::from(b) + u32::from(carry);
    let value = res as u16;
    (value, wide_flags(a, b, value, res > 0xFFFF, false))
}

/// `SBC HL,rr`: full flag set.
#[must_use]
pub fn sbc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let res = u32::from(a)
        .wrapping_sub(u32::from(b))
        .wrapping_sub(u32::from(carry));
    let value = res as u16;
    (value, wide_flags(a, b, value, res > 0xFFFF, true))
}

fn wide_flags(a: u16, b: u16, value: u16, carry: bool, sub: bool) -> u8 {
    let hi = (value >> 8) as u8;
    let mut flags = (hi & (SF | YF | XF)) | (((a ^ b ^ value) >> 8) as u8 & HF);
    if value == 0 {
        flags |= ZF;
    }
    let overflow = if sub {
        (a ^ b) & 0x8000 != 0 && (a ^ value) & 0x8000 != 0
    } else {
        (a ^ b) & 0x8000 == 0 && (a ^ value) & 0x8000 != 0
    };
    if overflow {
        flags |= PF;
    }
    if sub {
        flags |= NF;
    }
    if carry {
        flags |= CF;
    }
    flags
}
