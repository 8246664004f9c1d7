//! CB-prefixed bit operations, plain and indexed.

use crate::Z80;
use crate::alu::{bit, shift_op};

/// Result of a rotate/shift/RES/SET on `v`, with the new flags. BIT is
/// handled separately since it writes nothing back.
fn bit_op(op: u8, v: u8, f: u8) -> (u8, u8) {
    let y = (op >> 3) & 7;
    match op >> 6 {
        0 => {
            let r = shift_op(y, v, f);
            (r.value, r.flags)
        }
        2 => (v & !(1 << y), f),
        _ => (v | (1 << y), f),
    }
}

impl Z80 {
    pub(crate) fn exec_cb(&mut self, op: u8, step: u8) {
        let y = (op >> 3) & 7;
        let z = op & 7;
        let is_bit = op >> 6 == 1;

        if z != 6 {
            let v = self.reg_plain(z);
            if is_bit {
                self.regs.f = bit(y, v, v, self.regs.f);
            } else {
                let (value, flags) = bit_op(op, v, self.regs.f);
                self.set_reg_plain(z, value);
                self.regs.f = flags;
            }
            self.done(1);
            return;
        }

        match step {
            1 => {
                self.addr = self.regs.hl();
                self.next(1);
            }
            2 => self.mread(self.addr),
            3 if is_bit => {
                let xy = (self.regs.wz >> 8) as u8;
                self.regs.f = bit(y, self.data(), xy, self.regs.f);
                self.done(2);
            }
            3 => {
                let (value, flags) = bit_op(op, self.data(), self.regs.f);
                self.dlatch = value;
                self.regs.f = flags;
                self.next(2);
            }
            _ => {
                self.mwrite(self.addr, self.dlatch);
                self.done(3);
            }
        }
    }

    /// `DD CB d op` / `FD CB d op`. The address was formed while the
    /// displacement was read. Non-BIT forms with a register field other
    /// than 6 also copy the result into that register.
    pub(crate) fn exec_ddcb(&mut self, op: u8, step: u8) {
        let y = (op >> 3) & 7;
        let z = op & 7;
        match step {
            1 => self.mread(self.addr),
            2 if op >> 6 == 1 => {
                let xy = (self.regs.wz >> 8) as u8;
                self.regs.f = bit(y, self.data(), xy, self.regs.f);
                self.done(2);
            }
            2 => {
                let (value, flags) = bit_op(op, self.data(), self.regs.f);
                self.dlatch = value;
                self.regs.f = flags;
                if z != 6 {
                    self.set_reg_plain(z, value);
                }
                self.next(2);
            }
            _ => {
                self.mwrite(self.addr, self.dlatch);
                self.done(3);
            }
        }
    }
}
