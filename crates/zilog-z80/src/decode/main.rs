//! Unprefixed opcodes, also reached through DD/FD.

use super::{CB, DDCB, ED, MAIN};
use crate::Z80;
use crate::alu::{add16, alu_op, daa, dec8, inc8, rotate_a};
use crate::cpu::Index;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};

impl Z80 {
    pub(crate) fn exec_main(&mut self, op: u8, step: u8) {
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;
        match x {
            0 => self.main_x0(y, z, step),
            1 => self.main_load(y, z, step),
            2 => self.main_alu(y, z, step),
            _ => self.main_x3(y, z, step),
        }
    }

    fn main_x0(&mut self, y: u8, z: u8, step: u8) {
        let p = y >> 1;
        let q = y & 1;
        match z {
            0 => self.relative(y, step),
            1 if q == 0 => {
                // LD rr,nn
                self.imm16(step);
                if step == 5 {
                    self.set_rp(p, self.tmp);
                    self.done(1);
                }
            }
            1 => {
                // ADD HL,rr
                let hl = self.idx();
                let (value, flags) = add16(hl, self.rp(p));
                self.regs.wz = hl.wrapping_add(1);
                self.set_idx(value);
                self.regs.f = (self.regs.f & (SF | ZF | PF)) | flags;
                self.done(8);
            }
            2 => self.indirect_load(p, q, step),
            3 => {
                let rr = self.rp(p);
                let value = if q == 0 {
                    rr.wrapping_add(1)
                } else {
                    rr.wrapping_sub(1)
                };
                self.set_rp(p, value);
                self.done(3);
            }
            4 | 5 => self.inc_dec(y, z == 5, step),
            6 => self.load_immediate(y, step),
            _ => {
                self.accumulator_op(y);
                self.done(1);
            }
        }
    }

    /// NOP, EX AF,AF', DJNZ, JR and JR cc.
    fn relative(&mut self, y: u8, step: u8) {
        match (y, step) {
            (0, _) => self.done(1),
            (1, _) => {
                self.regs.swap_af();
                self.done(1);
            }
            (2, 1) => {
                self.regs.b = self.regs.b.wrapping_sub(1);
                self.next(2);
            }
            (_, 1) => self.next(1),
            (_, 2) => self.imm8(),
            _ => {
                let taken = match y {
                    2 => self.regs.b != 0,
                    3 => true,
                    cc => self.cond(cc - 4),
                };
                if taken {
                    let d = self.data() as i8;
                    self.regs.pc = self.regs.pc.wrapping_add_signed(i16::from(d));
                    self.regs.wz = self.regs.pc;
                    self.done(6);
                } else {
                    self.done(1);
                }
            }
        }
    }

    /// `LD (BC),A` through `LD A,(nn)`.
    fn indirect_load(&mut self, p: u8, q: u8, step: u8) {
        match p {
            0 | 1 => {
                let rr = self.rp(p);
                match (q, step) {
                    (_, 1) => self.next(1),
                    (0, _) => {
                        let a = self.regs.a;
                        self.mwrite(rr, a);
                        self.regs.wz = u16::from(a) << 8 | (rr.wrapping_add(1) & 0xFF);
                        self.done(3);
                    }
                    (_, 2) => self.mread(rr),
                    _ => {
                        self.regs.a = self.data();
                        self.regs.wz = rr.wrapping_add(1);
                        self.done(1);
                    }
                }
            }
            2 => match step {
                1..=4 => self.imm16(step),
                5 => {
                    self.imm16(step);
                    self.regs.wz = self.tmp;
                    self.next(1);
                }
                6 if q == 0 => {
                    let lo = self.idx() as u8;
                    self.mwrite(self.regs.wz, lo);
                    self.regs.wz = self.regs.wz.wrapping_add(1);
                    self.next(3);
                }
                7 if q == 0 => {
                    let hi = (self.idx() >> 8) as u8;
                    self.mwrite(self.regs.wz, hi);
                    self.done(3);
                }
                6 => {
                    self.mread(self.regs.wz);
                    self.regs.wz = self.regs.wz.wrapping_add(1);
                }
                7 => {
                    self.tmp = u16::from(self.data());
                    self.next(1);
                }
                8 => self.mread(self.regs.wz),
                _ => {
                    let value = self.tmp | u16::from(self.data()) << 8;
                    self.set_idx(value);
                    self.done(1);
                }
            },
            _ => match step {
                1..=5 => {
                    self.imm16(step);
                    if step == 5 {
                        self.next(1);
                    }
                }
                6 if q == 0 => {
                    let a = self.regs.a;
                    self.mwrite(self.tmp, a);
                    self.regs.wz = u16::from(a) << 8 | (self.tmp.wrapping_add(1) & 0xFF);
                    self.done(3);
                }
                6 => self.mread(self.tmp),
                _ => {
                    self.regs.a = self.data();
                    self.regs.wz = self.tmp.wrapping_add(1);
                    self.done(1);
                }
            },
        }
    }

    fn inc_dec(&mut self, y: u8, dec: bool, step: u8) {
        let apply = |v: u8, f: u8| {
            let r = if dec { dec8(v) } else { inc8(v) };
            (r.value, (f & CF) | r.flags)
        };
        if y != 6 {
            let (value, flags) = apply(self.reg(y), self.regs.f);
            self.set_reg(y, value);
            self.regs.f = flags;
            self.done(1);
            return;
        }
        match step {
            1 => self.mem_operand(),
            2 => self.mread(self.addr),
            3 => {
                let (value, flags) = apply(self.data(), self.regs.f);
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

    /// `LD r,n` and `LD (HL),n`. Under DD/FD the displacement comes
    /// before the immediate, so there is no separate displacement step.
    fn load_immediate(&mut self, y: u8, step: u8) {
        match step {
            1 => self.next(1),
            2 => self.imm8(),
            3 if y != 6 => {
                self.set_reg(y, self.data());
                self.done(1);
            }
            3 if self.index == Index::Hl => {
                self.dlatch = self.data();
                self.addr = self.regs.hl();
                self.goto(6);
                self.next(1);
            }
            3 => {
                let d = self.data() as i8;
                self.addr = self.idx().wrapping_add_signed(i16::from(d));
                self.regs.wz = self.addr;
                self.next(1);
            }
            4 => self.imm8(),
            5 => {
                self.dlatch = self.data();
                self.next(3);
            }
            _ => {
                self.mwrite(self.addr, self.dlatch);
                self.done(3);
            }
        }
    }

    fn accumulator_op(&mut self, y: u8) {
        let a = self.regs.a;
        let f = self.regs.f;
        let yx = YF | XF;
        match y {
            0..=3 => {
                let r = rotate_a(y, a, f);
                self.regs.a = r.value;
                self.regs.f = r.flags;
            }
            4 => {
                let r = daa(a, f);
                self.regs.a = r.value;
                self.regs.f = r.flags;
            }
            5 => {
                let value = !a;
                self.regs.a = value;
                self.regs.f = (f & (SF | ZF | PF | CF)) | HF | NF | (value & yx);
            }
            6 => self.regs.f = (f & (SF | ZF | PF)) | CF | (a & yx),
            _ => {
                let carry = f & CF;
                self.regs.f = (f & (SF | ZF | PF)) | (carry << 4) | (carry ^ CF) | (a & yx);
            }
        }
    }

    /// `LD r,r'`, `LD r,(HL)`, `LD (HL),r` and `HALT`.
    fn main_load(&mut self, y: u8, z: u8, step: u8) {
        if y == 6 && z == 6 {
            self.regs.halted = true;
            self.regs.pc = self.regs.pc.wrapping_sub(1);
            self.done(1);
        } else if y == 6 {
            match step {
                1 => self.mem_operand(),
                _ => {
                    self.mwrite(self.addr, self.reg_plain(z));
                    self.done(3);
                }
            }
        } else if z == 6 {
            match step {
                1 => self.mem_operand(),
                2 => self.mread(self.addr),
                _ => {
                    self.set_reg_plain(y, self.data());
                    self.done(1);
                }
            }
        } else {
            self.set_reg(y, self.reg(z));
            self.done(1);
        }
    }

    fn main_alu(&mut self, y: u8, z: u8, step: u8) {
        if z != 6 {
            self.alu(y, self.reg(z));
            self.done(1);
            return;
        }
        match step {
            1 => self.mem_operand(),
            2 => self.mread(self.addr),
            _ => {
                self.alu(y, self.data());
                self.done(1);
            }
        }
    }

    /// `ADD A,v` through `CP v`. CP leaves A alone.
    pub(crate) fn alu(&mut self, y: u8, v: u8) {
        let r = alu_op(y, self.regs.a, v, self.regs.f);
        self.regs.a = r.value;
        self.regs.f = r.flags;
    }

    fn main_x3(&mut self, y: u8, z: u8, step: u8) {
        let p = y >> 1;
        let q = y & 1;
        match z {
            0 => match step {
                1 if self.cond(y) => self.next(2),
                1 => self.done(2),
                2..=4 => self.pop16(step, 2),
                _ => {
                    self.pop16(step, 2);
                    self.jump_to_tmp();
                }
            },
            1 if q == 0 => match step {
                1 => self.next(1),
                2..=4 => self.pop16(step, 2),
                _ => {
                    self.pop16(step, 2);
                    self.set_rp2(p, self.tmp);
                    self.done(1);
                }
            },
            1 => match p {
                0 => match step {
                    1 => self.next(1),
                    2..=4 => self.pop16(step, 2),
                    _ => {
                        self.pop16(step, 2);
                        self.jump_to_tmp();
                    }
                },
                1 => {
                    self.regs.swap_main();
                    self.done(1);
                }
                2 => {
                    self.regs.pc = self.idx();
                    self.done(1);
                }
                _ => {
                    self.regs.sp = self.idx();
                    self.done(3);
                }
            },
            2 => {
                self.imm16(step);
                if step == 5 {
                    self.regs.wz = self.tmp;
                    if self.cond(y) {
                        self.regs.pc = self.tmp;
                    }
                    self.done(1);
                }
            }
            3 => self.misc(y, step),
            4 => self.call(Some(y), step),
            5 if q == 0 => match step {
                1 => self.next(2),
                2 => self.push8((self.rp2(p) >> 8) as u8, false),
                _ => self.push8(self.rp2(p) as u8, true),
            },
            5 => match p {
                0 => self.call(None, step),
                1 => self.prefix(Index::Ix, step),
                2 => match step {
                    1 => self.next(1),
                    _ => {
                        self.index = Index::Hl;
                        self.fetch(ED);
                    }
                },
                _ => self.prefix(Index::Iy, step),
            },
            6 => match step {
                1 => self.next(1),
                2 => self.imm8(),
                _ => {
                    self.alu(y, self.data());
                    self.done(1);
                }
            },
            _ => match step {
                1 => self.next(2),
                2 => self.push8((self.regs.pc >> 8) as u8, false),
                _ => {
                    self.push8(self.regs.pc as u8, true);
                    self.regs.pc = u16::from(y) * 8;
                    self.regs.wz = self.regs.pc;
                }
            },
        }
    }

    fn jump_to_tmp(&mut self) {
        self.regs.pc = self.tmp;
        self.regs.wz = self.tmp;
        self.done(1);
    }

    /// DD or FD: swap the HL slot and fetch the real opcode.
    fn prefix(&mut self, index: Index, step: u8) {
        if step == 1 {
            self.next(1);
        } else {
            self.index = index;
            self.fetch(MAIN);
        }
    }

    /// `CALL nn` when `cc` is `None`, otherwise `CALL cc,nn`.
    fn call(&mut self, cc: Option<u8>, step: u8) {
        match step {
            1..=4 => self.imm16(step),
            5 => {
                self.imm16(step);
                self.regs.wz = self.tmp;
                if cc.is_none_or(|y| self.cond(y)) {
                    self.next(2);
                } else {
                    self.done(1);
                }
            }
            6 => self.push8((self.regs.pc >> 8) as u8, false),
            _ => {
                self.push8(self.regs.pc as u8, true);
                self.regs.pc = self.regs.wz;
            }
        }
    }

    /// The `z = 3` column of the x = 3 quarter.
    fn misc(&mut self, y: u8, step: u8) {
        match y {
            0 => {
                self.imm16(step);
                if step == 5 {
                    self.jump_to_tmp();
                }
            }
            1 => match step {
                1 => self.next(1),
                2 if self.index == Index::Hl => self.fetch(CB),
                2 | 4 => self.imm8(),
                3 => {
                    let d = self.data() as i8;
                    self.addr = self.idx().wrapping_add_signed(i16::from(d));
                    self.regs.wz = self.addr;
                    self.next(1);
                }
                // The DDCB opcode byte is read as data, not fetched.
                _ => {
                    self.ir = ((DDCB | u16::from(self.data())) << 4) | 1;
                    self.next(3);
                }
            },
            2 | 3 => match step {
                1 => self.next(1),
                2 => self.imm8(),
                3 => {
                    self.dlatch = self.data();
                    self.next(1);
                }
                4 => {
                    let a = self.regs.a;
                    let port = u16::from(a) << 8 | u16::from(self.dlatch);
                    if y == 2 {
                        self.iowrite(port, a);
                        self.regs.wz = u16::from(a) << 8 | u16::from(self.dlatch.wrapping_add(1));
                        self.done(4);
                    } else {
                        self.ioread(port);
                        self.regs.wz = port.wrapping_add(1);
                    }
                }
                _ => {
                    self.regs.a = self.data();
                    self.done(1);
                }
            },
            4 => self.ex_sp(step),
            5 => {
                let r = &mut self.regs;
                std::mem::swap(&mut r.d, &mut r.h);
                std::mem::swap(&mut r.e, &mut r.l);
                self.done(1);
            }
            6 => {
                self.regs.iff1 = false;
                self.regs.iff2 = false;
                self.done(1);
            }
            _ => {
                self.regs.iff1 = true;
                self.regs.iff2 = true;
                self.ei_delay = true;
                self.done(1);
            }
        }
    }

    /// `EX (SP),HL`: read both bytes, then write them back high first.
    fn ex_sp(&mut self, step: u8) {
        let sp = self.regs.sp;
        match step {
            1 => self.next(1),
            2 => self.mread(sp),
            3 => {
                self.tmp = u16::from(self.data());
                self.next(1);
            }
            4 => self.mread(sp.wrapping_add(1)),
            5 => {
                self.tmp |= u16::from(self.data()) << 8;
                self.next(2);
            }
            6 => {
                let hi = (self.idx() >> 8) as u8;
                self.mwrite(sp.wrapping_add(1), hi);
                self.next(3);
            }
            _ => {
                let lo = self.idx() as u8;
                self.mwrite(sp, lo);
                self.set_idx(self.tmp);
                self.regs.wz = self.tmp;
                self.done(5);
            }
        }
    }
}
