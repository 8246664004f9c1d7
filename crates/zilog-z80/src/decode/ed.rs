//! ED-prefixed opcodes. Anything undefined runs as an eight-tick NOP.

use crate::Z80;
use crate::alu::{adc16, sbc16, sub8};
use crate::flags::{CF, HF, NF, PF, SF, XF, ZF, sz53, sz53p};

const IM_MODES: [u8; 8] = [0, 0, 1, 2, 0, 0, 1, 2];

impl Z80 {
    pub(crate) fn exec_ed(&mut self, op: u8, step: u8) {
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;
        match x {
            1 => self.ed_x1(y, z, step),
            2 if y >= 4 && z <= 3 => self.block(y, z, step),
            _ => self.done(1),
        }
    }

    fn ed_x1(&mut self, y: u8, z: u8, step: u8) {
        let p = y >> 1;
        let q = y & 1;
        match z {
            0 => match step {
                1 => self.next(1),
                2 => self.ioread(self.regs.bc()),
                _ => {
                    let v = self.data();
                    self.regs.f = (self.regs.f & CF) | sz53p(v);
                    if y != 6 {
                        self.set_reg_plain(y, v);
                    }
                    self.regs.wz = self.regs.bc().wrapping_add(1);
                    self.done(1);
                }
            },
            1 => match step {
                1 => self.next(1),
                _ => {
                    // OUT (C),0 on NMOS parts.
                    let v = if y == 6 { 0 } else { self.reg_plain(y) };
                    self.iowrite(self.regs.bc(), v);
                    self.regs.wz = self.regs.bc().wrapping_add(1);
                    self.done(4);
                }
            },
            2 => {
                let hl = self.regs.hl();
                let carry = self.regs.f & CF != 0;
                let (value, flags) = if q == 0 {
                    sbc16(hl, self.rp(p), carry)
                } else {
                    adc16(hl, self.rp(p), carry)
                };
                self.regs.wz = hl.wrapping_add(1);
                self.regs.set_hl(value);
                self.regs.f = flags;
                self.done(8);
            }
            3 => self.ed_load16(p, q, step),
            4 => {
                let r = sub8(0, self.regs.a, false);
                self.regs.a = r.value;
                self.regs.f = r.flags;
                self.done(1);
            }
            5 => match step {
                1 => {
                    if y == 1 {
                        self.signal_reti();
                    }
                    self.next(1);
                }
                2..=4 => self.pop16(step, 2),
                _ => {
                    self.pop16(step, 2);
                    self.regs.pc = self.tmp;
                    self.regs.wz = self.tmp;
                    self.regs.iff1 = self.regs.iff2;
                    self.done(1);
                }
            },
            6 => {
                self.regs.im = IM_MODES[usize::from(y)];
                self.done(1);
            }
            _ => self.ed_misc(y, step),
        }
    }

    /// `LD (nn),rr` and `LD rr,(nn)`.
    fn ed_load16(&mut self, p: u8, q: u8, step: u8) {
        match step {
            1..=5 => {
                self.imm16(step);
                if step == 5 {
                    self.next(1);
                }
            }
            6 if q == 0 => {
                let lo = self.rp(p) as u8;
                self.mwrite(self.tmp, lo);
                self.regs.wz = self.tmp.wrapping_add(1);
                self.next(3);
            }
            7 if q == 0 => {
                let hi = (self.rp(p) >> 8) as u8;
                self.mwrite(self.regs.wz, hi);
                self.done(3);
            }
            6 => {
                self.mread(self.tmp);
                self.regs.wz = self.tmp.wrapping_add(1);
            }
            7 => {
                self.dlatch = self.data();
                self.next(1);
            }
            8 => self.mread(self.regs.wz),
            _ => {
                let value = u16::from(self.data()) << 8 | u16::from(self.dlatch);
                self.set_rp(p, value);
                self.done(1);
            }
        }
    }

    /// `LD I,A`, `LD R,A`, `LD A,I`, `LD A,R`, `RRD`, `RLD`.
    fn ed_misc(&mut self, y: u8, step: u8) {
        match y {
            0 => {
                self.regs.i = self.regs.a;
                self.done(2);
            }
            1 => {
                self.regs.r = self.regs.a;
                self.done(2);
            }
            2 | 3 => {
                let v = if y == 2 { self.regs.i } else { self.regs.r };
                let iff = if self.regs.iff2 { PF } else { 0 };
                self.regs.a = v;
                self.regs.f = (self.regs.f & CF) | sz53(v) | iff;
                self.done(2);
            }
            4 | 5 => match step {
                1 => self.next(1),
                2 => self.mread(self.regs.hl()),
                3 => {
                    let a = self.regs.a;
                    let v = self.data();
                    let (mem, acc) = if y == 4 {
                        ((a << 4) | (v >> 4), (a & 0xF0) | (v & 0x0F))
                    } else {
                        ((v << 4) | (a & 0x0F), (a & 0xF0) | (v >> 4))
                    };
                    self.dlatch = mem;
                    self.regs.a = acc;
                    self.regs.f = (self.regs.f & CF) | sz53p(acc);
                    self.next(5);
                }
                _ => {
                    let hl = self.regs.hl();
                    self.mwrite(hl, self.dlatch);
                    self.regs.wz = hl.wrapping_add(1);
                    self.done(3);
                }
            },
            _ => self.done(1),
        }
    }

    /// LDI/CPI/INI/OUTI and their decrementing and repeating forms.
    /// `y` picks the direction (bit 0) and repeat (bit 1), `z` the kind.
    fn block(&mut self, y: u8, z: u8, step: u8) {
        let dec = y & 1 == 1;
        let repeat = y >= 6;
        match z {
            0 => self.block_ld(dec, repeat, step),
            1 => self.block_cp(dec, repeat, step),
            2 => self.block_in(dec, repeat, step),
            _ => self.block_out(dec, repeat, step),
        }
    }

    fn step_hl(&mut self, dec: bool) {
        let hl = self.regs.hl();
        self.regs
            .set_hl(if dec { hl.wrapping_sub(1) } else { hl.wrapping_add(1) });
    }

    /// Rewind PC onto the ED prefix so the instruction runs again.
    fn block_repeat(&mut self) {
        self.regs.pc = self.regs.pc.wrapping_sub(2);
        self.regs.wz = self.regs.pc.wrapping_add(1);
        self.done(5);
    }

    fn block_ld(&mut self, dec: bool, repeat: bool, step: u8) {
        match step {
            1 => self.next(1),
            2 => self.mread(self.regs.hl()),
            3 => {
                self.dlatch = self.data();
                self.next(1);
            }
            4 => {
                let de = self.regs.de();
                self.mwrite(de, self.dlatch);
                self.regs
                    .set_de(if dec { de.wrapping_sub(1) } else { de.wrapping_add(1) });
                self.step_hl(dec);
                let bc = self.regs.bc().wrapping_sub(1);
                self.regs.set_bc(bc);

                let n = self.dlatch.wrapping_add(self.regs.a);
                let mut f = (self.regs.f & (SF | ZF | CF)) | (n & XF) | ((n & 0x02) << 4);
                if bc != 0 {
                    f |= PF;
                }
                self.regs.f = f;
                if repeat && bc != 0 {
                    self.next(5);
                } else {
                    self.done(5);
                }
            }
            _ => self.block_repeat(),
        }
    }

    fn block_cp(&mut self, dec: bool, repeat: bool, step: u8) {
        match step {
            1 => self.next(1),
            2 => self.mread(self.regs.hl()),
            3 => {
                let v = self.data();
                let r = sub8(self.regs.a, v, false);
                self.step_hl(dec);
                let bc = self.regs.bc().wrapping_sub(1);
                self.regs.set_bc(bc);
                self.regs.wz = if dec {
                    self.regs.wz.wrapping_sub(1)
                } else {
                    self.regs.wz.wrapping_add(1)
                };

                let n = r.value.wrapping_sub(u8::from(r.flags & HF != 0));
                let mut f = (self.regs.f & CF)
                    | NF
                    | (r.flags & (SF | ZF | HF))
                    | (n & XF)
                    | ((n & 0x02) << 4);
                if bc != 0 {
                    f |= PF;
                }
                self.regs.f = f;
                if repeat && bc != 0 && f & ZF == 0 {
                    self.next(6);
                } else {
                    self.done(6);
                }
            }
            _ => self.block_repeat(),
        }
    }

    fn block_in(&mut self, dec: bool, repeat: bool, step: u8) {
        match step {
            1 => self.next(2),
            2 => self.ioread(self.regs.bc()),
            3 => {
                self.dlatch = self.data();
                let bc = self.regs.bc();
                self.regs.wz = if dec {
                    bc.wrapping_sub(1)
                } else {
                    bc.wrapping_add(1)
                };
                self.next(1);
            }
            4 => {
                self.mwrite(self.regs.hl(), self.dlatch);
                self.step_hl(dec);
                let c = if dec {
                    self.regs.c.wrapping_sub(1)
                } else {
                    self.regs.c.wrapping_add(1)
                };
                self.regs.b = self.regs.b.wrapping_sub(1);
                self.block_io_flags(c);
                if repeat && self.regs.b != 0 {
                    self.next(3);
                } else {
                    self.done(3);
                }
            }
            _ => self.block_repeat(),
        }
    }

    fn block_out(&mut self, dec: bool, repeat: bool, step: u8) {
        match step {
            1 => self.next(2),
            2 => self.mread(self.regs.hl()),
            3 => {
                self.dlatch = self.data();
                self.regs.b = self.regs.b.wrapping_sub(1);
                self.next(1);
            }
            4 => {
                let bc = self.regs.bc();
                self.iowrite(bc, self.dlatch);
                self.regs.wz = if dec {
                    bc.wrapping_sub(1)
                } else {
                    bc.wrapping_add(1)
                };
                self.step_hl(dec);
                let l = self.regs.l;
                self.block_io_flags(l);
                if repeat && self.regs.b != 0 {
                    self.next(4);
                } else {
                    self.done(4);
                }
            }
            _ => self.block_repeat(),
        }
    }

    /// Flags of an INI/OUTI-family instruction once B has been decremented.
    /// `k_base` is C±1 for input, the new L for output.
    fn block_io_flags(&mut self, k_base: u8) {
        let v = self.dlatch;
        let b = self.regs.b;
        let k = u16::from(v) + u16::from(k_base);
        let mut f = sz53(b) | (sz53p((k as u8 & 7) ^ b) & PF);
        if v & 0x80 != 0 {
            f |= NF;
        }
        if k > 0xFF {
            f |= HF | CF;
        }
        self.regs.f = f;
    }
}
