//! Per-T-state instruction decoding.
//!
//! Every instruction is a short sequence of micro-steps. The instruction
//! register holds `(table | opcode) << 4 | step`; each step does the work
//! of one T-state and schedules the next step (or the instruction
//! boundary) through the pipeline. Step 0 is always the refresh half of
//! the opcode fetch.
//!
//! Opcodes are split the usual way: `x = op >> 6`, `y = (op >> 3) & 7`,
//! `z = op & 7`, `p = y >> 1`, `q = y & 1`.

mod cb;
mod ed;
mod main;

use crate::Z80;
use crate::cpu::Index;
use crate::flags::{CF, PF, SF, ZF};

pub(crate) const MAIN: u16 = 0x000;
pub(crate) const ED: u16 = 0x100;
pub(crate) const CB: u16 = 0x200;
pub(crate) const DDCB: u16 = 0x300;
/// Sequences that are not opcodes.
pub(crate) const PSEUDO: u16 = 0x400;

/// Read `d` and form `IX+d`/`IY+d`, then resume the interrupted opcode.
pub(crate) const DISP: u16 = 0x00;
pub(crate) const NMI_ACK: u16 = 0x01;
pub(crate) const INT_ACK: u16 = 0x02;

impl Z80 {
    // -----------------------------------------------------------------------
    // Register access with IX/IY substitution
    // -----------------------------------------------------------------------

    /// HL, IX or IY, whichever the prefix selected.
    pub(crate) fn idx(&self) -> u16 {
        match self.index {
            Index::Hl => self.regs.hl(),
            Index::Ix => self.regs.ix,
            Index::Iy => self.regs.iy,
        }
    }

    pub(crate) fn set_idx(&mut self, value: u16) {
        match self.index {
            Index::Hl => self.regs.set_hl(value),
            Index::Ix => self.regs.ix = value,
            Index::Iy => self.regs.iy = value,
        }
    }

    /// 8-bit register by its 3-bit code. H and L become the index halves
    /// under a DD/FD prefix. Code 6 is the memory operand latch.
    pub(crate) fn reg(&self, r: u8) -> u8 {
        match r & 7 {
            4 => (self.idx() >> 8) as u8,
            5 => self.idx() as u8,
            other => self.reg_plain(other),
        }
    }

    pub(crate) fn set_reg(&mut self, r: u8, value: u8) {
        match r & 7 {
            4 => self.set_idx((self.idx() & 0x00FF) | u16::from(value) << 8),
            5 => self.set_idx((self.idx() & 0xFF00) | u16::from(value)),
            other => self.set_reg_plain(other, value),
        }
    }

    /// 8-bit register ignoring any prefix, as used alongside `(IX+d)`.
    pub(crate) fn reg_plain(&self, r: u8) -> u8 {
        let regs = &self.regs;
        match r & 7 {
            0 => regs.b,
            1 => regs.c,
            2 => regs.d,
            3 => regs.e,
            4 => regs.h,
            5 => regs.l,
            6 => self.dlatch,
            _ => regs.a,
        }
    }

    pub(crate) fn set_reg_plain(&mut self, r: u8, value: u8) {
        let regs = &mut self.regs;
        match r & 7 {
            0 => regs.b = value,
            1 => regs.c = value,
            2 => regs.d = value,
            3 => regs.e = value,
            4 => regs.h = value,
            5 => regs.l = value,
            6 => self.dlatch = value,
            _ => regs.a = value,
        }
    }

    /// BC, DE, HL/IX/IY, SP.
    pub(crate) fn rp(&self, p: u8) -> u16 {
        match p & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.idx(),
            _ => self.regs.sp,
        }
    }

    pub(crate) fn set_rp(&mut self, p: u8, value: u16) {
        match p & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.set_idx(value),
            _ => self.regs.sp = value,
        }
    }

    /// BC, DE, HL/IX/IY, AF: the PUSH/POP set.
    pub(crate) fn rp2(&self, p: u8) -> u16 {
        if p & 3 == 3 {
            self.regs.af()
        } else {
            self.rp(p)
        }
    }

    pub(crate) fn set_rp2(&mut self, p: u8, value: u16) {
        if p & 3 == 3 {
            self.regs.set_af(value);
        } else {
            self.set_rp(p, value);
        }
    }

    /// NZ, Z, NC, C, PO, PE, P, M.
    pub(crate) fn cond(&self, y: u8) -> bool {
        let f = self.regs.f;
        match y & 7 {
            0 => f & ZF == 0,
            1 => f & ZF != 0,
            2 => f & CF == 0,
            3 => f & CF != 0,
            4 => f & PF == 0,
            5 => f & PF != 0,
            6 => f & SF == 0,
            _ => f & SF != 0,
        }
    }

    // -----------------------------------------------------------------------
    // Shared step sequences
    // -----------------------------------------------------------------------

    /// Step 1 of an instruction with a `(HL)` operand: set up the address
    /// and continue with step 2 on the next tick. Under a DD/FD prefix the
    /// displacement is read first, adding eight ticks.
    pub(crate) fn mem_operand(&mut self) {
        if self.index == Index::Hl {
            self.addr = self.regs.hl();
        } else {
            self.ret_ir = self.ir;
            self.ir = ((PSEUDO | DISP) << 4) | 1;
        }
        self.next(1);
    }

    /// Steps 1-5 of an instruction with a 16-bit immediate operand,
    /// assembled in `tmp`.
    pub(crate) fn imm16(&mut self, step: u8) {
        match step {
            1 => self.next(1),
            2 | 4 => self.imm8(),
            3 => {
                self.tmp = u16::from(self.data());
                self.next(1);
            }
            _ => self.tmp |= u16::from(self.data()) << 8,
        }
    }

    /// Steps `first..first + 3` of a 16-bit stack pop into `tmp`.
    pub(crate) fn pop16(&mut self, step: u8, first: u8) {
        match step - first {
            0 | 2 => {
                self.mread(self.regs.sp);
                self.regs.sp = self.regs.sp.wrapping_add(1);
            }
            1 => {
                self.tmp = u16::from(self.data());
                self.next(1);
            }
            _ => self.tmp |= u16::from(self.data()) << 8,
        }
    }

    /// Push one byte. The write takes three ticks; `last` ends the
    /// instruction there, otherwise the next step follows.
    pub(crate) fn push8(&mut self, value: u8, last: bool) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.mwrite(self.regs.sp, value);
        if last {
            self.done(3);
        } else {
            self.next(3);
        }
    }

    // -----------------------------------------------------------------------
    // Pseudo-ops
    // -----------------------------------------------------------------------

    pub(crate) fn exec_pseudo(&mut self, op: u8, step: u8) {
        match u16::from(op) {
            DISP => match step {
                1 => self.imm8(),
                _ => {
                    let d = self.data() as i8;
                    self.addr = self.idx().wrapping_add_signed(i16::from(d));
                    self.regs.wz = self.addr;
                    self.ir = self.ret_ir;
                    self.next(6);
                }
            },
            NMI_ACK => match step {
                1 => self.next(2),
                2 => self.push8((self.regs.pc >> 8) as u8, false),
                _ => {
                    self.push8(self.regs.pc as u8, true);
                    self.regs.pc = 0x0066;
                    self.regs.wz = 0x0066;
                }
            },
            _ => self.int_sequence(step),
        }
    }

    /// Maskable interrupt response. The acknowledge M1 is seven ticks:
    /// M1 alone, then M1|IORQ with the device answering, then refresh.
    fn int_sequence(&mut self, step: u8) {
        match step {
            1 => {
                self.int_ack();
                self.next(2);
            }
            2 => {
                self.dlatch = self.data();
                self.refresh();
                match self.regs.im {
                    // Execute whatever the device put on the bus, normally RST.
                    0 => {
                        self.ir = ((MAIN | u16::from(self.dlatch)) << 4) | 1;
                        self.next(1);
                    }
                    1 => {
                        self.ir = ((MAIN | 0xFF) << 4) | 1;
                        self.next(1);
                    }
                    _ => self.next(3),
                }
            }
            3 => self.push8((self.regs.pc >> 8) as u8, false),
            4 => {
                self.push8(self.regs.pc as u8, false);
            }
            5 => {
                let vector = u16::from(self.regs.i) << 8 | u16::from(self.dlatch);
                self.mread(vector);
            }
            6 => {
                self.tmp = u16::from(self.data());
                self.next(1);
            }
            7 => {
                let vector = u16::from(self.regs.i) << 8 | u16::from(self.dlatch);
                self.mread(vector.wrapping_add(1));
            }
            _ => {
                self.tmp |= u16::from(self.data()) << 8;
                self.regs.pc = self.tmp;
                self.regs.wz = self.tmp;
                self.done(1);
            }
        }
    }
}
