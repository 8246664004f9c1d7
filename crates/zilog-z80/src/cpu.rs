//! Tick engine, bus cycles and interrupt entry.

use emu_core::{Chip, Observable, Pins, Value};

use crate::decode::{INT_ACK, MAIN, NMI_ACK, PSEUDO};
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
use crate::pipeline::{BOUNDARY, LOAD_IR, Pipeline, STEP, WAIT};
use crate::registers::Registers;

/// Which register the `HL` slot of the current instruction refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub(crate) enum Index {
    #[default]
    Hl,
    Ix,
    Iy,
}

/// Zilog Z80, advanced one T-state per [`Z80::tick`].
///
/// The CPU never touches memory or ports itself. Each tick it takes the
/// pin state left by the previous tick (with whatever data the host or
/// peripherals put on the bus) and returns the pins for this T-state.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Z80 {
    pub(crate) regs: Registers,
    /// `(table | opcode) << 4 | step`.
    pub(crate) ir: u16,
    pub(crate) pip: Pipeline,
    pub(crate) pins: Pins,
    /// Table the next opcode fetch decodes into.
    pub(crate) table: u16,
    pub(crate) index: Index,
    /// Effective address of a `(HL)`/`(IX+d)` operand.
    pub(crate) addr: u16,
    pub(crate) dlatch: u8,
    /// 16-bit operand being assembled from two bus reads.
    pub(crate) tmp: u16,
    /// Where to resume after the displacement pseudo-op.
    pub(crate) ret_ir: u16,
    nmi_line: bool,
    nmi_pending: bool,
    int_line: bool,
    /// `EI` just ran: interrupts stay blocked for one more instruction.
    pub(crate) ei_delay: bool,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::default(),
            ir: 0,
            pip: Pipeline::at_boundary(),
            pins: Pins::new(),
            table: MAIN,
            index: Index::Hl,
            addr: 0,
            dlatch: 0,
            tmp: 0,
            ret_ir: 0,
            nmi_line: false,
            nmi_pending: false,
            int_line: false,
            ei_delay: false,
        }
    }

    /// Power-on state. The next tick fetches the opcode at 0x0000.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Abandon the current instruction and fetch at `pc` on the next tick.
    pub fn prefetch(&mut self, pc: u16) {
        self.regs.pc = pc;
        self.regs.halted = false;
        self.pip = Pipeline::at_boundary();
        self.ir = 0;
        self.index = Index::Hl;
        self.ei_delay = false;
    }

    #[must_use]
    pub fn regs(&self) -> &Registers {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    /// Pins returned by the last tick.
    #[must_use]
    pub fn pins(&self) -> Pins {
        self.pins
    }

    #[must_use]
    pub fn ir(&self) -> u16 {
        self.ir
    }

    #[must_use]
    pub fn pipeline(&self) -> Pipeline {
        self.pip
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.regs.halted
    }

    /// The next tick starts a new instruction (or interrupt response).
    #[must_use]
    pub fn at_boundary(&self) -> bool {
        self.pip.fires(BOUNDARY)
    }

    /// Advance one T-state.
    pub fn tick(&mut self, pins: Pins) -> Pins {
        if self.pip.fires(WAIT) && pins.is_set(Pins::WAIT) {
            self.pins = pins;
            return pins;
        }
        if pins.is_set(Pins::RES) {
            self.reset();
            self.pins = pins.without(Pins::CTRL | Pins::HALT);
            return self.pins;
        }

        let nmi = pins.is_set(Pins::NMI);
        if nmi && !self.nmi_line {
            self.nmi_pending = true;
        }
        self.nmi_line = nmi;
        // INT is level triggered; devices drive it afresh every tick.
        self.int_line = pins.is_set(Pins::INT);
        self.pins = pins.without(Pins::CTRL | Pins::RETI | Pins::INT);

        if self.pip.fires(LOAD_IR) {
            self.ir = (self.table | u16::from(self.pins.data())) << 4;
        }
        if self.pip.fires(BOUNDARY) {
            self.boundary();
        } else if self.pip.fires(STEP) {
            self.step();
        }
        self.pip.advance();

        self.pins = self.pins.with_control(Pins::HALT, self.regs.halted);
        self.pins
    }

    /// Start the next instruction, unless an interrupt takes priority.
    fn boundary(&mut self) {
        self.index = Index::Hl;
        let ei_delay = std::mem::take(&mut self.ei_delay);

        if self.nmi_pending {
            self.nmi_pending = false;
            self.leave_halt();
            self.regs.iff1 = false;
            // Opcode fetch whose result is discarded.
            self.pins = self
                .pins
                .with_address(self.regs.pc)
                .with_control(Pins::M1 | Pins::MREQ | Pins::RD, true);
            self.ir = (PSEUDO | NMI_ACK) << 4;
            self.pip.schedule(WAIT, 1);
            self.pip.schedule(STEP, 2);
        } else if self.int_line && self.regs.iff1 && !ei_delay {
            self.leave_halt();
            self.regs.iff1 = false;
            self.regs.iff2 = false;
            self.pins = self
                .pins
                .with_address(self.regs.pc)
                .with_control(Pins::M1, true);
            self.ir = ((PSEUDO | INT_ACK) << 4) | 1;
            self.next(2);
        } else {
            self.fetch(MAIN);
        }
    }

    fn leave_halt(&mut self) {
        if self.regs.halted {
            self.regs.halted = false;
            self.regs.pc = self.regs.pc.wrapping_add(1);
        }
    }

    fn step(&mut self) {
        let ir = self.ir;
        self.ir = ir.wrapping_add(1);
        let step = (ir & 0xF) as u8;
        if step == 0 {
            self.refresh();
            self.next(1);
            return;
        }
        let op = (ir >> 4) as u8;
        match ir >> 12 {
            0 => self.exec_main(op, step),
            1 => self.exec_ed(op, step),
            2 => self.exec_cb(op, step),
            3 => self.exec_ddcb(op, step),
            _ => self.exec_pseudo(op, step),
        }
    }

    // -----------------------------------------------------------------------
    // Scheduling and bus cycles
    // -----------------------------------------------------------------------

    /// Run the next step `delay` ticks from now.
    pub(crate) fn next(&mut self, delay: u32) {
        self.pip.schedule(STEP, delay);
    }

    /// Finish the instruction; the next one starts `delay` ticks from now.
    pub(crate) fn done(&mut self, delay: u32) {
        self.pip.schedule(BOUNDARY, delay);
    }

    /// Continue at micro-step `step` of the current instruction.
    pub(crate) fn goto(&mut self, step: u16) {
        self.ir = (self.ir & !0xF) | step;
    }

    /// M1 T1: opcode read at PC. The opcode is latched into IR two ticks
    /// later, together with the refresh step.
    pub(crate) fn fetch(&mut self, table: u16) {
        self.table = table;
        self.pins = self
            .pins
            .with_address(self.regs.pc)
            .with_control(Pins::M1 | Pins::MREQ | Pins::RD, true);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.pip.schedule(WAIT, 1);
        self.pip.schedule(LOAD_IR, 2);
        self.pip.schedule(STEP, 2);
    }

    /// M1 T3: refresh address on the bus, R's low seven bits count up.
    pub(crate) fn refresh(&mut self) {
        let addr = u16::from(self.regs.i) << 8 | u16::from(self.regs.r);
        self.pins = self
            .pins
            .with_address(addr)
            .with_control(Pins::MREQ | Pins::RFSH, true);
        self.regs.r = (self.regs.r & 0x80) | (self.regs.r.wrapping_add(1) & 0x7F);
    }

    /// Memory read; the following step latches the data in T3.
    pub(crate) fn mread(&mut self, addr: u16) {
        self.pins = self
            .pins
            .with_address(addr)
            .with_control(Pins::MREQ | Pins::RD, true);
        self.pip.schedule(WAIT, 1);
        self.pip.schedule(STEP, 2);
    }

    /// Read the byte at PC and step past it.
    pub(crate) fn imm8(&mut self) {
        self.mread(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
    }

    /// Memory write. The caller schedules what follows: three ticks
    /// later is the next machine cycle.
    pub(crate) fn mwrite(&mut self, addr: u16, data: u8) {
        self.pins = self
            .pins
            .with_address_data(addr, data)
            .with_control(Pins::MREQ | Pins::WR, true);
        self.pip.schedule(WAIT, 1);
    }

    /// IO read with its automatic wait state; latched in T3, three ticks on.
    pub(crate) fn ioread(&mut self, port: u16) {
        self.pins = self
            .pins
            .with_address(port)
            .with_control(Pins::IORQ | Pins::RD, true);
        self.pip.schedule(WAIT, 2);
        self.pip.schedule(STEP, 3);
    }

    /// IO write. The next machine cycle starts four ticks later.
    pub(crate) fn iowrite(&mut self, port: u16, data: u8) {
        self.pins = self
            .pins
            .with_address_data(port, data)
            .with_control(Pins::IORQ | Pins::WR, true);
        self.pip.schedule(WAIT, 2);
    }

    /// Interrupt acknowledge T3: the device puts its vector (or opcode)
    /// on the bus in response to M1|IORQ.
    pub(crate) fn int_ack(&mut self) {
        self.pins = self
            .pins
            .with_address(self.regs.pc)
            .with_control(Pins::M1 | Pins::IORQ, true);
        self.pip.schedule(WAIT, 1);
    }

    /// Pulse the daisy chain's RETI line for this tick.
    pub(crate) fn signal_reti(&mut self) {
        self.pins.set_control(Pins::RETI);
    }

    pub(crate) fn data(&self) -> u8 {
        self.pins.data()
    }

    /// Run ticks against `bus` until the current instruction finishes.
    /// Returns the number of T-states taken.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn run_instruction(&mut self, mut bus: impl FnMut(Pins) -> Pins) -> u32 {
        let mut pins = self.pins;
        let mut ticks = 0;
        loop {
            pins = bus(self.tick(pins));
            ticks += 1;
            if self.at_boundary() {
                return ticks;
            }
        }
    }
}

impl Chip for Z80 {
    fn tick(&mut self, pins: Pins) -> Pins {
        Z80::tick(self, pins)
    }
}

impl Observable for Z80 {
    fn query(&self, path: &str) -> Option<Value> {
        let r = &self.regs;
        let flag = |mask: u8| Some(Value::Bool(r.f & mask != 0));
        match path {
            "a" => Some(r.a.into()),
            "f" => Some(r.f.into()),
            "b" => Some(r.b.into()),
            "c" => Some(r.c.into()),
            "d" => Some(r.d.into()),
            "e" => Some(r.e.into()),
            "h" => Some(r.h.into()),
            "l" => Some(r.l.into()),
            "af" => Some(r.af().into()),
            "bc" => Some(r.bc().into()),
            "de" => Some(r.de().into()),
            "hl" => Some(r.hl().into()),
            "af'" => Some(r.af_alt.into()),
            "bc'" => Some(r.bc_alt.into()),
            "de'" => Some(r.de_alt.into()),
            "hl'" => Some(r.hl_alt.into()),
            "ix" => Some(r.ix.into()),
            "iy" => Some(r.iy.into()),
            "sp" => Some(r.sp.into()),
            "pc" => Some(r.pc.into()),
            "i" => Some(r.i.into()),
            "r" => Some(r.r.into()),
            "wz" => Some(r.wz.into()),
            "im" => Some(r.im.into()),
            "iff1" => Some(r.iff1.into()),
            "iff2" => Some(r.iff2.into()),
            "halted" => Some(r.halted.into()),
            "flags.s" => flag(SF),
            "flags.z" => flag(ZF),
            "flags.y" => flag(YF),
            "flags.h" => flag(HF),
            "flags.x" => flag(XF),
            "flags.p" => flag(PF),
            "flags.n" => flag(NF),
            "flags.c" => flag(CF),
            "ir" => Some(self.ir.into()),
            "pipeline" => Some(self.pip.bits().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "a", "f", "b", "c", "d", "e", "h", "l", "af", "bc", "de", "hl", "af'", "bc'", "de'",
            "hl'", "ix", "iy", "sp", "pc", "i", "r", "wz", "im", "iff1", "iff2", "halted",
            "flags.s", "flags.z", "flags.y", "flags.h", "flags.x", "flags.p", "flags.n",
            "flags.c", "ir", "pipeline",
        ]
    }
}
