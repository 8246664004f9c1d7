//! A Z80 on 64K of RAM with a simple port map and an optional daisy chain.

#![allow(dead_code)]

use emu_core::{DaisyChain, Pins};
use zilog_z80::Z80;

pub struct Bench {
    pub cpu: Z80,
    pub mem: Box<[u8; 0x10000]>,
    pub pins: Pins,
    /// Value returned for every IO read.
    pub port_in: u8,
    /// `(port, value)` for every IO write, in order.
    pub port_out: Vec<(u16, u8)>,
    /// Devices in priority order.
    pub chain: Vec<DaisyChain>,
    /// Hold NMI high from the next tick on.
    pub nmi: bool,
    pub ticks: u64,
}

impl Bench {
    pub fn new(code: &[u8]) -> Self {
        let mut mem = Box::new([0u8; 0x10000]);
        mem[..code.len()].copy_from_slice(code);
        Self {
            cpu: Z80::new(),
            mem,
            pins: Pins::new(),
            port_in: 0xFF,
            port_out: Vec::new(),
            chain: Vec::new(),
            nmi: false,
            ticks: 0,
        }
    }

    pub fn tick(&mut self) -> Pins {
        let input = self.pins.with_control(Pins::NMI, self.nmi);
        let mut pins = self.cpu.tick(input);
        let out = pins;
        let addr = pins.address();
        if pins.is_set(Pins::MREQ | Pins::RD) {
            pins = pins.with_data(self.mem[usize::from(addr)]);
        } else if pins.is_set(Pins::MREQ | Pins::WR) {
            self.mem[usize::from(addr)] = pins.data();
        } else if pins.is_set(Pins::IORQ | Pins::RD) && !pins.is_set(Pins::M1) {
            pins = pins.with_data(self.port_in);
        } else if pins.is_set(Pins::IORQ | Pins::WR) {
            self.port_out.push((addr, pins.data()));
        }
        if !self.chain.is_empty() {
            pins = pins.with_control(Pins::IEIO, true);
            for dev in &mut self.chain {
                pins = dev.tick(pins);
            }
        }
        self.pins = pins;
        self.ticks += 1;
        out
    }

    /// Run one instruction (or interrupt response) to its boundary.
    pub fn step(&mut self) -> u32 {
        let mut n = 0;
        loop {
            self.tick();
            n += 1;
            if self.cpu.at_boundary() {
                return n;
            }
        }
    }

    pub fn run(&mut self, instructions: usize) {
        for _ in 0..instructions {
            self.step();
        }
    }
}
