//! The machine: CPU, memory, port decoding and frame timing.

use drive_cpc_floppy::DrivePair;
use emu_core::{Chip, Clock, Pins, Ticks};
use format_dsk::DskError;
use nec_upd765::Upd765;
use peripheral_beeper::Beeper;
use peripheral_keyboard_matrix::KeyboardMatrix;
use zilog_z80::Z80;

use crate::config::Plus3Config;
use crate::keys;

/// T-states per video frame (228 per line, 311 lines).
pub const FRAME_TICKS: u32 = 70_908;
/// The ULA holds INT for the first 32 T-states of each frame.
pub const INT_TICKS: u32 = 32;

/// Largest ROM image mapped at 0x0000.
const ROM_WINDOW: usize = 0x4000;

/// Sees every tick after the bus has settled.
pub trait Observer {
    fn on_tick(&mut self, pins: Pins, cpu: &Z80);
}

impl<F: FnMut(Pins, &Z80)> Observer for F {
    fn on_tick(&mut self, pins: Pins, cpu: &Z80) {
        self(pins, cpu);
    }
}

/// A Spectrum +3 without video or paging.
///
/// Port decoding follows the +3: any even port is the ULA (keyboard in,
/// speaker out), 0x2FFD is the FDC status register, 0x3FFD its data
/// register and 0x1FFD bit 3 the drive motor.
pub struct Plus3 {
    cpu: Z80,
    ram: Box<[u8; 0x10000]>,
    /// Bytes from 0x0000 that ignore writes.
    rom_len: usize,
    fdc: Upd765<DrivePair>,
    keyboard: KeyboardMatrix,
    beeper: Beeper,
    clock: Clock,
    /// Input to the CPU's next tick.
    pins: Pins,
    speaker: bool,
    audio_hz: u32,
    audio: Vec<f32>,
    frame_tick: u32,
    ticks: u64,
    observer: Option<Box<dyn Observer>>,
}

impl Plus3 {
    /// # Panics
    ///
    /// If the configured clock or audio rates are out of range.
    #[must_use]
    pub fn new(config: Plus3Config) -> Self {
        let mut ram = Box::new([0u8; 0x10000]);
        let mut rom_len = 0;
        if let Some(rom) = &config.rom {
            if rom.len() > ROM_WINDOW {
                log::warn!(
                    "ROM image is {} bytes, mapping the first {ROM_WINDOW}",
                    rom.len()
                );
            }
            rom_len = rom.len().min(ROM_WINDOW);
            ram[..rom_len].copy_from_slice(&rom[..rom_len]);
        }

        let tick_khz = u32::try_from(config.cpu_hz / 1000).unwrap_or(u32::MAX);
        Self {
            cpu: Z80::new(),
            ram,
            rom_len,
            fdc: Upd765::new(DrivePair::new()),
            keyboard: keys::keyboard(config.sticky_keys),
            beeper: Beeper::new(tick_khz, config.audio_hz, config.beeper_volume),
            clock: Clock::new(config.cpu_hz),
            pins: Pins::new(),
            speaker: false,
            audio_hz: config.audio_hz,
            audio: Vec::new(),
            frame_tick: 0,
            ticks: 0,
            observer: None,
        }
    }

    /// Reset the CPU and the peripherals. RAM keeps its contents.
    pub fn reset(&mut self) {
        log::info!("+3: reset");
        self.cpu.reset();
        self.fdc.reset();
        self.fdc.drives_mut().motor(false);
        self.beeper.reset();
        self.pins = Pins::new();
        self.speaker = false;
        self.frame_tick = 0;
    }

    pub fn set_observer(&mut self, observer: Box<dyn Observer>) {
        self.observer = Some(observer);
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// Run for `elapsed_us` of emulated time, finishing the instruction
    /// in progress. Returns the T-states executed.
    pub fn exec(&mut self, elapsed_us: u64) -> u32 {
        let budget = self.clock.ticks_to_run(elapsed_us).get();
        let mut executed = 0u64;
        while executed < budget || !self.cpu.at_boundary() {
            self.tick();
            executed += 1;
        }
        self.clock.ticks_executed(Ticks::new(executed));
        u32::try_from(executed).unwrap_or(u32::MAX)
    }

    /// Advance the whole machine by one T-state.
    pub fn tick(&mut self) {
        let mut pins = self.cpu.tick(self.pins);

        if pins.is_set(Pins::MREQ) {
            let addr = usize::from(pins.address());
            if pins.is_set(Pins::RD) {
                pins = pins.with_data(self.ram[addr]);
            } else if pins.is_set(Pins::WR) && addr >= self.rom_len {
                self.ram[addr] = pins.data();
            }
        } else if pins.is_set(Pins::IORQ) {
            pins = self.io(pins);
        }

        let beeper = Chip::tick(
            &mut self.beeper,
            Pins::new().with_control(Beeper::SPEAKER, self.speaker),
        );
        if beeper.is_set(Beeper::SAMPLE_READY) {
            self.audio.push(self.beeper.sample());
        }

        self.frame_tick += 1;
        if self.frame_tick >= FRAME_TICKS {
            self.frame_tick = 0;
        }
        pins = pins.with_control(Pins::INT, self.frame_tick < INT_TICKS);

        self.pins = pins;
        self.ticks += 1;
        if let Some(observer) = self.observer.as_mut() {
            observer.on_tick(pins, &self.cpu);
        }
    }

    fn io(&mut self, mut pins: Pins) -> Pins {
        // Interrupt acknowledge: nothing drives the bus.
        if pins.is_set(Pins::M1) {
            return pins.with_data(0xFF);
        }
        let port = pins.address();
        let read = pins.is_set(Pins::RD);

        if port & 0x0001 == 0 {
            if read {
                let half_rows = u16::from(!(port >> 8) as u8);
                let lines = self.keyboard.test_lines(half_rows);
                pins = pins.with_data(0xE0 | (!lines as u8 & 0x1F));
            } else {
                self.speaker = pins.data() & 0x10 != 0;
            }
            return pins;
        }

        match port & 0xF002 {
            // The FDC's A0 is wired to A12: 0x2FFD status, 0x3FFD data.
            0x2000 | 0x3000 => {
                let fdc_pins = pins
                    .with_address((port >> 12) & 1)
                    .with_control(nec_upd765::CS, true);
                let out = self.fdc.iorq(fdc_pins);
                if read {
                    pins = pins.with_data(out.data());
                }
            }
            0x1000 if !read => {
                let on = pins.data() & 0x08 != 0;
                self.fdc.drives_mut().motor(on);
            }
            _ if read => pins = pins.with_data(0xFF),
            _ => {}
        }
        pins
    }

    /// Drain the beeper samples produced so far.
    pub fn take_audio(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.audio)
    }

    #[must_use]
    pub fn audio_hz(&self) -> u32 {
        self.audio_hz
    }

    /// Load a DSK image into drive 0 (A:) or 1 (B:).
    ///
    /// # Panics
    ///
    /// If `drive` is not 0 or 1.
    pub fn insert_disc(&mut self, drive: usize, image: Vec<u8>) -> Result<(), DskError> {
        let Some(d) = self.fdc.drives_mut().drive_mut(drive) else {
            panic!("drive {drive} out of range");
        };
        d.insert_disc(image)
    }

    /// Remove the disc from `drive`, returning the image with any writes.
    pub fn eject_disc(&mut self, drive: usize) -> Option<Vec<u8>> {
        self.fdc.drives_mut().drive_mut(drive)?.eject_disc()
    }

    pub fn key_down(&mut self, key: u8) {
        self.keyboard.key_down(key);
    }

    pub fn key_up(&mut self, key: u8) {
        self.keyboard.key_up(key);
    }

    /// Once per host frame: ages released keys.
    pub fn frame_update(&mut self) {
        self.keyboard.update();
    }

    #[must_use]
    pub fn cpu(&self) -> &Z80 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Z80 {
        &mut self.cpu
    }

    #[must_use]
    pub fn ram(&self) -> &[u8; 0x10000] {
        &self.ram
    }

    /// Write straight into memory, ROM included.
    pub fn load(&mut self, addr: u16, bytes: &[u8]) {
        let start = usize::from(addr);
        let end = (start + bytes.len()).min(self.ram.len());
        self.ram[start..end].copy_from_slice(&bytes[..end - start]);
    }

    #[must_use]
    pub fn fdc(&self) -> &Upd765<DrivePair> {
        &self.fdc
    }

    pub fn fdc_mut(&mut self) -> &mut Upd765<DrivePair> {
        &mut self.fdc
    }

    #[must_use]
    pub fn keyboard(&self) -> &KeyboardMatrix {
        &self.keyboard
    }

    #[must_use]
    pub fn beeper(&self) -> &Beeper {
        &self.beeper
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// T-states since power-on.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Position within the current frame.
    #[must_use]
    pub fn frame_tick(&self) -> u32 {
        self.frame_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_rom_maps_one_window() {
        let m = Plus3::new(Plus3Config {
            rom: Some(vec![0xAA; 0x10000]),
            ..Plus3Config::default()
        });
        assert_eq!(m.ram()[0x3FFF], 0xAA);
        assert_eq!(m.ram()[0x4000], 0x00);
    }

    #[test]
    fn int_covers_start_of_frame() {
        let mut m = Plus3::new(Plus3Config::default());
        m.tick();
        assert!(m.pins.is_set(Pins::INT));
        for _ in 1..INT_TICKS {
            m.tick();
        }
        assert!(!m.pins.is_set(Pins::INT));
    }
}
