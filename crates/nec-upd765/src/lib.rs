//! NEC uPD765 floppy disk controller.
//!
//! Used in the ZX Spectrum +3, Amstrad CPC, and IBM PC. Data moves by
//! polling only: the host reads the main status register until RQM is
//! set, then transfers one byte through the data register. DMA and the
//! interrupt line are not modelled.
//!
//! # Register interface
//!
//! - **Main Status Register (MSR)**: read with A0 low (port $2FFD on the +3)
//! - **Data Register**: read/write with A0 high (port $3FFD on the +3)
//!
//! # Phases
//!
//! Command (idle, or collecting parameter bytes) → Execute (data bytes
//! stream between host and drive) → Result (host reads status bytes) →
//! Command.
//!
//! Disc access goes through the [`FloppyDrive`] trait. The controller
//! owns its drives, so nothing else can touch the disc data while it is
//! inserted.

pub mod commands;
mod drive;

use emu_core::{Chip, Observable, Pins, Value};

pub use drive::{DriveInfo, DriveResult, FloppyDrive, NoDrives, SectorId};

/// Main status register bits.
pub mod msr {
    /// Drive 0-3 busy (seeking). Never set: seeks complete instantly.
    pub const DRIVE_BUSY: u8 = 0x0F;
    /// Controller busy: a command is in progress.
    pub const CB: u8 = 1 << 4;
    /// Execution mode.
    pub const EXM: u8 = 1 << 5;
    /// Data direction: set for FDC→CPU.
    pub const DIO: u8 = 1 << 6;
    /// Request for master: data register ready.
    pub const RQM: u8 = 1 << 7;
}

/// Status register 0.
pub mod st0 {
    pub const HD: u8 = 1 << 2;
    pub const NR: u8 = 1 << 3;
    pub const EC: u8 = 1 << 4;
    pub const SE: u8 = 1 << 5;
    /// Abnormal termination.
    pub const AT: u8 = 1 << 6;
    /// Invalid command.
    pub const IC: u8 = 1 << 7;
}

/// Status register 1.
pub mod st1 {
    pub const MA: u8 = 1 << 0;
    pub const NW: u8 = 1 << 1;
    pub const ND: u8 = 1 << 2;
    pub const EN: u8 = 1 << 7;
}

/// Status register 3.
pub mod st3 {
    pub const HD: u8 = 1 << 2;
    pub const TS: u8 = 1 << 3;
    pub const T0: u8 = 1 << 4;
    pub const RY: u8 = 1 << 5;
    pub const WP: u8 = 1 << 6;
    pub const FT: u8 = 1 << 7;
}

/// Chip select. The controller only responds while this is high.
pub const CS: u64 = Pins::chip_line(40);
/// Register select: data register when high, MSR when low.
pub const A0: u64 = 1;

const FIFO_SIZE: usize = 16;

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdcPhase {
    /// Idle, or receiving command parameter bytes.
    Command,
    /// Transferring sector data.
    Execute,
    /// Host reads result bytes.
    Result,
}

impl FdcPhase {
    fn name(self) -> &'static str {
        match self {
            Self::Command => "Command",
            Self::Execute => "Execute",
            Self::Result => "Result",
        }
    }
}

/// NEC uPD765 floppy disk controller.
pub struct Upd765<D> {
    drives: D,
    phase: FdcPhase,
    /// First command byte, including the MT/MF/SK flag bits.
    cmd: u8,
    /// Command parameters on the way in, result bytes on the way out.
    fifo: [u8; FIFO_SIZE],
    fifo_pos: usize,
    fifo_num: usize,
    st: [u8; 4],
    /// Sector currently addressed by a data command.
    sector: SectorId,
    /// Final sector number of a multi-sector transfer.
    eot: u8,
    /// Present cylinder per drive.
    pcn: [u8; 4],
    /// ST0 of a seek or recalibrate that finished and has not been sensed
    /// yet. Kept apart from `st` so later commands cannot clobber it.
    seek_end: Option<u8>,
    /// Last value read from the MSR.
    status: u8,
}

impl<D: FloppyDrive> Upd765<D> {
    #[must_use]
    pub fn new(drives: D) -> Self {
        Self {
            drives,
            phase: FdcPhase::Command,
            cmd: 0,
            fifo: [0; FIFO_SIZE],
            fifo_pos: 0,
            fifo_num: 0,
            st: [0; 4],
            sector: SectorId::default(),
            eot: 0,
            pcn: [0; 4],
            seek_end: None,
            status: 0,
        }
    }

    /// Abort whatever is in progress and return to the command phase.
    pub fn reset(&mut self) {
        self.phase = FdcPhase::Command;
        self.fifo_pos = 0;
        self.fifo_num = 0;
        self.seek_end = None;
    }

    #[must_use]
    pub fn drives(&self) -> &D {
        &self.drives
    }

    pub fn drives_mut(&mut self) -> &mut D {
        &mut self.drives
    }

    #[must_use]
    pub fn phase(&self) -> FdcPhase {
        self.phase
    }

    /// Status registers ST0-ST3 as last set.
    #[must_use]
    pub fn st(&self) -> [u8; 4] {
        self.st
    }

    /// Parameter bytes are being collected for a command.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.phase != FdcPhase::Command || self.fifo_num > 0
    }

    /// Bus access. Acts only while CS is high; RD with A0 reads the data
    /// register, RD without A0 reads the MSR, WR with A0 writes data.
    pub fn iorq(&mut self, mut pins: Pins) -> Pins {
        if pins.is_set(CS) {
            if pins.is_set(Pins::RD) {
                let value = if pins.is_set(A0) {
                    self.read_data()
                } else {
                    self.read_status()
                };
                pins = pins.with_data(value);
            } else if pins.is_set(Pins::WR) && pins.is_set(A0) {
                self.write_data(pins.data());
            }
        }
        pins
    }

    /// Read the main status register.
    pub fn read_status(&mut self) -> u8 {
        let mut status = msr::RQM;
        match self.phase {
            FdcPhase::Command => {
                if self.fifo_num > 0 {
                    status |= msr::CB;
                }
            }
            FdcPhase::Execute => {
                status |= msr::CB | msr::EXM;
                if commands::is_read(self.cmd) {
                    status |= msr::DIO;
                }
            }
            FdcPhase::Result => status |= msr::CB | msr::DIO,
        }
        self.status = status;
        status
    }

    /// Read the data register: sector bytes while executing a read, result
    /// bytes afterwards, 0xFF otherwise.
    pub fn read_data(&mut self) -> u8 {
        match self.phase {
            FdcPhase::Result => {
                let data = self.fifo_read();
                if self.fifo_pos >= self.fifo_num {
                    self.enter_command();
                }
                data
            }
            FdcPhase::Execute if commands::is_read(self.cmd) => self.exec_read(),
            _ => 0xFF,
        }
    }

    /// Write the data register: command and parameter bytes in the command
    /// phase, sector bytes while executing a write. Ignored otherwise.
    pub fn write_data(&mut self, data: u8) {
        match self.phase {
            FdcPhase::Command => {
                if self.fifo_num == 0 {
                    self.cmd = data;
                    self.fifo_reset(commands::command_length(data));
                }
                self.fifo_write(data);
                if self.fifo_pos == self.fifo_num {
                    self.execute_command();
                }
            }
            FdcPhase::Execute if !commands::is_read(self.cmd) => self.exec_write(data),
            _ => {}
        }
    }

    // -----------------------------------------------------------------------
    // Phase transitions and FIFO
    // -----------------------------------------------------------------------

    fn fifo_reset(&mut self, num: usize) {
        debug_assert!(num <= FIFO_SIZE);
        self.fifo_pos = 0;
        self.fifo_num = num;
    }

    fn fifo_write(&mut self, data: u8) {
        if self.fifo_pos < self.fifo_num {
            self.fifo[self.fifo_pos] = data;
            self.fifo_pos += 1;
        }
    }

    fn fifo_read(&mut self) -> u8 {
        if self.fifo_pos < self.fifo_num {
            let data = self.fifo[self.fifo_pos];
            self.fifo_pos += 1;
            data
        } else {
            0xFF
        }
    }

    fn enter_command(&mut self) {
        self.phase = FdcPhase::Command;
        self.fifo_reset(0);
    }

    fn enter_execute(&mut self) {
        self.phase = FdcPhase::Execute;
        self.fifo_reset(0);
    }

    fn enter_result(&mut self, bytes: &[u8]) {
        self.phase = FdcPhase::Result;
        self.fifo_reset(bytes.len());
        self.fifo[..bytes.len()].copy_from_slice(bytes);
    }

    /// Standard seven-byte result for data and ID commands.
    fn enter_result_chrn(&mut self) {
        let s = self.sector;
        self.enter_result(&[self.st[0], self.st[1], self.st[2], s.c, s.h, s.r, s.n]);
    }
}

impl<D: FloppyDrive + Default> Default for Upd765<D> {
    fn default() -> Self {
        Self::new(D::default())
    }
}

impl<D: FloppyDrive> Chip for Upd765<D> {
    fn tick(&mut self, pins: Pins) -> Pins {
        self.iorq(pins)
    }
}

impl<D: FloppyDrive> Observable for Upd765<D> {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "phase" => Some(self.phase.name().into()),
            "msr" => Some(self.status.into()),
            "command" => Some((self.cmd & commands::CMD_MASK).into()),
            "st0" => Some(self.st[0].into()),
            "st1" => Some(self.st[1].into()),
            "st2" => Some(self.st[2].into()),
            "st3" => Some(self.st[3].into()),
            "fifo_pos" => Some((self.fifo_pos as u8).into()),
            "fifo_num" => Some((self.fifo_num as u8).into()),
            "sector.c" => Some(self.sector.c.into()),
            "sector.h" => Some(self.sector.h.into()),
            "sector.r" => Some(self.sector.r.into()),
            "sector.n" => Some(self.sector.n.into()),
            "pcn0" => Some(self.pcn[0].into()),
            "pcn1" => Some(self.pcn[1].into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "phase", "msr", "command", "st0", "st1", "st2", "st3", "fifo_pos", "fifo_num",
            "sector.c", "sector.h", "sector.r", "sector.n", "pcn0", "pcn1",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io(fdc: &mut Upd765<NoDrives>, ctrl: u64, data: u8) -> u8 {
        let pins = Pins::new().with_data(data).with_control(CS | ctrl, true);
        fdc.iorq(pins).data()
    }

    #[test]
    fn msr_idle_state() {
        let mut fdc = Upd765::new(NoDrives);
        assert_eq!(fdc.read_status(), msr::RQM);
        assert_eq!(fdc.phase(), FdcPhase::Command);
        assert!(!fdc.is_busy());
    }

    #[test]
    fn status_and_data_through_pins() {
        let mut fdc = Upd765::new(NoDrives);
        assert_eq!(io(&mut fdc, Pins::RD, 0), msr::RQM);

        // SPECIFY: first byte makes the controller busy.
        io(&mut fdc, Pins::WR | A0, 0x03);
        assert_eq!(io(&mut fdc, Pins::RD, 0), msr::RQM | msr::CB);
        io(&mut fdc, Pins::WR | A0, 0xDF);
        io(&mut fdc, Pins::WR | A0, 0x02);
        assert_eq!(io(&mut fdc, Pins::RD, 0), msr::RQM);
        assert_eq!(fdc.query("msr"), Some(Value::U8(msr::RQM)));
    }

    #[test]
    fn ignores_bus_without_chip_select() {
        let mut fdc = Upd765::new(NoDrives);
        let pins = Pins::new().with_data(0x08).with_control(Pins::WR | A0, true);
        fdc.iorq(pins);
        assert!(!fdc.is_busy());

        let pins = Pins::new().with_data(0x55).with_control(Pins::RD, true);
        assert_eq!(fdc.iorq(pins).data(), 0x55);
    }

    #[test]
    fn write_to_status_register_is_ignored() {
        let mut fdc = Upd765::new(NoDrives);
        io(&mut fdc, Pins::WR, 0x08);
        assert!(!fdc.is_busy());
    }

    #[test]
    fn reset_abandons_command() {
        let mut fdc = Upd765::new(NoDrives);
        fdc.write_data(0x0F);
        assert!(fdc.is_busy());
        fdc.reset();
        assert_eq!(fdc.phase(), FdcPhase::Command);
        assert!(!fdc.is_busy());
    }

    #[test]
    fn observable_phase_name() {
        let mut fdc = Upd765::new(NoDrives);
        fdc.write_data(0x1F);
        assert_eq!(fdc.query("phase"), Some(Value::from("Result")));
        assert_eq!(fdc.query("nonsense"), None);
    }
}
