//! uPD765 command set.
//!
//! Each command has a fixed number of parameter bytes. Once the last one
//! arrives the command runs at once: seeks complete instantly and data
//! bytes are available as soon as the host asks for them. Hosts that poll
//! the MSR before every byte cannot tell the difference.

use crate::{DriveResult, FloppyDrive, SectorId, Upd765, st0, st1, st3};

/// Command ID bits of the first command byte. The top three bits are the
/// MT, MF and SK flags.
pub const CMD_MASK: u8 = 0x1F;

pub const READ_TRACK: u8 = 0x02;
pub const SPECIFY: u8 = 0x03;
pub const SENSE_DRIVE_STATUS: u8 = 0x04;
pub const WRITE_DATA: u8 = 0x05;
pub const READ_DATA: u8 = 0x06;
pub const RECALIBRATE: u8 = 0x07;
pub const SENSE_INTERRUPT_STATUS: u8 = 0x08;
pub const WRITE_DELETED_DATA: u8 = 0x09;
pub const READ_ID: u8 = 0x0A;
pub const READ_DELETED_DATA: u8 = 0x0C;
pub const FORMAT_TRACK: u8 = 0x0D;
pub const SEEK: u8 = 0x0F;
pub const SCAN_EQUAL: u8 = 0x11;
pub const SCAN_LOW_OR_EQUAL: u8 = 0x19;
pub const SCAN_HIGH_OR_EQUAL: u8 = 0x1D;

/// Total command length in bytes, including the command byte.
#[must_use]
pub fn command_length(cmd: u8) -> usize {
    match cmd & CMD_MASK {
        READ_DATA | READ_DELETED_DATA | WRITE_DATA | WRITE_DELETED_DATA | READ_TRACK
        | SCAN_EQUAL | SCAN_LOW_OR_EQUAL | SCAN_HIGH_OR_EQUAL => 9,
        READ_ID | RECALIBRATE | SENSE_DRIVE_STATUS => 2,
        SEEK | SPECIFY => 3,
        FORMAT_TRACK => 6,
        // SENSE INTERRUPT STATUS, and invalid commands
        _ => 1,
    }
}

/// Data moves FDC→CPU during this command's execution phase.
#[must_use]
pub fn is_read(cmd: u8) -> bool {
    matches!(cmd & CMD_MASK, READ_DATA | READ_DELETED_DATA)
}

fn is_write(cmd: u8) -> bool {
    matches!(cmd & CMD_MASK, WRITE_DATA | WRITE_DELETED_DATA)
}

fn name(cmd: u8) -> &'static str {
    match cmd & CMD_MASK {
        READ_TRACK => "READ TRACK",
        SPECIFY => "SPECIFY",
        SENSE_DRIVE_STATUS => "SENSE DRIVE STATUS",
        WRITE_DATA => "WRITE DATA",
        READ_DATA => "READ DATA",
        RECALIBRATE => "RECALIBRATE",
        SENSE_INTERRUPT_STATUS => "SENSE INTERRUPT STATUS",
        WRITE_DELETED_DATA => "WRITE DELETED DATA",
        READ_ID => "READ ID",
        READ_DELETED_DATA => "READ DELETED DATA",
        FORMAT_TRACK => "FORMAT TRACK",
        SEEK => "SEEK",
        SCAN_EQUAL | SCAN_LOW_OR_EQUAL | SCAN_HIGH_OR_EQUAL => "SCAN",
        _ => "invalid",
    }
}

impl<D: FloppyDrive> Upd765<D> {
    /// Unit and head select bits from parameter byte 1.
    fn unit_head(&self) -> (usize, u8) {
        (usize::from(self.fifo[1] & 0x03), (self.fifo[1] >> 2) & 1)
    }

    /// Unit and head of the transfer in progress.
    fn active_unit_head(&self) -> (usize, u8) {
        (usize::from(self.st[0] & 0x03), (self.st[0] >> 2) & 1)
    }

    pub(crate) fn execute_command(&mut self) {
        let params = &self.fifo[1..self.fifo_num];
        log::debug!("uPD765: {} {params:02X?}", name(self.cmd));
        match self.cmd & CMD_MASK {
            READ_DATA | READ_DELETED_DATA | WRITE_DATA | WRITE_DELETED_DATA => {
                self.cmd_transfer();
            }
            READ_ID => self.cmd_read_id(),
            RECALIBRATE => {
                let (unit, _) = self.unit_head();
                self.cmd_seek(unit, 0);
            }
            SEEK => {
                let (unit, _) = self.unit_head();
                self.cmd_seek(unit, self.fifo[2]);
            }
            SENSE_INTERRUPT_STATUS => self.cmd_sense_interrupt(),
            SENSE_DRIVE_STATUS => self.cmd_sense_drive(),
            SPECIFY => {
                // Step rate, head load/unload and DMA mode have no effect here.
                self.enter_command();
            }
            FORMAT_TRACK => self.cmd_format_track(),
            READ_TRACK | SCAN_EQUAL | SCAN_LOW_OR_EQUAL | SCAN_HIGH_OR_EQUAL => {
                self.cmd_unsupported_read();
            }
            _ => {
                log::warn!("uPD765: invalid command {:#04X}", self.cmd);
                self.st[0] = st0::IC;
                self.enter_result(&[st0::IC]);
            }
        }
    }

    // -----------------------------------------------------------------------
    // READ DATA / WRITE DATA (and their deleted-data variants)
    // -----------------------------------------------------------------------

    fn cmd_transfer(&mut self) {
        let (unit, head) = self.unit_head();
        self.st[0] = self.fifo[1] & 0x07;
        self.st[1] = 0;
        self.st[2] = 0;
        self.sector = SectorId {
            c: self.fifo[2],
            h: self.fifo[3],
            r: self.fifo[4],
            n: self.fifo[5],
            st1: 0,
            st2: 0,
        };
        self.eot = self.fifo[6];
        // GPL and DTL (bytes 7 and 8) only matter for real media.

        if is_write(self.cmd) && self.drives.drive_info(unit).write_protected {
            self.st[0] |= st0::AT;
            self.st[1] |= st1::NW;
            self.enter_result_chrn();
            return;
        }

        let res = self.drives.seek_sector(unit, head, &mut self.sector);
        if res.is_success() {
            self.enter_execute();
        } else {
            self.fail(res);
        }
    }

    /// Next byte of a read in the execution phase.
    pub(crate) fn exec_read(&mut self) -> u8 {
        let (unit, head) = self.active_unit_head();
        let (data, res) = self.drives.read_byte(unit, head);
        self.after_transfer(res);
        data
    }

    /// Next byte of a write in the execution phase.
    pub(crate) fn exec_write(&mut self, data: u8) {
        let (unit, head) = self.active_unit_head();
        let res = self.drives.write_byte(unit, head, data);
        self.after_transfer(res);
    }

    fn after_transfer(&mut self, res: DriveResult) {
        if res.contains(DriveResult::NOT_READY) || res.contains(DriveResult::NOT_FOUND) {
            self.fail(res);
        } else if res.contains(DriveResult::END_OF_SECTOR) {
            self.next_sector();
        }
    }

    /// Move on after the last byte of a sector. Without a terminal count
    /// line the transfer always ends by running off EOT, which the real
    /// chip reports as abnormal termination with end of cylinder.
    fn next_sector(&mut self) {
        if self.sector.r >= self.eot {
            self.st[0] |= st0::AT;
            self.st[1] |= st1::EN;
            self.enter_result_chrn();
            return;
        }
        let (unit, head) = self.active_unit_head();
        self.sector.r = self.sector.r.wrapping_add(1);
        let res = self.drives.seek_sector(unit, head, &mut self.sector);
        if !res.is_success() {
            self.fail(res);
        }
    }

    fn fail(&mut self, res: DriveResult) {
        self.st[0] |= st0::AT;
        if res.contains(DriveResult::NOT_READY) {
            self.st[0] |= st0::NR;
        }
        if res.contains(DriveResult::NOT_FOUND) {
            self.st[1] |= st1::ND;
        }
        self.enter_result_chrn();
    }

    // -----------------------------------------------------------------------
    // READ ID
    // -----------------------------------------------------------------------

    fn cmd_read_id(&mut self) {
        let (unit, head) = self.unit_head();
        let (id, res) = self.drives.track_info(unit, head);
        self.st[0] = self.fifo[1] & 0x07;
        self.st[1] = 0;
        self.st[2] = 0;
        self.sector = id;
        if res.contains(DriveResult::NOT_READY) {
            self.st[0] |= st0::AT | st0::NR;
        }
        if res.contains(DriveResult::NOT_FOUND) {
            self.st[0] |= st0::AT;
            self.st[1] |= st1::ND | st1::MA;
        }
        self.enter_result_chrn();
    }

    // -----------------------------------------------------------------------
    // SEEK / RECALIBRATE: no result phase, completion is sensed later
    // -----------------------------------------------------------------------

    fn cmd_seek(&mut self, unit: usize, track: u8) {
        let res = self.drives.seek_track(unit, track);
        let mut st = unit as u8 | st0::SE;
        if res.is_success() {
            self.pcn[unit] = track;
        } else {
            st |= st0::EC | st0::AT;
        }
        if res.contains(DriveResult::NOT_READY) {
            st |= st0::NR;
        }
        self.st[0] = st;
        self.seek_end = Some(st);
        self.enter_command();
    }

    // -----------------------------------------------------------------------
    // SENSE INTERRUPT STATUS
    // -----------------------------------------------------------------------

    fn cmd_sense_interrupt(&mut self) {
        if let Some(st) = self.seek_end.take() {
            let unit = usize::from(st & 0x03);
            self.st[0] = st;
            self.enter_result(&[st, self.pcn[unit]]);
        } else {
            // Nothing to report: the chip answers as if the command were invalid.
            self.st[0] = st0::IC;
            self.enter_result(&[st0::IC]);
        }
    }

    // -----------------------------------------------------------------------
    // SENSE DRIVE STATUS
    // -----------------------------------------------------------------------

    fn cmd_sense_drive(&mut self) {
        let (unit, head) = self.unit_head();
        let info = self.drives.drive_info(unit);
        let mut st = unit as u8;
        if head > 0 {
            st |= st3::HD;
        }
        if info.sides > 1 {
            st |= st3::TS;
        }
        if info.physical_track == 0 {
            st |= st3::T0;
        }
        if info.ready {
            st |= st3::RY;
        }
        if info.write_protected {
            st |= st3::WP;
        }
        if info.fault {
            st |= st3::FT;
        }
        self.st[3] = st;
        self.enter_result(&[st]);
    }

    // -----------------------------------------------------------------------
    // Commands accepted without touching the disc
    // -----------------------------------------------------------------------

    /// FORMAT A TRACK. Disc images cannot be reformatted in place, so the
    /// command ends as if the disc were write protected.
    fn cmd_format_track(&mut self) {
        let (unit, head) = self.unit_head();
        self.st[0] = (self.fifo[1] & 0x07) | st0::AT;
        self.st[1] = st1::NW;
        self.st[2] = 0;
        self.sector = SectorId {
            c: self.pcn[unit],
            h: head,
            r: 0,
            n: self.fifo[2],
            st1: 0,
            st2: 0,
        };
        self.enter_result_chrn();
    }

    /// READ A TRACK and the SCAN commands end with no data found.
    fn cmd_unsupported_read(&mut self) {
        self.st[0] = (self.fifo[1] & 0x07) | st0::AT;
        self.st[1] = st1::ND;
        self.st[2] = 0;
        self.sector = SectorId {
            c: self.fifo[2],
            h: self.fifo[3],
            r: self.fifo[4],
            n: self.fifo[5],
            st1: 0,
            st2: 0,
        };
        self.enter_result_chrn();
    }
}
