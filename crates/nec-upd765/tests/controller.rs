//! Command sequences driven through the data register against an
//! in-memory drive.

use nec_upd765::{
    DriveInfo, DriveResult, FdcPhase, FloppyDrive, SectorId, Upd765, msr, st0, st1, st3,
};

const SECTOR_LEN: usize = 512;

/// One single-sided drive with 40 tracks of sectors 1..=4. Sector bytes
/// are `track ^ r ^ index` until written.
struct RamDrive {
    present: bool,
    write_protected: bool,
    track: u8,
    data: Vec<Vec<[u8; SECTOR_LEN]>>,
    current: Option<(usize, usize)>,
    pos: usize,
}

impl RamDrive {
    fn new() -> Self {
        let data = (0..40u8)
            .map(|t| {
                (1..=4u8)
                    .map(|r| {
                        let mut sector = [0u8; SECTOR_LEN];
                        for (i, b) in sector.iter_mut().enumerate() {
                            *b = t ^ r ^ (i as u8);
                        }
                        sector
                    })
                    .collect()
            })
            .collect();
        Self {
            present: true,
            write_protected: false,
            track: 0,
            data,
            current: None,
            pos: 0,
        }
    }

    fn empty() -> Self {
        Self {
            present: false,
            ..Self::new()
        }
    }
}

impl FloppyDrive for RamDrive {
    fn seek_track(&mut self, drive: usize, track: u8) -> DriveResult {
        if drive != 0 || !self.present {
            return DriveResult::NOT_READY;
        }
        if usize::from(track) >= self.data.len() {
            return DriveResult::NOT_FOUND;
        }
        self.track = track;
        DriveResult::SUCCESS
    }

    fn seek_sector(&mut self, drive: usize, side: u8, id: &mut SectorId) -> DriveResult {
        if drive != 0 || !self.present {
            return DriveResult::NOT_READY;
        }
        if side != 0 || id.c != self.track || id.h != 0 || !(1..=4).contains(&id.r) {
            return DriveResult::NOT_FOUND;
        }
        id.n = 2;
        self.current = Some((usize::from(self.track), usize::from(id.r - 1)));
        self.pos = 0;
        DriveResult::SUCCESS
    }

    fn read_byte(&mut self, _drive: usize, _side: u8) -> (u8, DriveResult) {
        let Some((t, s)) = self.current else {
            return (0xFF, DriveResult::NOT_FOUND);
        };
        let byte = self.data[t][s][self.pos];
        self.pos += 1;
        if self.pos == SECTOR_LEN {
            self.current = None;
            (byte, DriveResult::END_OF_SECTOR)
        } else {
            (byte, DriveResult::SUCCESS)
        }
    }

    fn write_byte(&mut self, _drive: usize, _side: u8, data: u8) -> DriveResult {
        let Some((t, s)) = self.current else {
            return DriveResult::NOT_FOUND;
        };
        self.data[t][s][self.pos] = data;
        self.pos += 1;
        if self.pos == SECTOR_LEN {
            self.current = None;
            DriveResult::END_OF_SECTOR
        } else {
            DriveResult::SUCCESS
        }
    }

    fn track_info(&mut self, drive: usize, _side: u8) -> (SectorId, DriveResult) {
        if drive != 0 || !self.present {
            return (SectorId::default(), DriveResult::NOT_READY);
        }
        let id = SectorId {
            c: self.track,
            h: 0,
            r: 1,
            n: 2,
            ..SectorId::default()
        };
        (id, DriveResult::SUCCESS)
    }

    fn drive_info(&self, drive: usize) -> DriveInfo {
        DriveInfo {
            physical_track: self.track,
            sides: 1,
            head: 0,
            ready: drive == 0 && self.present,
            write_protected: self.write_protected,
            fault: false,
        }
    }
}

fn send(fdc: &mut Upd765<RamDrive>, bytes: &[u8]) {
    for &b in bytes {
        assert_ne!(fdc.read_status() & msr::RQM, 0);
        assert_eq!(fdc.read_status() & msr::DIO, 0, "controller not accepting bytes");
        fdc.write_data(b);
    }
}

fn read_result(fdc: &mut Upd765<RamDrive>) -> Vec<u8> {
    let mut out = Vec::new();
    while fdc.phase() == FdcPhase::Result {
        out.push(fdc.read_data());
    }
    out
}

fn read_sectors(fdc: &mut Upd765<RamDrive>) -> Vec<u8> {
    let mut out = Vec::new();
    while fdc.phase() == FdcPhase::Execute {
        assert_eq!(
            fdc.read_status(),
            msr::RQM | msr::DIO | msr::EXM | msr::CB
        );
        out.push(fdc.read_data());
    }
    out
}

fn seek(fdc: &mut Upd765<RamDrive>, track: u8) {
    send(fdc, &[0x0F, 0x00, track]);
    send(fdc, &[0x08]);
    let result = read_result(fdc);
    assert_eq!(result, vec![st0::SE, track]);
}

#[test]
fn read_single_sector_ends_at_eot() {
    let mut fdc = Upd765::new(RamDrive::new());
    // READ DATA, drive 0, C=0 H=0 R=1 N=2, EOT=1
    send(&mut fdc, &[0x46, 0x00, 0x00, 0x00, 0x01, 0x02, 0x01, 0x2A, 0xFF]);
    assert_eq!(fdc.phase(), FdcPhase::Execute);

    let data = read_sectors(&mut fdc);
    assert_eq!(data.len(), SECTOR_LEN);
    assert!(data.iter().enumerate().all(|(i, &b)| b == 1 ^ (i as u8)));

    assert_eq!(fdc.read_status(), msr::RQM | msr::DIO | msr::CB);
    let result = read_result(&mut fdc);
    assert_eq!(result, vec![st0::AT, st1::EN, 0, 0, 0, 1, 2]);
    assert_eq!(fdc.read_status(), msr::RQM);
}

#[test]
fn read_runs_across_sectors_to_eot() {
    let mut fdc = Upd765::new(RamDrive::new());
    seek(&mut fdc, 5);
    send(&mut fdc, &[0x46, 0x00, 0x05, 0x00, 0x02, 0x02, 0x04, 0x2A, 0xFF]);

    let data = read_sectors(&mut fdc);
    assert_eq!(data.len(), 3 * SECTOR_LEN);
    assert_eq!(data[0], 5 ^ 2);
    assert_eq!(data[SECTOR_LEN], 5 ^ 3);
    assert_eq!(data[2 * SECTOR_LEN + 1], 5 ^ 4 ^ 1);

    let result = read_result(&mut fdc);
    assert_eq!(result, vec![st0::AT, st1::EN, 0, 5, 0, 4, 2]);
}

#[test]
fn read_missing_sector_reports_no_data() {
    let mut fdc = Upd765::new(RamDrive::new());
    send(&mut fdc, &[0x46, 0x00, 0x00, 0x00, 0x09, 0x02, 0x09, 0x2A, 0xFF]);
    let result = read_result(&mut fdc);
    assert_eq!(result[0], st0::AT);
    assert_eq!(result[1], st1::ND);
    assert_eq!(result[5], 0x09);
}

#[test]
fn read_with_no_disc_is_not_ready() {
    let mut fdc = Upd765::new(RamDrive::empty());
    send(&mut fdc, &[0x46, 0x00, 0x00, 0x00, 0x01, 0x02, 0x01, 0x2A, 0xFF]);
    let result = read_result(&mut fdc);
    assert_eq!(result.len(), 7);
    assert_eq!(result[0], st0::AT | st0::NR);
}

#[test]
fn write_data_lands_on_the_drive() {
    let mut fdc = Upd765::new(RamDrive::new());
    seek(&mut fdc, 2);
    send(&mut fdc, &[0x45, 0x00, 0x02, 0x00, 0x03, 0x02, 0x03, 0x2A, 0xFF]);
    assert_eq!(fdc.read_status(), msr::RQM | msr::EXM | msr::CB);
    for i in 0..SECTOR_LEN {
        fdc.write_data((i as u8).wrapping_mul(3));
    }
    let result = read_result(&mut fdc);
    assert_eq!(result, vec![st0::AT, st1::EN, 0, 2, 0, 3, 2]);

    let sector = &fdc.drives().data[2][2];
    assert_eq!(sector[0], 0);
    assert_eq!(sector[10], 30);
}

#[test]
fn write_protected_disc_refuses_write() {
    let mut drive = RamDrive::new();
    drive.write_protected = true;
    let mut fdc = Upd765::new(drive);
    send(&mut fdc, &[0x45, 0x00, 0x00, 0x00, 0x01, 0x02, 0x01, 0x2A, 0xFF]);
    assert_eq!(fdc.phase(), FdcPhase::Result);
    let result = read_result(&mut fdc);
    assert_eq!(result[0], st0::AT);
    assert_eq!(result[1], st1::NW);
    assert_eq!(fdc.drives().data[0][0][0], 1);
}

#[test]
fn read_id_reports_first_sector() {
    let mut fdc = Upd765::new(RamDrive::new());
    seek(&mut fdc, 7);
    send(&mut fdc, &[0x4A, 0x00]);
    let result = read_result(&mut fdc);
    assert_eq!(result, vec![0, 0, 0, 7, 0, 1, 2]);
}

#[test]
fn read_id_without_disc() {
    let mut fdc = Upd765::new(RamDrive::empty());
    send(&mut fdc, &[0x4A, 0x00]);
    let result = read_result(&mut fdc);
    assert_eq!(result[0], st0::AT | st0::NR);
}

#[test]
fn recalibrate_then_sense_interrupt() {
    let mut fdc = Upd765::new(RamDrive::new());
    seek(&mut fdc, 12);
    assert_eq!(fdc.drives().track, 12);

    send(&mut fdc, &[0x07, 0x00]);
    assert_eq!(fdc.phase(), FdcPhase::Command);
    send(&mut fdc, &[0x08]);
    assert_eq!(read_result(&mut fdc), vec![st0::SE, 0]);
    assert_eq!(fdc.drives().track, 0);

    // Already sensed: nothing pending.
    send(&mut fdc, &[0x08]);
    assert_eq!(read_result(&mut fdc), vec![st0::IC]);
}

#[test]
fn seek_to_missing_drive_fails() {
    let mut fdc = Upd765::new(RamDrive::new());
    send(&mut fdc, &[0x0F, 0x01, 0x03]);
    send(&mut fdc, &[0x08]);
    let result = read_result(&mut fdc);
    assert_eq!(result[0], 0x01 | st0::SE | st0::EC | st0::AT | st0::NR);
    // A failed seek leaves the present cylinder alone.
    assert_eq!(result[1], 0);
}

#[test]
fn failed_seek_keeps_present_cylinder() {
    let mut fdc = Upd765::new(RamDrive::new());
    seek(&mut fdc, 4);
    // Track 50 is past the end of the drive.
    send(&mut fdc, &[0x0F, 0x00, 50]);
    send(&mut fdc, &[0x08]);
    let result = read_result(&mut fdc);
    assert_eq!(result, vec![st0::SE | st0::EC | st0::AT, 4]);
    assert_eq!(fdc.drives().track, 4);
}

#[test]
fn seek_end_survives_a_later_command() {
    let mut fdc = Upd765::new(RamDrive::new());
    send(&mut fdc, &[0x0F, 0x00, 0x02]);
    // READ ID on unit 1 fails before the seek is sensed.
    send(&mut fdc, &[0x4A, 0x01]);
    let read_id = read_result(&mut fdc);
    assert_eq!(read_id[0], 0x01 | st0::AT | st0::NR);

    send(&mut fdc, &[0x08]);
    assert_eq!(read_result(&mut fdc), vec![st0::SE, 2]);
}

#[test]
fn sense_drive_status() {
    let mut fdc = Upd765::new(RamDrive::new());
    send(&mut fdc, &[0x04, 0x00]);
    assert_eq!(read_result(&mut fdc), vec![st3::RY | st3::T0]);

    seek(&mut fdc, 1);
    fdc.drives_mut().write_protected = true;
    send(&mut fdc, &[0x04, 0x04]);
    assert_eq!(read_result(&mut fdc), vec![st3::HD | st3::RY | st3::WP]);

    send(&mut fdc, &[0x04, 0x01]);
    assert_eq!(read_result(&mut fdc), vec![0x01 | st3::WP]);
}

#[test]
fn format_is_refused_as_write_protected() {
    let mut fdc = Upd765::new(RamDrive::new());
    send(&mut fdc, &[0x4D, 0x00, 0x02, 0x09, 0x2A, 0xE5]);
    let result = read_result(&mut fdc);
    assert_eq!(result[0], st0::AT);
    assert_eq!(result[1], st1::NW);
    assert_eq!(result[6], 0x02);
}

#[test]
fn scan_reports_no_data() {
    let mut fdc = Upd765::new(RamDrive::new());
    send(&mut fdc, &[0x11, 0x00, 0x00, 0x00, 0x01, 0x02, 0x01, 0x2A, 0xFF]);
    let result = read_result(&mut fdc);
    assert_eq!(result[0], st0::AT);
    assert_eq!(result[1], st1::ND);
}

#[test]
fn invalid_command_returns_single_status() {
    let mut fdc = Upd765::new(RamDrive::new());
    send(&mut fdc, &[0x1F]);
    assert_eq!(read_result(&mut fdc), vec![st0::IC]);
    assert_eq!(fdc.phase(), FdcPhase::Command);
}

#[test]
fn data_register_reads_ff_when_idle() {
    let mut fdc = Upd765::new(RamDrive::new());
    assert_eq!(fdc.read_data(), 0xFF);
    assert!(!fdc.is_busy());
}
