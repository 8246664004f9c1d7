//! The controller's view of the drives behind it.
//!
//! The controller never touches disc data directly. Every seek and every
//! data byte goes through [`FloppyDrive`], which the host implements for
//! whatever bank of drives it has wired up.

use std::ops::{BitOr, BitOrAssign};

/// Outcome flags from a drive operation. Empty means success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriveResult(u8);

impl DriveResult {
    pub const SUCCESS: Self = Self(0);
    /// No disc, or no such drive.
    pub const NOT_READY: Self = Self(1 << 0);
    /// Track or sector does not exist.
    pub const NOT_FOUND: Self = Self(1 << 1);
    /// The byte just transferred was the last of the sector.
    pub const END_OF_SECTOR: Self = Self(1 << 2);

    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for DriveResult {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DriveResult {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A sector ID field plus the status bytes stored with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectorId {
    /// Cylinder.
    pub c: u8,
    /// Head.
    pub h: u8,
    /// Record (sector number).
    pub r: u8,
    /// Size code.
    pub n: u8,
    pub st1: u8,
    pub st2: u8,
}

/// Drive signals reported by SENSE DRIVE STATUS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriveInfo {
    pub physical_track: u8,
    pub sides: u8,
    pub head: u8,
    pub ready: bool,
    pub write_protected: bool,
    pub fault: bool,
}

/// Capability interface between the controller and up to four drives.
pub trait FloppyDrive {
    /// Step the head of `drive` to physical `track`.
    fn seek_track(&mut self, drive: usize, track: u8) -> DriveResult;

    /// Find the sector matching `id.c`/`id.h`/`id.r` on the current track.
    /// On success `id.n`, `id.st1` and `id.st2` are filled in from the disc
    /// and the next byte transfer starts at the beginning of that sector.
    fn seek_sector(&mut self, drive: usize, side: u8, id: &mut SectorId) -> DriveResult;

    /// Next byte of the current sector. `END_OF_SECTOR` is flagged together
    /// with the sector's final byte.
    fn read_byte(&mut self, drive: usize, side: u8) -> (u8, DriveResult);

    /// Store the next byte of the current sector.
    fn write_byte(&mut self, drive: usize, side: u8, data: u8) -> DriveResult;

    /// ID of the first sector on the current track.
    fn track_info(&mut self, drive: usize, side: u8) -> (SectorId, DriveResult);

    fn drive_info(&self, drive: usize) -> DriveInfo;
}

/// A controller with nothing connected. Every drive reports not ready.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDrives;

impl FloppyDrive for NoDrives {
    fn seek_track(&mut self, _drive: usize, _track: u8) -> DriveResult {
        DriveResult::NOT_READY
    }

    fn seek_sector(&mut self, _drive: usize, _side: u8, _id: &mut SectorId) -> DriveResult {
        DriveResult::NOT_READY
    }

    fn read_byte(&mut self, _drive: usize, _side: u8) -> (u8, DriveResult) {
        (0xFF, DriveResult::NOT_READY)
    }

    fn write_byte(&mut self, _drive: usize, _side: u8, _data: u8) -> DriveResult {
        DriveResult::NOT_READY
    }

    fn track_info(&mut self, _drive: usize, _side: u8) -> (SectorId, DriveResult) {
        (SectorId::default(), DriveResult::NOT_READY)
    }

    fn drive_info(&self, _drive: usize) -> DriveInfo {
        DriveInfo::default()
    }
}
