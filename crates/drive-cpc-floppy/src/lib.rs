//! 3-inch floppy drive mechanism backed by a DSK image.
//!
//! The drive owns the parsed [`Disc`] and a head position. The controller
//! reaches it only through [`FloppyDrive`], so every data byte goes
//! through the sector offsets recorded when the image was loaded.

use format_dsk::{Disc, DskError, Sector};
use nec_upd765::{DriveInfo, DriveResult, FloppyDrive, SectorId};

/// Physical stop of the head.
const MAX_PHYSICAL_TRACK: u8 = 79;

/// One drive.
#[derive(Debug, Default)]
pub struct FloppyDisk {
    disc: Option<Disc>,
    track: u8,
    side: u8,
    /// Sector under the head once a seek found it.
    sector: Option<Sector>,
    /// Next byte within `sector`.
    pos: usize,
    motor_on: bool,
    write_protected: bool,
}

impl FloppyDisk {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and insert an image, ejecting whatever was in the drive. On
    /// error the drive is left empty.
    pub fn insert_disc(&mut self, image: Vec<u8>) -> Result<(), DskError> {
        self.eject_disc();
        match Disc::parse(image) {
            Ok(disc) => {
                log::debug!(
                    "drive: inserted disc, {} tracks x {} sides",
                    disc.tracks(),
                    disc.sides()
                );
                self.disc = Some(disc);
                Ok(())
            }
            Err(e) => {
                log::warn!("drive: rejected disc image: {e}");
                Err(e)
            }
        }
    }

    /// Remove the disc, returning its image bytes with any sector writes.
    pub fn eject_disc(&mut self) -> Option<Vec<u8>> {
        self.sector = None;
        self.pos = 0;
        self.disc.take().map(Disc::into_bytes)
    }

    #[must_use]
    pub fn has_disc(&self) -> bool {
        self.disc.is_some()
    }

    #[must_use]
    pub fn disc(&self) -> Option<&Disc> {
        self.disc.as_ref()
    }

    pub fn motor(&mut self, on: bool) {
        self.motor_on = on;
    }

    #[must_use]
    pub fn is_motor_on(&self) -> bool {
        self.motor_on
    }

    pub fn set_write_protected(&mut self, protected: bool) {
        self.write_protected = protected;
    }

    #[must_use]
    pub fn track(&self) -> u8 {
        self.track
    }

    /// Advance past a transferred byte, flagging the sector's last one.
    fn advance(&mut self, len: usize) -> DriveResult {
        self.pos += 1;
        if self.pos >= len {
            self.sector = None;
            self.pos = 0;
            DriveResult::END_OF_SECTOR
        } else {
            DriveResult::SUCCESS
        }
    }
}

impl FloppyDrive for FloppyDisk {
    fn seek_track(&mut self, _drive: usize, track: u8) -> DriveResult {
        self.sector = None;
        let Some(disc) = &self.disc else {
            return DriveResult::NOT_READY;
        };
        self.track = track.min(MAX_PHYSICAL_TRACK);
        if track >= disc.tracks() {
            DriveResult::NOT_FOUND
        } else {
            DriveResult::SUCCESS
        }
    }

    fn seek_sector(&mut self, _drive: usize, side: u8, id: &mut SectorId) -> DriveResult {
        self.sector = None;
        let Some(disc) = &self.disc else {
            return DriveResult::NOT_READY;
        };
        self.side = side;
        let found = disc
            .track(side, self.track)
            .and_then(|t| t.find(id.c, id.h, id.r))
            .copied();
        match found {
            Some(sector) => {
                id.n = sector.n;
                id.st1 = sector.st1;
                id.st2 = sector.st2;
                self.sector = Some(sector);
                self.pos = 0;
                DriveResult::SUCCESS
            }
            None => DriveResult::NOT_FOUND,
        }
    }

    fn read_byte(&mut self, _drive: usize, _side: u8) -> (u8, DriveResult) {
        let Some(disc) = &self.disc else {
            return (0xFF, DriveResult::NOT_READY);
        };
        let Some(sector) = self.sector else {
            return (0xFF, DriveResult::NOT_FOUND);
        };
        let Some(&byte) = disc.sector_data(&sector).get(self.pos) else {
            return (0xFF, DriveResult::NOT_FOUND);
        };
        (byte, self.advance(sector.len()))
    }

    fn write_byte(&mut self, _drive: usize, _side: u8, data: u8) -> DriveResult {
        let Some(disc) = &mut self.disc else {
            return DriveResult::NOT_READY;
        };
        let Some(sector) = self.sector else {
            return DriveResult::NOT_FOUND;
        };
        let Some(slot) = disc.sector_data_mut(&sector).get_mut(self.pos) else {
            return DriveResult::NOT_FOUND;
        };
        *slot = data;
        self.advance(sector.len())
    }

    fn track_info(&mut self, _drive: usize, side: u8) -> (SectorId, DriveResult) {
        let Some(disc) = &self.disc else {
            return (SectorId::default(), DriveResult::NOT_READY);
        };
        self.side = side;
        match disc
            .track(side, self.track)
            .and_then(|t| t.sectors().first())
        {
            Some(s) => (
                SectorId {
                    c: s.c,
                    h: s.h,
                    r: s.r,
                    n: s.n,
                    st1: s.st1,
                    st2: s.st2,
                },
                DriveResult::SUCCESS,
            ),
            None => (SectorId::default(), DriveResult::NOT_FOUND),
        }
    }

    fn drive_info(&self, _drive: usize) -> DriveInfo {
        DriveInfo {
            physical_track: self.track,
            sides: self.disc.as_ref().map_or(0, Disc::sides),
            head: self.side,
            ready: self.disc.is_some(),
            write_protected: self.write_protected,
            fault: false,
        }
    }
}

/// Drives A: and B:, selected by the controller's unit number.
#[derive(Debug, Default)]
pub struct DrivePair {
    drives: [FloppyDisk; 2],
}

impl DrivePair {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn drive(&self, index: usize) -> Option<&FloppyDisk> {
        self.drives.get(index)
    }

    pub fn drive_mut(&mut self, index: usize) -> Option<&mut FloppyDisk> {
        self.drives.get_mut(index)
    }

    /// Motor line, shared by both drives.
    pub fn motor(&mut self, on: bool) {
        for d in &mut self.drives {
            d.motor(on);
        }
    }
}

impl FloppyDrive for DrivePair {
    fn seek_track(&mut self, drive: usize, track: u8) -> DriveResult {
        self.drive_mut(drive)
            .map_or(DriveResult::NOT_READY, |d| d.seek_track(drive, track))
    }

    fn seek_sector(&mut self, drive: usize, side: u8, id: &mut SectorId) -> DriveResult {
        self.drive_mut(drive)
            .map_or(DriveResult::NOT_READY, |d| d.seek_sector(drive, side, id))
    }

    fn read_byte(&mut self, drive: usize, side: u8) -> (u8, DriveResult) {
        self.drive_mut(drive)
            .map_or((0xFF, DriveResult::NOT_READY), |d| d.read_byte(drive, side))
    }

    fn write_byte(&mut self, drive: usize, side: u8, data: u8) -> DriveResult {
        self.drive_mut(drive)
            .map_or(DriveResult::NOT_READY, |d| d.write_byte(drive, side, data))
    }

    fn track_info(&mut self, drive: usize, side: u8) -> (SectorId, DriveResult) {
        self.drive_mut(drive).map_or(
            (SectorId::default(), DriveResult::NOT_READY),
            |d| d.track_info(drive, side),
        )
    }

    fn drive_info(&self, drive: usize) -> DriveInfo {
        self.drive(drive)
            .map_or_else(DriveInfo::default, |d| d.drive_info(drive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use format_dsk::DiscBuilder;

    fn loaded() -> FloppyDisk {
        let mut drive = FloppyDisk::new();
        let image = DiscBuilder::new(4, 1)
            .sector_ids(&[1, 2])
            .build_with(|t, _, r, i| t.wrapping_mul(16) ^ r ^ i as u8);
        drive.insert_disc(image).expect("valid image");
        drive
    }

    #[test]
    fn empty_drive_is_not_ready() {
        let mut drive = FloppyDisk::new();
        assert_eq!(drive.seek_track(0, 1), DriveResult::NOT_READY);
        assert_eq!(drive.read_byte(0, 0).1, DriveResult::NOT_READY);
        assert!(!drive.drive_info(0).ready);
    }

    #[test]
    fn bad_image_leaves_drive_empty() {
        let mut drive = loaded();
        let err = drive.insert_disc(vec![0; 512]);
        assert_eq!(err, Err(DskError::BadMagic));
        assert!(!drive.has_disc());
    }

    #[test]
    fn truncated_image_is_refused() {
        let mut drive = loaded();
        let mut image = DiscBuilder::new(4, 1).build();
        image.truncate(image.len() - 100);
        assert!(drive.insert_disc(image).is_err());
        assert!(!drive.has_disc());
        assert_eq!(drive.seek_track(0, 0), DriveResult::NOT_READY);
    }

    #[test]
    fn reads_whole_sector() {
        let mut drive = loaded();
        assert!(drive.seek_track(0, 3).is_success());
        let mut id = SectorId {
            c: 3,
            h: 0,
            r: 2,
            ..SectorId::default()
        };
        assert!(drive.seek_sector(0, 0, &mut id).is_success());
        assert_eq!(id.n, 2);

        let mut bytes = Vec::new();
        loop {
            let (b, res) = drive.read_byte(0, 0);
            bytes.push(b);
            if res.contains(DriveResult::END_OF_SECTOR) {
                break;
            }
            assert!(res.is_success());
        }
        assert_eq!(bytes.len(), 512);
        assert_eq!(bytes[0], 0x30 ^ 2);
        assert_eq!(bytes[5], 0x30 ^ 2 ^ 5);
        assert_eq!(drive.read_byte(0, 0).1, DriveResult::NOT_FOUND);
    }

    #[test]
    fn sector_must_be_on_current_track() {
        let mut drive = loaded();
        let mut id = SectorId {
            c: 2,
            h: 0,
            r: 1,
            ..SectorId::default()
        };
        assert_eq!(drive.seek_sector(0, 0, &mut id), DriveResult::NOT_FOUND);
        drive.seek_track(0, 2);
        assert!(drive.seek_sector(0, 0, &mut id).is_success());
    }

    #[test]
    fn seek_beyond_disc() {
        let mut drive = loaded();
        assert_eq!(drive.seek_track(0, 10), DriveResult::NOT_FOUND);
        assert_eq!(drive.drive_info(0).physical_track, 10);
        assert_eq!(drive.track_info(0, 0).1, DriveResult::NOT_FOUND);
    }

    #[test]
    fn writes_persist_in_ejected_image() {
        let mut drive = loaded();
        let mut id = SectorId {
            c: 0,
            h: 0,
            r: 1,
            ..SectorId::default()
        };
        assert!(drive.seek_sector(0, 0, &mut id).is_success());
        assert!(drive.write_byte(0, 0, 0xAA).is_success());
        let offset = drive
            .disc()
            .and_then(|d| d.track(0, 0))
            .and_then(|t| t.find(0, 0, 1))
            .map(Sector::offset)
            .expect("sector");
        let image = drive.eject_disc().expect("disc was inserted");
        assert_eq!(image[offset], 0xAA);
        assert_eq!(image[offset + 1], 1 ^ 1);
    }

    #[test]
    fn pair_forwards_by_unit() {
        let mut pair = DrivePair::new();
        let image = DiscBuilder::new(2, 1).build();
        pair.drive_mut(1)
            .expect("drive B")
            .insert_disc(image)
            .expect("valid image");
        assert!(!pair.drive_info(0).ready);
        assert!(pair.drive_info(1).ready);
        assert_eq!(pair.seek_track(0, 1), DriveResult::NOT_READY);
        assert!(pair.seek_track(1, 1).is_success());
        assert_eq!(pair.seek_track(3, 0), DriveResult::NOT_READY);
        let (id, res) = pair.track_info(1, 0);
        assert!(res.is_success());
        assert_eq!((id.c, id.r), (1, 0xC1));
    }
}
