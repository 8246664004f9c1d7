//! Image writer for blank or patterned discs.

use crate::{
    EXTENDED_MAGIC, HEADER_SIZE, SECTOR_SIZE, SIZE_CODE_512, STANDARD_MAGIC, TRACK_INFO_SIZE,
    TRACK_MAGIC,
};

const GAP3: u8 = 0x4E;
const FILLER: u8 = 0xE5;

/// Builds a uniformly formatted DSK image.
///
/// Every track gets the same sector IDs (R values). Sector contents come
/// from a fill function of (track, side, sector id, byte index).
pub struct DiscBuilder {
    tracks: u8,
    sides: u8,
    sector_ids: Vec<u8>,
    extended: bool,
    creator: &'static [u8],
}

impl DiscBuilder {
    /// A standard image with nine sectors numbered `0xC1..=0xC9`, the CPC
    /// data format.
    #[must_use]
    pub fn new(tracks: u8, sides: u8) -> Self {
        Self {
            tracks,
            sides,
            sector_ids: (0xC1..=0xC9).collect(),
            extended: false,
            creator: b"emu198x",
        }
    }

    #[must_use]
    pub fn sector_ids(mut self, ids: &[u8]) -> Self {
        self.sector_ids = ids.to_vec();
        self
    }

    /// Write an extended image (per-track size table, per-sector lengths).
    #[must_use]
    pub fn extended(mut self) -> Self {
        self.extended = true;
        self
    }

    fn track_size(&self) -> usize {
        TRACK_INFO_SIZE + self.sector_ids.len() * SECTOR_SIZE
    }

    /// Serialise with every payload byte set to `FILLER`.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        self.build_with(|_, _, _, _| FILLER)
    }

    #[must_use]
    pub fn build_with(&self, fill: impl Fn(u8, u8, u8, usize) -> u8) -> Vec<u8> {
        let track_size = self.track_size();
        let blocks = usize::from(self.tracks) * usize::from(self.sides);
        let mut out = Vec::with_capacity(HEADER_SIZE + blocks * track_size);

        let mut header = [0u8; HEADER_SIZE];
        let magic: &[u8] = if self.extended {
            b"EXTENDED CPC DSK File\r\nDisk-Info\r\n"
        } else {
            b"MV - CPCEMU Disk-File\r\nDisk-Info\r\n"
        };
        debug_assert!(magic.starts_with(if self.extended {
            EXTENDED_MAGIC
        } else {
            STANDARD_MAGIC
        }));
        header[..magic.len()].copy_from_slice(magic);
        let creator = &self.creator[..self.creator.len().min(14)];
        header[0x22..0x22 + creator.len()].copy_from_slice(creator);
        header[0x30] = self.tracks;
        header[0x31] = self.sides;
        if self.extended {
            for entry in &mut header[0x34..0x34 + blocks] {
                *entry = (track_size / 0x100) as u8;
            }
        } else {
            header[0x32..0x34].copy_from_slice(&(track_size as u16).to_le_bytes());
        }
        out.extend_from_slice(&header);

        for track in 0..self.tracks {
            for side in 0..self.sides {
                let mut info = [0u8; TRACK_INFO_SIZE];
                info[..TRACK_MAGIC.len()].copy_from_slice(TRACK_MAGIC);
                info[0x10] = track;
                info[0x11] = side;
                info[0x14] = SIZE_CODE_512;
                info[0x15] = self.sector_ids.len() as u8;
                info[0x16] = GAP3;
                info[0x17] = FILLER;
                for (i, &r) in self.sector_ids.iter().enumerate() {
                    let rec = &mut info[0x18 + i * 8..0x20 + i * 8];
                    rec[0] = track;
                    rec[1] = side;
                    rec[2] = r;
                    rec[3] = SIZE_CODE_512;
                    if self.extended {
                        rec[6..8].copy_from_slice(&(SECTOR_SIZE as u16).to_le_bytes());
                    }
                }
                out.extend_from_slice(&info);
                for &r in &self.sector_ids {
                    out.extend((0..SECTOR_SIZE).map(|i| fill(track, side, r, i)));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Disc;

    #[test]
    fn built_image_parses() {
        let raw = DiscBuilder::new(40, 1).build();
        assert_eq!(raw.len(), HEADER_SIZE + 40 * (TRACK_INFO_SIZE + 9 * SECTOR_SIZE));
        let disc = Disc::parse(raw).expect("builder output should parse");
        assert_eq!(disc.tracks(), 40);
        let sector = disc.track(0, 39).expect("track 39").find(39, 0, 0xC9).copied();
        assert!(sector.is_some());
    }

    #[test]
    fn extended_build_parses() {
        let raw = DiscBuilder::new(2, 2)
            .sector_ids(&[1, 2, 3])
            .extended()
            .build_with(|t, s, r, _| t ^ s ^ r);
        let disc = Disc::parse(raw).expect("extended should parse");
        assert!(disc.is_extended());
        let track = disc.track(1, 1).expect("track");
        let sector = track.find(1, 1, 3).expect("sector 3");
        assert!(disc.sector_data(sector).iter().all(|&b| b == 3));
    }
}
