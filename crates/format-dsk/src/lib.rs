//! CPC DSK and extended DSK disk image parser.
//!
//! The image is kept whole. Parsing builds an index of tracks and sectors
//! holding offsets into the retained blob; sector data is never copied.
//!
//! # Format
//!
//! A 256-byte disc header, then one block per (track, side) in track-major
//! order. Each block is a 256-byte `Track-Info` header followed by the
//! sector payloads back to back.
//!
//! | Offset | Disc header                                   |
//! |--------|-----------------------------------------------|
//! | 0x00   | `"MV - CPC"` or `"EXTENDED"` magic + creator text |
//! | 0x30   | track count                                   |
//! | 0x31   | side count                                    |
//! | 0x32   | track size, little-endian (standard only)     |
//! | 0x34   | track size table, one byte x 256 per block (extended only) |
//!
//! | Offset | Track-Info block                              |
//! |--------|-----------------------------------------------|
//! | 0x00   | `"Track-Info\r\n"`                            |
//! | 0x10   | track number                                  |
//! | 0x11   | side number                                   |
//! | 0x14   | sector size code (`0x80 << n`)                |
//! | 0x15   | sector count                                  |
//! | 0x16   | gap length                                    |
//! | 0x17   | filler byte                                   |
//! | 0x18   | 8 bytes per sector: C H R N ST1 ST2 len.lo len.hi |
//!
//! Only 512-byte sectors are supported. Any inconsistency rejects the
//! whole image.

mod builder;

use std::fmt;
use std::ops::Range;

pub use builder::DiscBuilder;

pub const HEADER_SIZE: usize = 0x100;
pub const TRACK_INFO_SIZE: usize = 0x100;
pub const SECTOR_SIZE: usize = 512;
pub const MAX_SIDES: u8 = 2;
pub const MAX_TRACKS: u8 = 80;
pub const MAX_SECTORS: usize = 12;
/// Largest image accepted: a full two-sided, 80-track disc of 12 sectors.
pub const MAX_DISC_SIZE: usize = HEADER_SIZE
    + MAX_SIDES as usize * MAX_TRACKS as usize * (TRACK_INFO_SIZE + MAX_SECTORS * SECTOR_SIZE);

pub(crate) const STANDARD_MAGIC: &[u8] = b"MV - CPC";
pub(crate) const EXTENDED_MAGIC: &[u8] = b"EXTENDED";
pub(crate) const TRACK_MAGIC: &[u8] = b"Track-Info\r\n";

/// Size code for 512-byte sectors.
pub const SIZE_CODE_512: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DskError {
    TooLarge(usize),
    TooSmall(usize),
    BadMagic,
    TooManySides(u8),
    TooManyTracks(u8),
    /// Declared geometry does not account for the image length.
    SizeMismatch { expected: usize, actual: usize },
    BadTrackMagic { track: u8, side: u8 },
    UnsupportedSectorSize { track: u8, side: u8, size: usize },
    TooManySectors { track: u8, side: u8, count: usize },
    OutOfBounds { track: u8, side: u8 },
}

impl fmt::Display for DskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge(len) => {
                write!(f, "DSK image too large: {len} bytes (max {MAX_DISC_SIZE})")
            }
            Self::TooSmall(len) => write!(f, "DSK image too small: {len} bytes"),
            Self::BadMagic => write!(f, "not a DSK image (unrecognised header)"),
            Self::TooManySides(n) => write!(f, "DSK declares {n} sides (max {MAX_SIDES})"),
            Self::TooManyTracks(n) => write!(f, "DSK declares {n} tracks (max {MAX_TRACKS})"),
            Self::SizeMismatch { expected, actual } => write!(
                f,
                "DSK geometry needs {expected} bytes but image is {actual} bytes"
            ),
            Self::BadTrackMagic { track, side } => {
                write!(f, "track {track} side {side}: missing Track-Info header")
            }
            Self::UnsupportedSectorSize { track, side, size } => write!(
                f,
                "track {track} side {side}: {size}-byte sectors not supported"
            ),
            Self::TooManySectors { track, side, count } => write!(
                f,
                "track {track} side {side}: {count} sectors (max {MAX_SECTORS})"
            ),
            Self::OutOfBounds { track, side } => {
                write!(f, "track {track} side {side}: data runs past end of image")
            }
        }
    }
}

impl std::error::Error for DskError {}

/// One sector's ID field and where its payload lives in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sector {
    /// Cylinder (C).
    pub c: u8,
    /// Head (H).
    pub h: u8,
    /// Sector ID (R).
    pub r: u8,
    /// Size code (N).
    pub n: u8,
    /// FDC status register 1 recorded by the imaging tool.
    pub st1: u8,
    /// FDC status register 2.
    pub st2: u8,
    offset: usize,
    len: usize,
}

impl Sector {
    /// Absolute payload offset in the image.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub gap: u8,
    pub filler: u8,
    offset: usize,
    len: usize,
    sectors: Vec<Sector>,
}

impl Track {
    #[must_use]
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// Image range covered by this track's block, Track-Info included.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    /// Unformatted tracks exist only in extended images.
    #[must_use]
    pub fn is_formatted(&self) -> bool {
        self.len != 0
    }

    #[must_use]
    pub fn find(&self, c: u8, h: u8, r: u8) -> Option<&Sector> {
        self.sectors.iter().find(|s| s.c == c && s.h == h && s.r == r)
    }
}

/// A parsed disc that owns its image bytes.
#[derive(Debug, Clone)]
pub struct Disc {
    data: Vec<u8>,
    extended: bool,
    sides: u8,
    num_tracks: u8,
    /// Indexed `[side][track]`.
    tracks: Vec<Vec<Track>>,
}

impl Disc {
    /// Validate and index a DSK image. Takes ownership of the blob.
    pub fn parse(data: Vec<u8>) -> Result<Self, DskError> {
        let len = data.len();
        if len > MAX_DISC_SIZE {
            return Err(DskError::TooLarge(len));
        }
        if len <= HEADER_SIZE {
            return Err(DskError::TooSmall(len));
        }
        let extended = if data.starts_with(EXTENDED_MAGIC) {
            true
        } else if data.starts_with(STANDARD_MAGIC) {
            false
        } else {
            return Err(DskError::BadMagic);
        };

        let num_tracks = data[0x30];
        let sides = data[0x31];
        if sides > MAX_SIDES {
            return Err(DskError::TooManySides(sides));
        }
        if num_tracks > MAX_TRACKS {
            return Err(DskError::TooManyTracks(num_tracks));
        }

        let block_sizes = block_sizes(&data, extended, num_tracks, sides);
        let expected = HEADER_SIZE + block_sizes.iter().sum::<usize>();
        if expected != len {
            return Err(DskError::SizeMismatch {
                expected,
                actual: len,
            });
        }

        let mut tracks: Vec<Vec<Track>> = (0..sides)
            .map(|_| Vec::with_capacity(usize::from(num_tracks)))
            .collect();
        let mut offset = HEADER_SIZE;
        let mut sizes = block_sizes.into_iter();
        for track in 0..num_tracks {
            for side in 0..sides {
                let size = sizes.next().unwrap_or(0);
                let parsed = if size == 0 {
                    Track {
                        gap: 0,
                        filler: 0,
                        offset: 0,
                        len: 0,
                        sectors: Vec::new(),
                    }
                } else {
                    parse_track(&data, extended, offset, size, track, side)?
                };
                tracks[usize::from(side)].push(parsed);
                offset += size;
            }
        }

        log::debug!(
            "DSK: {} image, {num_tracks} tracks x {sides} sides, {len} bytes",
            if extended { "extended" } else { "standard" }
        );

        Ok(Self {
            data,
            extended,
            sides,
            num_tracks,
            tracks,
        })
    }

    #[must_use]
    pub fn is_extended(&self) -> bool {
        self.extended
    }

    #[must_use]
    pub fn sides(&self) -> u8 {
        self.sides
    }

    #[must_use]
    pub fn tracks(&self) -> u8 {
        self.num_tracks
    }

    #[must_use]
    pub fn track(&self, side: u8, track: u8) -> Option<&Track> {
        self.tracks
            .get(usize::from(side))?
            .get(usize::from(track))
    }

    #[must_use]
    pub fn sector_data(&self, sector: &Sector) -> &[u8] {
        &self.data[sector.range()]
    }

    pub fn sector_data_mut(&mut self, sector: &Sector) -> &mut [u8] {
        &mut self.data[sector.range()]
    }

    /// The image bytes, including any writes made through
    /// [`Disc::sector_data_mut`].
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Block size for each (track, side) in image order.
fn block_sizes(data: &[u8], extended: bool, num_tracks: u8, sides: u8) -> Vec<usize> {
    let count = usize::from(num_tracks) * usize::from(sides);
    if extended {
        (0..count)
            .map(|i| data.get(0x34 + i).map_or(0, |&b| usize::from(b) * 0x100))
            .collect()
    } else {
        let size = usize::from(u16::from_le_bytes([data[0x32], data[0x33]]));
        vec![size; count]
    }
}

fn parse_track(
    data: &[u8],
    extended: bool,
    offset: usize,
    size: usize,
    track: u8,
    side: u8,
) -> Result<Track, DskError> {
    let end = offset + size;
    if size < TRACK_INFO_SIZE || end > data.len() {
        return Err(DskError::OutOfBounds { track, side });
    }
    let info = &data[offset..offset + TRACK_INFO_SIZE];
    if !info.starts_with(TRACK_MAGIC) {
        return Err(DskError::BadTrackMagic { track, side });
    }

    let size_code = info[0x14];
    let count = usize::from(info[0x15]);
    if count > MAX_SECTORS {
        return Err(DskError::TooManySectors { track, side, count });
    }

    // Both formats must declare 512-byte sectors here. A track with no
    // sectors has nothing for the code to describe, so it is ignored.
    if count > 0 && size_code != SIZE_CODE_512 {
        return Err(DskError::UnsupportedSectorSize {
            track,
            side,
            size: 0x80usize << size_code.min(8),
        });
    }

    let mut sectors = Vec::with_capacity(count);
    let mut sector_offset = offset + TRACK_INFO_SIZE;
    for record in info[0x18..0x18 + count * 8].chunks_exact(8) {
        let len = if extended {
            usize::from(u16::from_le_bytes([record[6], record[7]]))
        } else {
            SECTOR_SIZE
        };
        if len != SECTOR_SIZE {
            return Err(DskError::UnsupportedSectorSize {
                track,
                side,
                size: len,
            });
        }
        if sector_offset + len > end {
            return Err(DskError::OutOfBounds { track, side });
        }
        sectors.push(Sector {
            c: record[0],
            h: record[1],
            r: record[2],
            n: record[3],
            st1: record[4],
            st2: record[5],
            offset: sector_offset,
            len,
        });
        sector_offset += len;
    }

    Ok(Track {
        gap: info[0x16],
        filler: info[0x17],
        offset,
        len: size,
        sectors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One track, one side, one sector.
    fn make_standard_dsk() -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[..STANDARD_MAGIC.len()].copy_from_slice(STANDARD_MAGIC);
        data[0x30] = 1;
        data[0x31] = 1;
        // 256 (info) + 512 (one sector)
        data[0x32] = 0x00;
        data[0x33] = 0x03;

        let mut track = vec![0u8; TRACK_INFO_SIZE];
        track[..TRACK_MAGIC.len()].copy_from_slice(TRACK_MAGIC);
        track[0x14] = SIZE_CODE_512;
        track[0x15] = 1;
        track[0x16] = 0x4E;
        track[0x17] = 0xE5;
        track[0x1A] = 0xC1; // R
        track[0x1B] = 2; // N
        data.extend_from_slice(&track);

        let mut sector = vec![0xE5u8; SECTOR_SIZE];
        sector[0] = 0xAA;
        sector[511] = 0xBB;
        data.extend_from_slice(&sector);
        data
    }

    #[test]
    fn parse_standard_header() {
        let disc = Disc::parse(make_standard_dsk()).expect("should parse");
        assert!(!disc.is_extended());
        assert_eq!(disc.sides(), 1);
        assert_eq!(disc.tracks(), 1);
        let track = disc.track(0, 0).expect("track 0");
        assert_eq!(track.gap, 0x4E);
        assert_eq!(track.filler, 0xE5);
        assert_eq!(track.range(), 0x100..0x400);
        assert!(disc.track(1, 0).is_none());
    }

    #[test]
    fn sector_indexes_into_blob() {
        let disc = Disc::parse(make_standard_dsk()).expect("should parse");
        let sector = *disc.track(0, 0).and_then(|t| t.find(0, 0, 0xC1)).expect("sector C1");
        assert_eq!(sector.offset(), 0x200);
        assert_eq!(sector.len(), SECTOR_SIZE);
        let data = disc.sector_data(&sector);
        assert_eq!(data[0], 0xAA);
        assert_eq!(data[511], 0xBB);
    }

    #[test]
    fn writes_land_in_image() {
        let mut disc = Disc::parse(make_standard_dsk()).expect("should parse");
        let sector = disc.track(0, 0).expect("track").sectors()[0];
        disc.sector_data_mut(&sector)[1] = 0x42;
        assert_eq!(disc.into_bytes()[0x201], 0x42);
    }

    #[test]
    fn rejects_header_only() {
        let data = make_standard_dsk()[..HEADER_SIZE].to_vec();
        assert_eq!(Disc::parse(data).unwrap_err(), DskError::TooSmall(HEADER_SIZE));
    }

    #[test]
    fn rejects_oversized() {
        let data = vec![0u8; MAX_DISC_SIZE + 1];
        assert!(matches!(Disc::parse(data), Err(DskError::TooLarge(_))));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut data = make_standard_dsk();
        data[..8].copy_from_slice(b"MV - PCW");
        assert_eq!(Disc::parse(data).unwrap_err(), DskError::BadMagic);
    }

    #[test]
    fn rejects_three_sides() {
        let mut data = make_standard_dsk();
        data[0x31] = 3;
        assert_eq!(Disc::parse(data).unwrap_err(), DskError::TooManySides(3));
    }

    #[test]
    fn rejects_too_many_tracks() {
        let mut data = make_standard_dsk();
        data[0x30] = 81;
        assert_eq!(Disc::parse(data).unwrap_err(), DskError::TooManyTracks(81));
    }

    #[test]
    fn rejects_bad_track_magic() {
        let mut data = make_standard_dsk();
        data[0x100] = b't';
        assert_eq!(
            Disc::parse(data).unwrap_err(),
            DskError::BadTrackMagic { track: 0, side: 0 }
        );
    }

    #[test]
    fn rejects_non_512_sectors() {
        let mut data = make_standard_dsk();
        data[0x114] = 1;
        assert_eq!(
            Disc::parse(data).unwrap_err(),
            DskError::UnsupportedSectorSize {
                track: 0,
                side: 0,
                size: 256
            }
        );
    }

    #[test]
    fn rejects_sectors_past_track_end() {
        let mut data = make_standard_dsk();
        data[0x115] = 2;
        assert_eq!(
            Disc::parse(data).unwrap_err(),
            DskError::OutOfBounds { track: 0, side: 0 }
        );
    }

    #[test]
    fn rejects_too_many_sectors() {
        let mut data = make_standard_dsk();
        data[0x115] = 13;
        assert!(matches!(
            Disc::parse(data),
            Err(DskError::TooManySectors { count: 13, .. })
        ));
    }

    #[test]
    fn extended_with_unformatted_track() {
        let mut data = vec![0u8; HEADER_SIZE];
        data[..EXTENDED_MAGIC.len()].copy_from_slice(EXTENDED_MAGIC);
        data[0x30] = 2;
        data[0x31] = 1;
        data[0x34] = 3; // track 0: 0x300 bytes
        data[0x35] = 0; // track 1: unformatted

        let mut track = vec![0u8; TRACK_INFO_SIZE];
        track[..TRACK_MAGIC.len()].copy_from_slice(TRACK_MAGIC);
        track[0x14] = SIZE_CODE_512;
        track[0x15] = 1;
        track[0x1A] = 1;
        track[0x1B] = 2;
        track[0x1E] = 0x00;
        track[0x1F] = 0x02;
        data.extend_from_slice(&track);
        data.extend_from_slice(&[0xCC; SECTOR_SIZE]);

        let disc = Disc::parse(data).expect("should parse EDSK");
        assert!(disc.is_extended());
        let t0 = disc.track(0, 0).expect("track 0");
        assert_eq!(disc.sector_data(&t0.sectors()[0])[0], 0xCC);
        let t1 = disc.track(0, 1).expect("track 1");
        assert!(!t1.is_formatted());
        assert!(t1.sectors().is_empty());
    }

    #[test]
    fn extended_track_size_code_is_checked() {
        let mut data = vec![0u8; HEADER_SIZE];
        data[..EXTENDED_MAGIC.len()].copy_from_slice(EXTENDED_MAGIC);
        data[0x30] = 1;
        data[0x31] = 1;
        data[0x34] = 3;

        let mut track = vec![0u8; TRACK_INFO_SIZE];
        track[..TRACK_MAGIC.len()].copy_from_slice(TRACK_MAGIC);
        // Per-sector length says 512, the track says 256.
        track[0x14] = 1;
        track[0x15] = 1;
        track[0x1A] = 1;
        track[0x1B] = 2;
        track[0x1F] = 0x02;
        data.extend_from_slice(&track);
        data.extend_from_slice(&[0; SECTOR_SIZE]);

        assert_eq!(
            Disc::parse(data).unwrap_err(),
            DskError::UnsupportedSectorSize {
                track: 0,
                side: 0,
                size: 256
            }
        );
    }

    #[test]
    fn empty_track_ignores_size_code() {
        let mut data = make_standard_dsk();
        data[0x114] = 0;
        data[0x115] = 0;
        let disc = Disc::parse(data).expect("should parse");
        assert!(disc.track(0, 0).expect("track 0").sectors().is_empty());
    }

    #[test]
    fn error_messages_name_the_track() {
        let err = DskError::BadTrackMagic { track: 7, side: 1 };
        assert_eq!(err.to_string(), "track 7 side 1: missing Track-Info header");
    }
}
