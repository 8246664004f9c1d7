//! Keyboard matrix with a sticky pressed-key buffer.
//!
//! Maps host key codes onto the cross-points of an up to 12x12 matrix with
//! up to four shift keys. Host key presses go into a small buffer; the
//! emulated machine scans the matrix by driving columns and reading lines.
//!
//! ```text
//!      C0  C1  C2  ... C11
//!  L0 --+---+---+--...--+
//!  L1 --+---+---+--...--+
//!   .   .   .   .       .
//!  L11--+---+---+--...--+
//! ```
//!
//! Some machines scan slowly, so a released key stays visible for a
//! minimum number of [`KeyboardMatrix::update`] calls (the sticky count).
//! Without this a quick host tap could fall between two scans.
//!
//! Mask layout (u32): lines at bits 0-11, columns at 12-23, shift layers
//! at 24-27.

pub const MAX_COLUMNS: usize = 12;
pub const MAX_LINES: usize = 12;
pub const MAX_SHIFT_KEYS: usize = 4;
pub const MAX_KEYS: usize = 256;
pub const MAX_PRESSED_KEYS: usize = 4;

const DEFAULT_STICKY_COUNT: u32 = 2;

const LINE_BITS: u32 = (1 << MAX_LINES) - 1;
const COLUMN_SHIFT: usize = MAX_LINES;
const LAYER_SHIFT: usize = MAX_LINES + MAX_COLUMNS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct Pressed {
    key: u8,
    /// Full mask including the shift key's cross-point.
    mask: u32,
    /// The key's own cross-point.
    cross: u32,
    layer: u8,
    pressed_frame: u32,
    released_frame: Option<u32>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyboardMatrix {
    frame_count: u32,
    sticky_count: u32,
    /// Index 0 is "no modifier" and is always zero.
    shift_masks: [u32; MAX_SHIFT_KEYS + 1],
    key_masks: Vec<u32>,
    key_cross: Vec<u32>,
    key_layer: Vec<u8>,
    buffer: [Option<Pressed>; MAX_PRESSED_KEYS],
}

const fn cross_point(column: usize, line: usize) -> u32 {
    (1 << (column + COLUMN_SHIFT)) | (1 << line)
}

const fn lines_of(mask: u32) -> u16 {
    (mask & LINE_BITS) as u16
}

const fn columns_of(mask: u32) -> u16 {
    ((mask >> COLUMN_SHIFT) & LINE_BITS) as u16
}

impl KeyboardMatrix {
    #[must_use]
    pub fn new() -> Self {
        Self::with_sticky_count(DEFAULT_STICKY_COUNT)
    }

    /// A matrix whose released keys stay down for `sticky_count` updates.
    /// Zero selects the default of 2.
    #[must_use]
    pub fn with_sticky_count(sticky_count: u32) -> Self {
        Self {
            frame_count: 1,
            sticky_count: if sticky_count == 0 {
                DEFAULT_STICKY_COUNT
            } else {
                sticky_count
            },
            shift_masks: [0; MAX_SHIFT_KEYS + 1],
            key_masks: vec![0; MAX_KEYS],
            key_cross: vec![0; MAX_KEYS],
            key_layer: vec![0; MAX_KEYS],
            buffer: [None; MAX_PRESSED_KEYS],
        }
    }

    #[must_use]
    pub fn sticky_count(&self) -> u32 {
        self.sticky_count
    }

    #[must_use]
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Register the shift key for `layer` (1..=4) at a cross-point.
    pub fn register_shift(&mut self, layer: usize, column: usize, line: usize) {
        assert!(
            (1..=MAX_SHIFT_KEYS).contains(&layer),
            "shift layer {layer} out of range"
        );
        assert!(column < MAX_COLUMNS, "column {column} out of range");
        assert!(line < MAX_LINES, "line {line} out of range");
        self.shift_masks[layer] = (1 << (LAYER_SHIFT + layer - 1)) | cross_point(column, line);
    }

    /// Register `key` at a cross-point, optionally combined with the shift
    /// key of `shift_layer` (0 for none).
    pub fn register_key(&mut self, key: u8, column: usize, line: usize, shift_layer: usize) {
        assert!(column < MAX_COLUMNS, "column {column} out of range");
        assert!(line < MAX_LINES, "line {line} out of range");
        assert!(
            shift_layer <= MAX_SHIFT_KEYS,
            "shift layer {shift_layer} out of range"
        );
        let cross = cross_point(column, line);
        let k = usize::from(key);
        self.key_masks[k] = cross | self.shift_masks[shift_layer];
        self.key_cross[k] = cross;
        self.key_layer[k] = shift_layer as u8;
    }

    #[must_use]
    pub fn key_mask(&self, key: u8) -> u32 {
        self.key_masks[usize::from(key)]
    }

    /// Press `key`. Already-held keys are left alone, a key still visible
    /// from a recent release is re-pressed in place, and a press with no
    /// free slot is dropped.
    pub fn key_down(&mut self, key: u8) {
        let k = usize::from(key);
        if self.key_masks[k] == 0 {
            return;
        }
        if let Some(p) = self.buffer.iter_mut().flatten().find(|p| p.key == key) {
            if p.released_frame.is_some() {
                p.pressed_frame = self.frame_count;
                p.released_frame = None;
            }
            return;
        }
        if let Some(slot) = self.buffer.iter_mut().find(|s| s.is_none()) {
            *slot = Some(Pressed {
                key,
                mask: self.key_masks[k],
                cross: self.key_cross[k],
                layer: self.key_layer[k],
                pressed_frame: self.frame_count,
                released_frame: None,
            });
        }
    }

    /// Mark `key` released. It stays in the buffer until it has been
    /// visible for `sticky_count` more updates.
    pub fn key_up(&mut self, key: u8) {
        let frame = self.frame_count;
        for p in self.buffer.iter_mut().flatten() {
            if p.key == key && p.released_frame.is_none() {
                p.released_frame = Some(frame);
            }
        }
    }

    /// Advance the frame counter and drop expired releases. Call once per
    /// host frame.
    pub fn update(&mut self) {
        self.frame_count = self.frame_count.wrapping_add(1);
        let (frame, sticky) = (self.frame_count, self.sticky_count);
        for slot in &mut self.buffer {
            if let Some(Pressed {
                released_frame: Some(released),
                ..
            }) = *slot
            {
                if frame.wrapping_sub(released) > sticky {
                    *slot = None;
                }
            }
        }
    }

    /// OR of every live key's mask.
    #[must_use]
    pub fn get_bits(&self) -> u32 {
        self.buffer.iter().flatten().fold(0, |acc, p| acc | p.mask)
    }

    /// Frame at which `key` was last pressed, if it is in the buffer.
    #[must_use]
    pub fn held_since(&self, key: u8) -> Option<u32> {
        self.buffer
            .iter()
            .flatten()
            .find(|p| p.key == key)
            .map(|p| p.pressed_frame)
    }

    /// Number of occupied buffer slots.
    #[must_use]
    pub fn pressed_count(&self) -> usize {
        self.buffer.iter().flatten().count()
    }

    /// Drive the columns in `column_mask` and return the lines that read
    /// as connected. A shifted key also lights its shift key's line when
    /// that key's column is driven.
    #[must_use]
    pub fn test_lines(&self, column_mask: u16) -> u16 {
        self.scan(|cross| {
            let cols = columns_of(cross);
            if cols & column_mask == cols {
                lines_of(cross)
            } else {
                0
            }
        })
    }

    /// Drive the lines in `line_mask` and return the connected columns.
    #[must_use]
    pub fn test_columns(&self, line_mask: u16) -> u16 {
        self.scan(|cross| {
            let lines = lines_of(cross);
            if lines & line_mask == lines {
                columns_of(cross)
            } else {
                0
            }
        })
    }

    fn scan(&self, probe: impl Fn(u32) -> u16) -> u16 {
        let mut bits = 0;
        for p in self.buffer.iter().flatten() {
            bits |= probe(p.cross);
            if p.layer != 0 {
                bits |= probe(self.shift_masks[usize::from(p.layer)] & !(0xF << LAYER_SHIFT));
            }
        }
        bits
    }
}

impl Default for KeyboardMatrix {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> KeyboardMatrix {
        let mut kbd = KeyboardMatrix::new();
        kbd.register_shift(1, 0, 0);
        kbd.register_key(b'a', 1, 1, 0);
        kbd.register_key(b'A', 1, 1, 1);
        kbd.register_key(b'b', 2, 1, 0);
        kbd.register_key(b'c', 3, 2, 0);
        kbd.register_key(b'd', 4, 3, 0);
        kbd.register_key(b'e', 5, 4, 0);
        kbd
    }

    #[test]
    fn register_combines_shift_mask() {
        let kbd = matrix();
        assert_eq!(kbd.key_mask(b'a'), (1 << 13) | (1 << 1));
        assert_eq!(
            kbd.key_mask(b'A'),
            (1 << 24) | (1 << 12) | (1 << 0) | (1 << 13) | (1 << 1)
        );
    }

    #[test]
    fn released_key_is_sticky_for_exactly_sticky_count_updates() {
        for sticky in 1..=4 {
            let mut kbd = KeyboardMatrix::with_sticky_count(sticky);
            kbd.register_key(b'x', 3, 7, 0);
            let mask = kbd.key_mask(b'x');

            kbd.key_down(b'x');
            kbd.key_up(b'x');
            for _ in 0..sticky {
                kbd.update();
                assert_eq!(kbd.get_bits(), mask);
            }
            kbd.update();
            assert_eq!(kbd.get_bits(), 0);
        }
    }

    #[test]
    fn held_key_never_expires() {
        let mut kbd = matrix();
        kbd.key_down(b'a');
        for _ in 0..100 {
            kbd.update();
        }
        assert_eq!(kbd.get_bits(), kbd.key_mask(b'a'));
    }

    #[test]
    fn pressing_held_key_is_noop() {
        let mut kbd = matrix();
        kbd.key_down(b'a');
        kbd.key_down(b'a');
        assert_eq!(kbd.pressed_count(), 1);
    }

    #[test]
    fn repress_while_sticky_reuses_slot() {
        let mut kbd = matrix();
        kbd.key_down(b'a');
        kbd.key_up(b'a');
        kbd.update();
        kbd.key_down(b'a');
        assert_eq!(kbd.pressed_count(), 1);
        assert_eq!(kbd.held_since(b'a'), Some(2));
        for _ in 0..10 {
            kbd.update();
        }
        assert_eq!(kbd.get_bits(), kbd.key_mask(b'a'));
    }

    #[test]
    fn full_buffer_drops_press() {
        let mut kbd = matrix();
        for key in [b'a', b'b', b'c', b'd'] {
            kbd.key_down(key);
        }
        kbd.key_down(b'e');
        assert_eq!(kbd.pressed_count(), MAX_PRESSED_KEYS);
        assert_eq!(kbd.test_lines(1 << 5), 0);
        assert_eq!(kbd.held_since(b'e'), None);
    }

    #[test]
    fn unregistered_key_is_ignored() {
        let mut kbd = matrix();
        kbd.key_down(0x7F);
        assert_eq!(kbd.pressed_count(), 0);
    }

    #[test]
    fn test_lines_reports_key_and_shift() {
        let mut kbd = matrix();
        kbd.key_down(b'A');

        // Only the key's column driven: only its line.
        assert_eq!(kbd.test_lines(1 << 1), 1 << 1);
        // Only the shift column driven: only the shift line.
        assert_eq!(kbd.test_lines(1 << 0), 1 << 0);
        assert_eq!(kbd.test_lines(0b11), 0b11);
        assert_eq!(kbd.test_lines(1 << 2), 0);
    }

    #[test]
    fn test_columns_mirrors_test_lines() {
        let mut kbd = matrix();
        kbd.key_down(b'c');
        assert_eq!(kbd.test_columns(1 << 2), 1 << 3);
        assert_eq!(kbd.test_columns(1 << 1), 0);
    }

    #[test]
    #[should_panic(expected = "shift layer 0 out of range")]
    fn layer_zero_is_reserved() {
        KeyboardMatrix::new().register_shift(0, 0, 0);
    }

    #[test]
    #[should_panic(expected = "column 12 out of range")]
    fn column_out_of_range() {
        KeyboardMatrix::new().register_key(1, 12, 0, 0);
    }
}
