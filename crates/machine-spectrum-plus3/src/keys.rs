//! The Spectrum keyboard on a [`KeyboardMatrix`].
//!
//! The matrix has eight columns (the half-rows selected by A8-A15) and
//! five lines (data bits 0-4). CAPS SHIFT and SYMBOL SHIFT are shift
//! layers 1 and 2, so host characters that need either shift are
//! registered directly: pressing `'Z'` holds CAPS SHIFT and Z together.
//!
//! Physical keys that have no character of their own are reachable
//! through [`SpectrumKey::code`].

use peripheral_keyboard_matrix::KeyboardMatrix;

/// Shift layer of CAPS SHIFT.
pub const CAPS_LAYER: usize = 1;
/// Shift layer of SYMBOL SHIFT.
pub const SYMBOL_LAYER: usize = 2;

/// Key codes from 0x80 up name physical keys.
const PHYSICAL_BASE: u8 = 0x80;

/// Logical key on the Spectrum keyboard.
///
/// Each key maps to a (half-row, bit) pair in the 8×5 keyboard matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpectrumKey {
    // Half-row 0 (A8)
    CapsShift,
    Z,
    X,
    C,
    V,
    // Half-row 1 (A9)
    A,
    S,
    D,
    F,
    G,
    // Half-row 2 (A10)
    Q,
    W,
    E,
    R,
    T,
    // Half-row 3 (A11)
    N1,
    N2,
    N3,
    N4,
    N5,
    // Half-row 4 (A12)
    N0,
    N9,
    N8,
    N7,
    N6,
    // Half-row 5 (A13)
    P,
    O,
    I,
    U,
    Y,
    // Half-row 6 (A14)
    Enter,
    L,
    K,
    J,
    H,
    // Half-row 7 (A15)
    Space,
    SymShift,
    M,
    N,
    B,
}

impl SpectrumKey {
    /// Every key in matrix order.
    pub const ALL: [Self; 40] = [
        Self::CapsShift,
        Self::Z,
        Self::X,
        Self::C,
        Self::V,
        Self::A,
        Self::S,
        Self::D,
        Self::F,
        Self::G,
        Self::Q,
        Self::W,
        Self::E,
        Self::R,
        Self::T,
        Self::N1,
        Self::N2,
        Self::N3,
        Self::N4,
        Self::N5,
        Self::N0,
        Self::N9,
        Self::N8,
        Self::N7,
        Self::N6,
        Self::P,
        Self::O,
        Self::I,
        Self::U,
        Self::Y,
        Self::Enter,
        Self::L,
        Self::K,
        Self::J,
        Self::H,
        Self::Space,
        Self::SymShift,
        Self::M,
        Self::N,
        Self::B,
    ];

    /// The (half-row, bit) pair for this key in the keyboard matrix.
    #[must_use]
    pub const fn matrix(self) -> (usize, usize) {
        let index = self as usize;
        (index / 5, index % 5)
    }

    /// Key code that presses this key alone, without any shift.
    #[must_use]
    pub const fn code(self) -> u8 {
        PHYSICAL_BASE + self as u8
    }
}

/// Characters by layer, half-row and line. Spaces are unused positions.
const KEYMAP: [&[u8; 40]; 3] = [
    // Unshifted
    b" zxcvasdfgqwert1234509876poiuy lkjh  mnb",
    // CAPS SHIFT
    b" ZXCVASDFGQWERT          POIUY LKJH  MNB",
    // SYMBOL SHIFT
    b" : ?/        <>!@#$%_)('&\";    =+-^  .,*",
];

/// Control codes on CAPS SHIFT + digit: (code, half-row, line).
const CAPS_CONTROLS: [(u8, usize, usize); 6] = [
    (0x08, 3, 4), // cursor left (5)
    (0x0A, 4, 4), // cursor down (6)
    (0x0B, 4, 3), // cursor up (7)
    (0x09, 4, 2), // cursor right (8)
    (0x07, 3, 0), // edit (1)
    (0x0C, 4, 0), // delete (0)
];

/// Build the Spectrum keyboard.
#[must_use]
pub fn keyboard(sticky_count: u32) -> KeyboardMatrix {
    let mut kbd = KeyboardMatrix::with_sticky_count(sticky_count);
    let (column, line) = SpectrumKey::CapsShift.matrix();
    kbd.register_shift(CAPS_LAYER, column, line);
    let (column, line) = SpectrumKey::SymShift.matrix();
    kbd.register_shift(SYMBOL_LAYER, column, line);

    for (layer, chars) in KEYMAP.iter().enumerate() {
        for (i, &c) in chars.iter().enumerate() {
            if c != b' ' {
                kbd.register_key(c, i / 5, i % 5, layer);
            }
        }
    }

    for key in SpectrumKey::ALL {
        let (column, line) = key.matrix();
        kbd.register_key(key.code(), column, line, 0);
    }
    kbd.register_key(b' ', 7, 0, 0);
    kbd.register_key(b'\r', 6, 0, 0);
    kbd.register_key(b'\n', 6, 0, 0);
    for (code, column, line) in CAPS_CONTROLS {
        kbd.register_key(code, column, line, CAPS_LAYER);
    }
    kbd
}

/// One entry per frame for typing `text`: the key to hold that frame, or
/// `None` for a frame with nothing pressed.
///
/// A key typed twice in a row must vanish from the keyboard between the
/// presses, so each repeat waits for the released key to expire (its
/// `sticky_count` updates) plus one frame where it reads as up.
#[must_use]
pub fn typing_schedule(text: &[u8], sticky_count: u32) -> Vec<Option<u8>> {
    let gap = sticky_count as usize + 2;
    let mut frames = Vec::with_capacity(text.len());
    let mut prev = None;
    for &key in text {
        if prev == Some(key) {
            frames.extend(std::iter::repeat_n(None, gap));
        }
        frames.push(Some(key));
        prev = Some(key);
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_spaces_out_repeats() {
        assert_eq!(
            typing_schedule(b"ab", 2),
            vec![Some(b'a'), Some(b'b')]
        );
        let frames = typing_schedule(b"LLa", 2);
        assert_eq!(frames.len(), 3 + 4);
        assert_eq!(frames[0], Some(b'L'));
        assert!(frames[1..5].iter().all(Option::is_none));
        assert_eq!(frames[5], Some(b'L'));
    }

    #[test]
    fn matrix_positions_follow_half_rows() {
        assert_eq!(SpectrumKey::CapsShift.matrix(), (0, 0));
        assert_eq!(SpectrumKey::G.matrix(), (1, 4));
        assert_eq!(SpectrumKey::N6.matrix(), (4, 4));
        assert_eq!(SpectrumKey::Enter.matrix(), (6, 0));
        assert_eq!(SpectrumKey::B.matrix(), (7, 4));
    }

    #[test]
    fn shifted_characters_hold_their_shift_key() {
        let mut kbd = keyboard(2);
        kbd.key_down(b'Z');
        // Half-row 0 sees CAPS SHIFT (line 0) and Z (line 1).
        assert_eq!(kbd.test_lines(0x01), 0b00011);
        kbd.key_up(b'Z');

        let mut kbd = keyboard(2);
        kbd.key_down(b'"');
        // P's half-row for the key itself, half-row 7 for SYMBOL SHIFT.
        assert_eq!(kbd.test_lines(1 << 5), 0b00001);
        assert_eq!(kbd.test_lines(1 << 7), 0b00010);
    }

    #[test]
    fn physical_codes_press_the_bare_key() {
        let mut kbd = keyboard(2);
        kbd.key_down(SpectrumKey::SymShift.code());
        assert_eq!(kbd.test_lines(1 << 7), 0b00010);
        assert_eq!(kbd.test_lines(0x7F), 0);
    }

    #[test]
    fn cursor_keys_use_caps_shift() {
        let mut kbd = keyboard(2);
        kbd.key_down(0x0B);
        assert_eq!(kbd.test_lines(1 << 4), 0b01000);
        assert_eq!(kbd.test_lines(0x01), 0b00001);
    }
}
