//! Keys on the grid
//!
//! The grid is 4x4, and key indices are read left-to-right, top row first:
//!
//! ```text
//!     +-----------+
//!     | 0  1  2  3|
//!     | 4  5  6  7|
//!     | 8  9 10 11|
//!     |12 13 14 15|
//!     +-----------+
//! ```
//!
//! Bit `i` of a grid scan word is key `i`.

/// Number of keys on the grid.
pub const NKEYS: usize = 16;

/// Number of digital pins on the expansion port.
pub const NPINS: usize = 4;

/// Mask of the expansion pins (and of the four bank select keys, which are
/// the top row of the grid).
pub const BANK_SELECT_MASK: u16 = 0x000f;

/// The third row of the grid.
pub const KEY_ROW_LOWER: u16 = 0x0f00;

/// Mapping from physical key index to note offset.  This turns the grid
/// upside down so that the bottom row plays the lowest notes.
static NOTE_MAP: [u8; NKEYS] = [
    12, 13, 14, 15, //
    8, 9, 10, 11, //
    4, 5, 6, 7, //
    0, 1, 2, 3, //
];

/// Return the note offset of the given key.
pub fn key_to_note(key: u8) -> u8 {
    debug_assert!((key as usize) < NKEYS, "key index {} out of range", key);
    NOTE_MAP[key as usize % NKEYS]
}

/// Return the key that plays the given note offset, or None if the offset
/// isn't on the grid.
pub fn note_to_key(offset: u8) -> Option<u8> {
    NOTE_MAP.iter().position(|&n| n == offset).map(|k| k as u8)
}

/// The mask bit for a given key.
pub fn key_bit(key: u8) -> u16 {
    debug_assert!((key as usize) < NKEYS, "key index {} out of range", key);
    1 << (key as u32 % NKEYS as u32)
}

/// Return the lowest set bit of `mask` (the bit, not its position), or zero
/// if no bits are set.
pub fn lowest_bit(mask: u16) -> u16 {
    mask & mask.wrapping_neg()
}
