//! Digital expansion port
//!
//! The four digital pins on the expansion port can be used as extra keys,
//! each of which sends its own note.  Pins are individually enabled.  In
//! external four banks mode the pins are the bank select keys instead, and
//! don't send anything here.

use crate::bank::{BankMode, NoteEvent, NoteEvents};
use crate::config::ExpansionPins;
use crate::debounce::KeyScan;
use crate::keys::NPINS;

/// Note sent by pin 0.  The others follow.
pub const DIGITAL_NOTE: u8 = 4;

/// Add the notes for any pin edges to `notes`.
pub fn digital_notes(
    mode: BankMode,
    enabled: ExpansionPins,
    pins: &KeyScan<u8>,
    notes: &mut NoteEvents,
) {
    if mode == BankMode::External || enabled.is_empty() {
        return;
    }

    let allow = enabled.bits();
    for i in 0..NPINS as u8 {
        let bit = 1 << i;
        if allow & bit == 0 {
            continue;
        }
        if pins.down & bit != 0 {
            notes.push(NoteEvent::on(DIGITAL_NOTE + i));
        }
        if pins.up & bit != 0 {
            notes.push(NoteEvent::off(DIGITAL_NOTE + i));
        }
    }
}
