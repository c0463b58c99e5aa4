//! Four banks mode
//!
//! The grid only has 16 keys, but the notes can be spread over four banks
//! with a set of bank select keys.  There are three modes:
//!
//! - Off: no banks, the 16 keys map directly to 16 notes.
//! - Internal: the top row of the grid selects the bank, and the remaining
//!   12 keys map into a 12 note window per bank.
//! - External: the four digital expansion pins select the bank, and all 16
//!   keys map into a 16 note window per bank.
//!
//! The bank select keys send their own note (the bank number) when pressed,
//! so the host can follow the bank changes.  If a new bank is selected while
//! the old bank key is still held, the old bank note is turned off first, so
//! that rolling from one bank key to another doesn't leave a note stuck on.

use arrayvec::ArrayVec;
use minicbor::{Decode, Encode};

use crate::debounce::KeyScan;
use crate::keys::{self, BANK_SELECT_MASK, NKEYS};
use crate::log::info;

/// Note sent for bank 0's select key.  The others follow.
pub const BANK_SELECT_NOTE: u8 = 0;

/// Number of banks.
pub const NBANKS: u8 = 4;

/// Most notes a single poll can produce.
pub const MAX_NOTE_EVENTS: usize = 32;

/// The notes produced by one poll.
pub type NoteEvents = ArrayVec<NoteEvent, MAX_NOTE_EVENTS>;

/// A note to turn on or off.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NoteEvent {
    pub note: u8,
    pub on: bool,
}

impl NoteEvent {
    pub fn on(note: u8) -> NoteEvent {
        NoteEvent { note, on: true }
    }

    pub fn off(note: u8) -> NoteEvent {
        NoteEvent { note, on: false }
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Default, Encode, Decode)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BankMode {
    #[default]
    #[n(0)]
    Off,
    #[n(1)]
    Internal,
    #[n(2)]
    External,
}

impl BankMode {
    /// Number of notes in each bank's window.
    pub fn bank_size(self) -> u8 {
        match self {
            BankMode::Off => 0,
            BankMode::Internal => 12,
            BankMode::External => 16,
        }
    }

    /// The first grid key that plays notes.
    fn first_key(self) -> u8 {
        match self {
            BankMode::Internal => 4,
            _ => 0,
        }
    }

    /// Number of distinct notes the grid can reach across all banks.
    pub fn span(self) -> u8 {
        match self {
            BankMode::Off => NKEYS as u8,
            _ => self.bank_size() * NBANKS,
        }
    }
}

/// Maps grid keys to notes, tracking the selected bank.
#[derive(Debug)]
pub struct BankMapper {
    mode: BankMode,
    bank: u8,
    base_note: u8,
}

impl BankMapper {
    pub fn new(mode: BankMode, base_note: u8) -> BankMapper {
        BankMapper {
            mode,
            bank: 0,
            base_note,
        }
    }

    pub fn mode(&self) -> BankMode {
        self.mode
    }

    /// The active bank, always 0..=3.
    pub fn bank(&self) -> u8 {
        self.bank
    }

    pub fn base_note(&self) -> u8 {
        self.base_note
    }

    /// Enter a mode, starting at bank 0.
    pub fn set_mode(&mut self, mode: BankMode) {
        if mode != self.mode {
            info!("bank: mode {:?}", mode);
        }
        self.mode = mode;
        self.bank = 0;
    }

    pub fn set_base_note(&mut self, base_note: u8) {
        self.base_note = base_note;
    }

    /// The note played by `key` in the active bank.
    pub fn key_to_note(&self, key: u8) -> u8 {
        let note = self.window_base() + keys::key_to_note(key);
        debug_assert!(note < 128, "note {} out of range", note);
        note
    }

    /// The key that plays `note` in the active bank, if it is visible.
    pub fn note_to_key(&self, note: u8) -> Option<u8> {
        let offset = note.checked_sub(self.window_base())?;
        let key = keys::note_to_key(offset)?;
        if key < self.mode.first_key() {
            None
        } else {
            Some(key)
        }
    }

    fn window_base(&self) -> u8 {
        self.base_note
            .wrapping_add(self.bank.wrapping_mul(self.mode.bank_size()))
    }

    /// Process one poll of the grid, and of the expansion port.  Returns the
    /// notes to send, in order.
    pub fn map(&mut self, grid: &KeyScan<u16>, expansion: &KeyScan<u8>) -> NoteEvents {
        let mut notes = NoteEvents::new();

        // The bank select keys, and the keys playing notes.
        let (select, played, first) = match self.mode {
            BankMode::Off => {
                self.bank = 0;
                (KeyScan::default(), *grid, 0)
            }
            BankMode::Internal => {
                let played = KeyScan {
                    down: grid.down >> 4,
                    up: grid.up >> 4,
                    state: grid.state >> 4,
                };
                (*grid, played, 4)
            }
            BankMode::External => {
                let select = KeyScan {
                    down: expansion.down as u16,
                    up: expansion.up as u16,
                    state: expansion.state as u16,
                };
                (select, *grid, 0)
            }
        };

        self.select(&select, &mut notes);

        let count = NKEYS as u8 - first;
        for i in 0..count {
            let bit = 1u16 << i;
            if played.down & bit != 0 {
                notes.push(NoteEvent::on(self.key_to_note(i + first)));
            }
            if played.up & bit != 0 {
                notes.push(NoteEvent::off(self.key_to_note(i + first)));
            }
        }

        notes
    }

    /// Handle the bank select keys.
    fn select(&mut self, select: &KeyScan<u16>, notes: &mut NoteEvents) {
        let down = select.down & BANK_SELECT_MASK;
        if down != 0 {
            // Simultaneous presses go to the lowest bank.
            let new_bank = down.trailing_zeros() as u8;
            if new_bank != self.bank && select.state & (1 << self.bank) != 0 {
                info!("bank: release held bank {}", self.bank);
                notes.push(NoteEvent::off(BANK_SELECT_NOTE + self.bank));
            }
            notes.push(NoteEvent::on(BANK_SELECT_NOTE + new_bank));
            if new_bank != self.bank {
                info!("bank: {} -> {}", self.bank, new_bank);
            }
            self.bank = new_bank;
        }

        let up = select.up & BANK_SELECT_MASK;
        if up & (1 << self.bank) != 0 {
            notes.push(NoteEvent::off(BANK_SELECT_NOTE + self.bank));
        }
    }
}
