//! The polling side of the key processing.
//!
//! Each poll reads the debounce windows, works out the edges, and then turns
//! them into events, in this order:
//!
//! - notes from the digital expansion pins,
//! - bank select notes, and the notes of the grid keys in the active bank,
//! - combo gestures.
//!
//! The sampler is expected to have refilled the window between polls.
//! Polling faster than that just derives edges from a partly stale window,
//! which delays them, but doesn't lose them.

use crate::bank::{BankMapper, NoteEvent, NoteEvents};
use crate::combo::{ComboAction, GestureRecognizer};
use crate::config::Config;
use crate::debounce::{Debouncer, KeyScan};
use crate::expansion::digital_notes;
use crate::log::info;
use crate::sample::KeySamples;
use crate::{Event, EventQueue};

/// Note sent by combo A.  The others follow.
pub const COMBO_NOTE: u8 = 8;

/// The note for a combo action.
pub fn combo_note(action: ComboAction) -> NoteEvent {
    let note = COMBO_NOTE + action.combo().index();
    if action.is_down() {
        NoteEvent::on(note)
    } else {
        NoteEvent::off(note)
    }
}

pub struct Controller {
    config: Config,
    grid: Debouncer<u16>,
    expansion: Debouncer<u8>,
    banks: BankMapper,
    combos: GestureRecognizer,
}

impl Controller {
    pub fn new(config: Config) -> Self {
        let banks = BankMapper::new(config.bank_mode, config.base_note);
        Controller {
            config,
            grid: Debouncer::new(),
            expansion: Debouncer::new(),
            banks,
            combos: GestureRecognizer::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Switch to a new configuration.  The bank mode is entered fresh, at
    /// bank 0.
    pub fn set_config(&mut self, config: Config) {
        info!("config: base {} mode {:?}", config.base_note, config.bank_mode);
        self.banks.set_base_note(config.base_note);
        self.banks.set_mode(config.bank_mode);
        self.config = config;
    }

    /// The active bank.
    pub fn bank(&self) -> u8 {
        self.banks.bank()
    }

    pub fn banks(&self) -> &BankMapper {
        &self.banks
    }

    pub fn combos(&self) -> &GestureRecognizer {
        &self.combos
    }

    /// The debounced grid state, as of the last poll.
    pub fn grid_state(&self) -> u16 {
        self.grid.state()
    }

    /// Run one poll against the shared sample rings.
    pub fn poll<const N: usize>(&mut self, samples: &KeySamples<N>, events: &mut dyn EventQueue) {
        let (grid, expansion) = samples.windows();
        self.poll_windows(&grid, &expansion, events);
    }

    /// Run one poll against a pair of windows.
    pub fn poll_windows(&mut self, grid: &[u16], expansion: &[u8], events: &mut dyn EventQueue) {
        self.grid.read(grid);
        let grid = self.grid.calc();
        self.expansion.read(expansion);
        let pins = self.expansion.calc();
        self.process(&grid, &pins, events);
    }

    /// Turn one poll worth of edges into events.
    pub fn process(&mut self, grid: &KeyScan<u16>, pins: &KeyScan<u8>, events: &mut dyn EventQueue) {
        let mut notes = NoteEvents::new();
        digital_notes(self.config.bank_mode, self.config.digital_pins(), pins, &mut notes);
        for note in notes {
            events.push(Event::Note(note));
        }

        let bank = self.banks.bank();
        for note in self.banks.map(grid, pins) {
            events.push(Event::Note(note));
        }
        if self.banks.bank() != bank {
            events.push(Event::Bank(self.banks.bank()));
        }

        if let Some(action) = self.combos.recognize(grid.down, grid.up, grid.state) {
            if self.config.combo_notes {
                events.push(Event::Note(combo_note(action)));
            }
            events.push(Event::Combo(action));
        }
    }
}
