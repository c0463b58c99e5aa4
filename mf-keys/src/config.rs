//! Configuration
//!
//! The settings the key processing reads.  Where they are stored is up to
//! the rest of the firmware; this just defines the CBOR record and checks
//! that the values make sense together.

use alloc::vec::Vec;
use core::fmt;

use bitflags::bitflags;
use minicbor::{Decode, Encode};

use crate::bank::{BankMode, NBANKS};
use crate::log::warn;

/// Default base note of the grid (C2).
pub const BASE_NOTE: u8 = 36;

bitflags! {
    /// The digital expansion pins.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct ExpansionPins: u8 {
        const PIN0 = 0b0000_0001;
        const PIN1 = 0b0000_0010;
        const PIN2 = 0b0000_0100;
        const PIN3 = 0b0000_1000;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
#[cbor(tag(0x6d66636f6e666967))]
#[cbor(map)]
pub struct Config {
    /// Note played by the bottom left key in bank 0.
    #[n(1)]
    pub base_note: u8,

    /// Four banks mode.
    #[n(2)]
    pub bank_mode: BankMode,

    /// Which expansion pins send notes, as a pin mask.
    #[n(3)]
    pub digital_enabled: u8,

    /// Send notes for combos.
    #[n(4)]
    pub combo_notes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_note: BASE_NOTE,
            bank_mode: BankMode::Off,
            digital_enabled: 0,
            combo_notes: true,
        }
    }
}

/// A configuration that can't be used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The highest note would be past 127.
    NoteRange { base_note: u8, mode: BankMode },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoteRange { base_note, mode } => write!(
                f,
                "base note {} in {:?} mode runs past note 127",
                base_note, mode
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

impl Config {
    /// The enabled expansion pins.
    pub fn digital_pins(&self) -> ExpansionPins {
        ExpansionPins::from_bits_truncate(self.digital_enabled)
    }

    /// The highest note the grid can play.
    pub fn highest_note(&self) -> u16 {
        self.base_note as u16 + self.bank_mode.span() as u16 - 1
    }

    /// Make sure every note the grid can produce is a valid MIDI note.
    pub fn check(&self) -> Result<(), ConfigError> {
        debug_assert!(self.bank_mode.span() <= 16 * NBANKS);
        if self.highest_note() > 127 {
            return Err(ConfigError::NoteRange {
                base_note: self.base_note,
                mode: self.bank_mode,
            });
        }
        Ok(())
    }

    /// Encode as CBOR.
    pub fn encode(&self) -> Vec<u8> {
        // Writing to a Vec can't fail.
        minicbor::to_vec(self).unwrap_or_default()
    }

    /// Decode a config record, logging and returning None if it is not one.
    pub fn decode(buffer: &[u8]) -> Option<Config> {
        match minicbor::decode::<Config>(buffer) {
            Ok(config) => Some(config),
            Err(e) => {
                #[cfg(all(feature = "defmt", not(feature = "log")))]
                warn!("Fail to read Config: {:?}", defmt::Debug2Format(&e));
                #[cfg(not(all(feature = "defmt", not(feature = "log"))))]
                warn!("Fail to read Config: {:?}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges() {
        let mut config = Config::default();
        assert_eq!(config.highest_note(), 51);
        assert!(config.check().is_ok());

        config.bank_mode = BankMode::External;
        assert_eq!(config.highest_note(), 99);
        config.base_note = 64;
        assert_eq!(config.highest_note(), 127);
        assert!(config.check().is_ok());
        config.base_note = 65;
        assert_eq!(
            config.check(),
            Err(ConfigError::NoteRange { base_note: 65, mode: BankMode::External })
        );

        config.bank_mode = BankMode::Internal;
        assert!(config.check().is_ok());
    }

    #[test]
    fn cbor() {
        let config = Config {
            base_note: 48,
            bank_mode: BankMode::Internal,
            digital_enabled: 0x0a,
            combo_notes: false,
        };
        let bytes = config.encode();
        assert_eq!(Config::decode(&bytes), Some(config.clone()));
        assert_eq!(config.digital_pins(), ExpansionPins::PIN1 | ExpansionPins::PIN3);

        assert_eq!(Config::decode(&[0xff, 0x00]), None);
        assert_eq!(Config::decode(&bytes[..bytes.len() - 1]), None);
    }

    #[test]
    fn stray_pin_bits() {
        let config = Config { digital_enabled: 0xf3, ..Config::default() };
        assert_eq!(config.digital_pins(), ExpansionPins::PIN0 | ExpansionPins::PIN1);
    }
}
