//! Midifighter key processing
//!
//! Turns raw samples of the 4x4 button grid (and the four digital expansion
//! pins) into debounced key edges, and then into the note and combo events
//! that the MIDI transport sends to the host.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

extern crate alloc;

pub use bank::{BankMapper, BankMode, NoteEvent, NoteEvents};
pub use combo::{Combo, ComboAction, GestureRecognizer};
pub use config::{Config, ConfigError, ExpansionPins};
pub use controller::Controller;
pub use debounce::{Debouncer, KeyScan};
pub use sample::{KeySamples, SampleBuffer, ScanSource, ScanWord, WINDOW};

pub mod bank;
pub mod combo;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod expansion;
pub mod keys;
pub mod sample;

#[cfg(test)]
mod testlog;

cfg_if::cfg_if! {
    if #[cfg(feature = "log")] {
        mod log {
            pub use log::{debug, info, warn};
        }
    } else if #[cfg(feature = "defmt")] {
        mod log {
            pub use defmt::{debug, info, warn};
        }
    } else {
        #[allow(unused_macros)]
        mod log {
            // The arguments are still type checked, and count as used.
            macro_rules! quiet {
                ($($arg:tt)*) => {{
                    if false {
                        let _ = core::format_args!($($arg)*);
                    }
                }};
            }
            #[allow(unused_imports)]
            pub(crate) use {quiet as debug, quiet as info, quiet as warn};
        }
    }
}

/// An event is something the core has decided should be passed on to the
/// transport or the indicator layers.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// A note should be turned on or off.
    Note(NoteEvent),

    /// The active bank changed.
    Bank(u8),

    /// A combo gesture fired or was released.
    Combo(ComboAction),
}

/// A generalized event queue.  Events will be discarded if the queue is full.
pub trait EventQueue {
    fn push(&mut self, val: Event);
}

#[cfg(any(feature = "std", test))]
impl EventQueue for std::vec::Vec<Event> {
    fn push(&mut self, val: Event) {
        std::vec::Vec::push(self, val);
    }
}

#[cfg(all(test, not(feature = "log"), not(feature = "defmt")))]
mod tests {
    use crate::log::{debug, info, warn};

    #[test]
    fn quiet_logging() {
        let mut calls = 0;
        let mut count = || {
            calls += 1;
            calls
        };
        debug!("{}", count());
        info!("{:x}", count());
        warn!("{:?}", count());
        assert_eq!(calls, 0);
        assert_eq!(crate::Config::decode(&[0xff]), None);
    }
}
