//! Debouncing
//!
//! The state of a key is the AND of every sample of it in the window.  A key
//! is only considered pressed once every sample in the window agrees, but a
//! single released sample clears it.  Releases therefore come through right
//! away, while presses are delayed by up to a full window.  A false release
//! is much more visible than a slightly late press, so we lean that way.
//!
//! Reading the state and computing the edges are separate steps.  The state
//! can be read as often as is useful, but the edges are only computed just
//! before events are about to be sent, once per poll.

use crate::sample::ScanWord;

/// The result of one poll of a group of keys.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
pub struct KeyScan<W> {
    /// Keys that went down since the last poll.
    pub down: W,
    /// Keys that came up since the last poll.
    pub up: W,
    /// Keys that are currently (debounced) pressed.
    pub state: W,
}

impl<W: ScanWord> KeyScan<W> {
    /// Were there any edges at all?
    pub fn is_quiet(&self) -> bool {
        self.down == W::NONE && self.up == W::NONE
    }
}

#[derive(Clone, Debug, Default)]
pub struct Debouncer<W> {
    state: W,
    prev: W,
}

impl<W: ScanWord> Debouncer<W> {
    pub fn new() -> Self {
        Debouncer {
            state: W::NONE,
            prev: W::NONE,
        }
    }

    /// Reduce a window of samples to a stable state.
    pub fn read(&mut self, window: &[W]) -> W {
        self.state = window.iter().fold(W::ALL, |acc, &w| acc & w);
        self.state
    }

    /// Compute the edges between the previous poll and the most recent
    /// `read`, and make the current state the previous one.  Calling this
    /// twice without a read in between gives no edges the second time.
    pub fn calc(&mut self) -> KeyScan<W> {
        let changed = self.prev ^ self.state;
        let scan = KeyScan {
            down: changed & self.state,
            up: changed & self.prev,
            state: self.state,
        };
        self.prev = self.state;
        debug_assert!(scan.down & scan.up == W::NONE);
        scan
    }

    /// The last state read.
    pub fn state(&self) -> W {
        self.state
    }

    /// Forget everything, as at power on.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
