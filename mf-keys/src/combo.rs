//! Combo gestures
//!
//! There are five combos, each of which sends a "down" when it has been
//! completed, holds while the final key is held, and sends a "release" when
//! that key comes up:
//!
//! ```text
//!    A          B           C           D           E
//!  +--------+ +--------+  +--------+  +--------+  +--------+
//!  |        | |        |  |        |  |        |  |        |
//!  |        | |        |  |  3 4   |  |        |  |u       |
//!  |        | |n n n n |  |  1 2   |  |a b c d |  |l r A B |
//!  |1 2 3 4 | |        |  |        |  |        |  |d       |
//!  +--------+ +--------+  +--------+  +--------+  +--------+
//!                                      a-b-c-c-d   uuddlrlrBA
//! ```
//!
//! B is a chord, and can be pressed in any order.  The rest are sequences,
//! recognized by a single state machine that walks the rule table below.
//! The sequences share prefixes, so a few rules jump into the middle of
//! another combo's chain instead of duplicating it.  There is only one
//! current state, and any edge that doesn't match a rule for that state
//! drops back to idle.

use crate::keys::{lowest_bit, KEY_ROW_LOWER};
use crate::log::{debug, info};

/// The idle state.
pub const IDLE: u8 = 0;

/// The chord for combo B: the whole third row, in any order.
pub const CHORD_B: u16 = KEY_ROW_LOWER;

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Combo {
    A,
    B,
    C,
    D,
    E,
}

impl Combo {
    /// Position of this combo, A being 0.
    pub fn index(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ComboAction {
    Down(Combo),
    Release(Combo),
}

impl ComboAction {
    pub fn combo(self) -> Combo {
        match self {
            ComboAction::Down(c) | ComboAction::Release(c) => c,
        }
    }

    pub fn is_down(self) -> bool {
        matches!(self, ComboAction::Down(_))
    }
}

/// Which of the key masks a rule tests.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Edge {
    /// The key went down this poll.
    Down,
    /// The key came up this poll.
    Up,
    /// The key is held.
    Held,
}

/// A single transition.
#[derive(Clone, Copy, Debug)]
pub struct Rule {
    pub state: u8,
    pub key: u8,
    pub edge: Edge,
    pub next: u8,
    pub action: Option<ComboAction>,
}

impl Rule {
    const fn new(state: u8, key: u8, edge: Edge, next: u8, action: Option<ComboAction>) -> Rule {
        Rule { state, key, edge, next, action }
    }

    fn matches(&self, down: u16, up: u16, held: u16) -> bool {
        let mask = match self.edge {
            Edge::Down => down,
            Edge::Up => up,
            Edge::Held => held,
        };
        (1u16 << self.key) & mask != 0
    }
}

use ComboAction::{Down as D, Release as R};
use Edge::{Down, Up};

/// The rules, grouped by state.
pub static RULES: [Rule; 44] = [
    //        state key edge  next  action
    Rule::new(0, 12, Down, 1, None), // combo A
    Rule::new(0, 9, Down, 5, None),  // combo C
    Rule::new(0, 8, Down, 9, None),  // combo D
    Rule::new(0, 4, Down, 18, None), // combo E
    // 4
    Rule::new(1, 13, Down, 2, None),
    Rule::new(2, 14, Down, 3, None),
    Rule::new(3, 15, Down, 4, Some(D(Combo::A))),
    Rule::new(4, 15, Up, 0, Some(R(Combo::A))),
    // 8
    Rule::new(5, 10, Down, 6, None),
    Rule::new(6, 5, Down, 7, None),
    Rule::new(7, 6, Down, 8, Some(D(Combo::C))),
    Rule::new(8, 6, Up, 0, Some(R(Combo::C))),
    // 12
    Rule::new(9, 8, Up, 10, None),
    Rule::new(10, 9, Down, 11, None),
    Rule::new(11, 9, Up, 12, None),
    Rule::new(11, 10, Down, 6, None), // --> combo C
    // 16
    Rule::new(12, 10, Down, 13, None),
    Rule::new(13, 10, Up, 14, None),
    Rule::new(14, 10, Down, 15, None),
    Rule::new(15, 10, Up, 16, None),
    Rule::new(16, 11, Down, 17, Some(D(Combo::D))),
    Rule::new(17, 11, Up, 0, Some(R(Combo::D))),
    // 22
    Rule::new(18, 4, Up, 19, None),
    Rule::new(19, 4, Down, 20, None),
    Rule::new(20, 4, Up, 21, None),
    Rule::new(21, 12, Down, 22, None),
    Rule::new(22, 12, Up, 23, None),
    Rule::new(23, 12, Down, 24, None),
    Rule::new(24, 12, Up, 25, None),
    Rule::new(25, 8, Down, 26, None),
    Rule::new(26, 8, Up, 27, None),
    Rule::new(26, 10, Down, 6, None), // --> combo C
    // 32
    Rule::new(27, 9, Down, 28, None),
    Rule::new(28, 9, Up, 29, None),
    Rule::new(29, 8, Down, 30, None),
    Rule::new(30, 8, Up, 31, None),
    Rule::new(31, 9, Down, 32, None),
    Rule::new(31, 10, Down, 13, None), // --> combo D
    Rule::new(32, 9, Up, 33, None),
    Rule::new(33, 11, Down, 34, None),
    Rule::new(33, 9, Down, 11, None), // --> combo D
    Rule::new(34, 11, Up, 35, None),
    Rule::new(35, 10, Down, 36, Some(D(Combo::E))),
    Rule::new(36, 10, Up, 0, Some(R(Combo::E))),
];

/// Number of states in the machine.
pub const NSTATES: usize = 37;

/// Index of the first rule for each state.
static STATE_OFFSET: [u8; NSTATES] = [
    0, //
    4, 5, 6, 7, //
    8, 9, 10, 11, //
    12, 13, 14, //
    16, 17, 18, 19, 20, 21, //
    22, 23, 24, 25, 26, 27, 28, 29, 30, //
    32, 33, 34, 35, 36, //
    38, 39, //
    41, 42, 43, //
];

/// The block of rules that apply to `state`.
pub fn rules_for(state: u8) -> &'static [Rule] {
    debug_assert!((state as usize) < NSTATES, "combo state {} out of range", state);
    let start = STATE_OFFSET[state as usize % NSTATES] as usize;
    let len = RULES[start..]
        .iter()
        .take_while(|r| r.state == state)
        .count();
    &RULES[start..start + len]
}

/// The combo state machine.
#[derive(Debug)]
pub struct GestureRecognizer {
    /// Current position in the rule table.
    state: u8,
    /// The action most recently produced.  A `Down` here is "armed", and
    /// waiting for the release key.
    action: Option<ComboAction>,
    /// The key whose release ends the armed combo.
    release_key: u16,
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        GestureRecognizer {
            state: IDLE,
            action: None,
            release_key: 0,
        }
    }
}

impl GestureRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state machine position.
    pub fn state(&self) -> u8 {
        self.state
    }

    /// The combo currently being held, if any.
    pub fn armed(&self) -> Option<Combo> {
        match self.action {
            Some(ComboAction::Down(c)) => Some(c),
            _ => None,
        }
    }

    /// The key whose release will end the armed combo.
    pub fn release_key(&self) -> u16 {
        self.release_key
    }

    /// Back to idle, dropping any armed combo without a release.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance the machine with one poll worth of keys.
    pub fn recognize(&mut self, down: u16, up: u16, held: u16) -> Option<ComboAction> {
        if down == 0 && up == 0 {
            return None;
        }

        // B can be pressed in any order, so it is checked against the whole
        // state rather than walking the table.
        if held == CHORD_B && self.action != Some(ComboAction::Down(Combo::B)) {
            // The last key down completes the chord, and is the release key.
            let last = lowest_bit(down);
            if last == 0 {
                self.action = None;
                return None;
            }
            self.release_key = last;
            self.action = Some(ComboAction::Down(Combo::B));
            info!("combo: B down, release {:x}", last);
            return self.action;
        }

        // While a combo is held, only watch for its release key.
        if let Some(ComboAction::Down(combo)) = self.action {
            if held & self.release_key == 0 {
                self.state = IDLE;
                self.action = Some(ComboAction::Release(combo));
                info!("combo: {:?} release", combo);
                return self.action;
            }
            return None;
        }

        let mut next = IDLE;
        let mut action = None;
        match rules_for(self.state)
            .iter()
            .find(|r| r.matches(down, up, held))
        {
            Some(rule) => {
                next = rule.next;
                action = rule.action;
            }
            None => {
                if self.state != IDLE {
                    debug!("combo: abort in state {}", self.state);
                }
            }
        }
        debug_assert!((next as usize) < NSTATES);
        self.state = next;
        self.action = action;

        if let Some(act) = action {
            self.release_key = lowest_bit(down);
            info!("combo: {:?}, release {:x}", act, self.release_key);
        }

        action
    }
}
