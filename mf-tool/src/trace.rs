//! Scan traces
//!
//! A trace is a recording of raw scans, one per sampler tick.  Each line is
//! the grid word in hex, optionally followed by a colon and the expansion
//! pins, also in hex:
//!
//! ```text
//! # key 12 down, with pin 0
//! 1000:1
//! 1000
//! ```
//!
//! Anything after a `#` is a comment, and blank lines are skipped.

use std::{fs::File, io::{BufRead, BufReader, Read}};

use anyhow::{anyhow, bail, Result};
use mf_keys::ScanSource;

/// A single recorded tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    pub grid: u16,
    pub pins: u8,
}

/// Load a trace from a file.
pub fn load(name: &str) -> Result<Vec<Tick>> {
    let fd = File::open(name).map_err(|e| anyhow!("{}: {}", name, e))?;
    parse(fd)
}

/// Parse a trace.
pub fn parse<R: Read>(input: R) -> Result<Vec<Tick>> {
    let mut ticks = Vec::new();
    for (num, line) in BufReader::new(input).lines().enumerate() {
        let line = line?;
        let text = match line.split_once('#') {
            Some((text, _)) => text,
            None => &line,
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        ticks.push(parse_tick(text).map_err(|e| anyhow!("line {}: {}", num + 1, e))?);
    }
    Ok(ticks)
}

fn parse_tick(text: &str) -> Result<Tick> {
    let (grid, pins) = match text.split_once(':') {
        Some((grid, pins)) => (grid.trim(), Some(pins.trim())),
        None => (text, None),
    };
    let grid = u16::from_str_radix(strip_hex(grid), 16)
        .map_err(|e| anyhow!("bad grid word {:?}: {}", grid, e))?;
    let pins = match pins {
        Some(pins) => u8::from_str_radix(strip_hex(pins), 16)
            .map_err(|e| anyhow!("bad pin word {:?}: {}", pins, e))?,
        None => 0,
    };
    if pins > 0x0f {
        bail!("only four expansion pins, got {:#x}", pins);
    }
    Ok(Tick { grid, pins })
}

fn strip_hex(text: &str) -> &str {
    text.strip_prefix("0x").unwrap_or(text)
}

/// Plays a trace back as if it were the key hardware.  Once the trace runs
/// out, the last reading is held.
pub struct Replay<'a> {
    ticks: &'a [Tick],
    pos: usize,
}

impl<'a> Replay<'a> {
    pub fn new(ticks: &'a [Tick]) -> Self {
        Replay { ticks, pos: 0 }
    }

    pub fn done(&self) -> bool {
        self.pos >= self.ticks.len()
    }
}

impl ScanSource for Replay<'_> {
    fn scan(&mut self) -> (u16, u8) {
        let tick = match self.ticks.get(self.pos) {
            Some(tick) => {
                self.pos += 1;
                *tick
            }
            None => self.ticks.last().copied().unwrap_or(Tick { grid: 0, pins: 0 }),
        };
        (tick.grid, tick.pins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_lines() {
        let text = "# header\n\n1000\n0x3000:1  # two keys\n  f000 : 0xf \n";
        let ticks = parse(text.as_bytes()).unwrap();
        assert_eq!(
            ticks,
            [
                Tick { grid: 0x1000, pins: 0 },
                Tick { grid: 0x3000, pins: 1 },
                Tick { grid: 0xf000, pins: 0xf },
            ]
        );
    }

    #[test]
    fn bad_lines() {
        let err = parse("1000\nzz\n".as_bytes()).unwrap_err();
        assert!(err.to_string().starts_with("line 2:"), "{}", err);
        assert!(parse("1000:10\n".as_bytes()).is_err());
        assert!(parse("10000\n".as_bytes()).is_err());
    }

    #[test]
    fn combo_a_trace() {
        use mf_keys::{Combo, ComboAction, Config, Controller, Event, KeySamples, WINDOW};

        let ticks = load("traces/combo_a.txt").unwrap();
        let samples: KeySamples = KeySamples::new();
        let mut controller = Controller::new(Config::default());
        let mut replay = Replay::new(&ticks);
        let mut events = Vec::new();
        for tick in 1..=ticks.len() + WINDOW {
            samples.tick(&mut replay);
            if tick % WINDOW == 0 {
                controller.poll(&samples, &mut events);
            }
        }
        let combos: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::Combo(action) => Some(*action),
                _ => None,
            })
            .collect();
        assert_eq!(
            combos,
            [ComboAction::Down(Combo::A), ComboAction::Release(Combo::A)]
        );
    }

    #[test]
    fn replay_holds_last() {
        let ticks = [Tick { grid: 1, pins: 0 }, Tick { grid: 2, pins: 3 }];
        let mut replay = Replay::new(&ticks);
        assert_eq!(replay.scan(), (1, 0));
        assert!(!replay.done());
        assert_eq!(replay.scan(), (2, 3));
        assert!(replay.done());
        assert_eq!(replay.scan(), (2, 3));
    }
}
