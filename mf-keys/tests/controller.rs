//! Tests for the whole key path
//!
//! These drive raw samples through the sample rings and the controller, the
//! way the sampler and the main loop do on the device, and check the events
//! that come out the other end.

use std::collections::VecDeque;

use mf_keys::{
    BankMode, Combo, ComboAction, Config, Controller, Event, EventQueue, KeySamples, NoteEvent,
    WINDOW,
};

/// Our test steps are each one of these.
#[derive(Clone, Copy)]
enum Step {
    /// Fill the whole window with this grid reading (and expansion pins).
    Hold(u16, u8),
    /// A single raw sample.
    Sample(u16, u8),
    /// Run one poll.
    Poll,
    /// Expect this event next.
    Expect(Event),
    /// Expect no more events.
    Quiet,
}

use Step::*;

/// Records events, in order.
struct TestQueue {
    events: VecDeque<Event>,
}

impl EventQueue for TestQueue {
    fn push(&mut self, val: Event) {
        println!("event: {:?}", val);
        self.events.push_back(val);
    }
}

struct Rig {
    samples: KeySamples,
    controller: Controller,
    queue: TestQueue,
}

impl Rig {
    fn new(config: Config) -> Rig {
        let _ = env_logger::builder().is_test(true).try_init();
        Rig {
            samples: KeySamples::new(),
            controller: Controller::new(config),
            queue: TestQueue { events: VecDeque::new() },
        }
    }

    fn run(&mut self, steps: &[Step]) {
        for (i, step) in steps.iter().enumerate() {
            match *step {
                Hold(grid, pins) => {
                    for _ in 0..WINDOW {
                        self.samples.sample(grid, pins);
                    }
                    self.controller.poll(&self.samples, &mut self.queue);
                }
                Sample(grid, pins) => self.samples.sample(grid, pins),
                Poll => self.controller.poll(&self.samples, &mut self.queue),
                Expect(ev) => {
                    let got = self.queue.events.pop_front();
                    assert_eq!(got, Some(ev), "step {}", i);
                }
                Quiet => {
                    assert_eq!(self.queue.events.pop_front(), None, "step {}", i);
                }
            }
        }
    }
}

fn on(note: u8) -> Step {
    Expect(Event::Note(NoteEvent::on(note)))
}

fn off(note: u8) -> Step {
    Expect(Event::Note(NoteEvent::off(note)))
}

fn combo(action: ComboAction) -> Step {
    Expect(Event::Combo(action))
}

#[test]
fn bounce_is_filtered() {
    let mut rig = Rig::new(Config::default());
    let mut steps = Vec::new();

    // Key 5 chatters for a while.  Nothing comes out until it settles.
    for i in 0..WINDOW * 2 {
        steps.push(Sample(if i % 3 == 0 { 0 } else { 0x0020 }, 0));
        steps.push(Poll);
    }
    steps.push(Quiet);
    steps.push(Sample(0, 0));
    for _ in 0..WINDOW - 1 {
        steps.push(Sample(0x0020, 0));
    }
    steps.push(Poll);
    steps.push(Quiet);
    steps.push(Sample(0x0020, 0));
    steps.push(Poll);
    // Key 5 is offset 9.
    steps.push(on(36 + 9));
    steps.push(Quiet);

    // A single open sample releases it straight away.
    steps.push(Sample(0, 0));
    steps.push(Poll);
    steps.push(off(36 + 9));
    steps.push(Quiet);

    rig.run(&steps);
}

#[test]
fn sequence_combo() {
    let mut rig = Rig::new(Config::default());
    rig.run(&[
        Hold(0x1000, 0),
        on(36),
        Hold(0x3000, 0),
        on(37),
        Hold(0x7000, 0),
        on(38),
        Hold(0xf000, 0),
        on(39),
        on(8),
        combo(ComboAction::Down(Combo::A)),
        Quiet,
        // Letting go of the first key doesn't end it.
        Hold(0xe000, 0),
        off(36),
        Quiet,
        Hold(0x6000, 0),
        off(39),
        off(8),
        combo(ComboAction::Release(Combo::A)),
        Quiet,
    ]);
}

#[test]
fn chord_combo() {
    let config = Config {
        combo_notes: false,
        ..Config::default()
    };
    let mut rig = Rig::new(config);
    rig.run(&[
        Hold(0x0b00, 0),
        on(40),
        on(41),
        on(43),
        Quiet,
        Hold(0x0f00, 0),
        on(42),
        combo(ComboAction::Down(Combo::B)),
        Quiet,
        // Other chord keys coming up don't release it.
        Hold(0x0e00, 0),
        off(40),
        Quiet,
        // Completing the chord again doesn't fire it again.
        Hold(0x0f00, 0),
        on(40),
        Quiet,
        Hold(0x0b00, 0),
        off(42),
        combo(ComboAction::Release(Combo::B)),
        Quiet,
    ]);
}

#[test]
fn unrelated_key_aborts() {
    let mut rig = Rig::new(Config::default());
    rig.run(&[
        Hold(0x1000, 0),
        on(36),
        Hold(0x3000, 0),
        on(37),
        // Key 5 in the middle of combo A.
        Hold(0x3020, 0),
        on(45),
        Quiet,
        Hold(0, 0),
        off(45),
        off(36),
        off(37),
        Quiet,
    ]);
    assert_eq!(rig.controller.combos().state(), 0);

    rig.run(&[
        Hold(0x1000, 0),
        on(36),
        Hold(0x3000, 0),
        on(37),
        Hold(0x7000, 0),
        on(38),
        Hold(0xf000, 0),
        on(39),
        on(8),
        combo(ComboAction::Down(Combo::A)),
        Quiet,
    ]);
}

#[test]
fn internal_bank_roll() {
    let config = Config {
        bank_mode: BankMode::Internal,
        ..Config::default()
    };
    let mut rig = Rig::new(config);
    rig.run(&[
        // Bank 0 key held.
        Hold(0x0001, 0),
        on(0),
        Quiet,
        // Roll onto bank 1 without letting go.
        Hold(0x0003, 0),
        off(0),
        on(1),
        Expect(Event::Bank(1)),
        Quiet,
        // Bank 0 key up: no longer the active bank.
        Hold(0x0002, 0),
        Quiet,
        // Key 12 in bank 1.
        Hold(0x1002, 0),
        on(36 + 12),
        Quiet,
        Hold(0x1000, 0),
        off(1),
        Quiet,
        Hold(0, 0),
        off(36 + 12),
        Quiet,
    ]);
    assert_eq!(rig.controller.bank(), 1);
}

#[test]
fn external_banks_and_digital_pins() {
    let config = Config {
        bank_mode: BankMode::External,
        digital_enabled: 0x0f,
        ..Config::default()
    };
    let mut rig = Rig::new(config.clone());
    rig.run(&[
        // Pin 2 selects bank 2, and sends no digital note.
        Hold(0, 0x04),
        on(2),
        Expect(Event::Bank(2)),
        Quiet,
        // Key 15 is offset 3.
        Hold(0x8000, 0x04),
        on(36 + 32 + 3),
        Quiet,
        Hold(0x8000, 0),
        off(2),
        Quiet,
    ]);

    // The same pins as plain keys.
    let mut rig = Rig::new(Config {
        bank_mode: BankMode::Off,
        ..config
    });
    rig.run(&[
        Hold(0, 0x05),
        on(4),
        on(6),
        Quiet,
        Hold(0, 0x01),
        off(6),
        Quiet,
    ]);
}

#[test]
fn producer_thread() {
    static SAMPLES: KeySamples = KeySamples::new();
    const TICKS: u32 = 2000;

    let producer = std::thread::spawn(|| {
        for i in 0..TICKS {
            // Hold key 0, and bounce key 1 every other tick.
            let grid = if i % 2 == 0 { 0x0003 } else { 0x0001 };
            SAMPLES.sample(grid, 0);
        }
    });

    let mut controller = Controller::new(Config::default());
    let mut events = Vec::new();
    while SAMPLES.ticks() < TICKS {
        let (grid, _) = SAMPLES.windows();
        // Every window is a whole set of samples, so key 0 is either held in
        // every slot or the window is still filling with zeros.
        assert!(grid.iter().all(|&w| w & 0x0001 != 0) || grid.contains(&0));
        controller.poll(&SAMPLES, &mut events);
    }
    producer.join().unwrap();
    controller.poll(&SAMPLES, &mut events);

    // Key 1 never settles, so only key 0 ever plays.
    assert_eq!(events, [Event::Note(NoteEvent::on(48))]);
    assert_eq!(controller.grid_state(), 0x0001);
}
