//! Midifighter key tool.
//!
//! Host side helpers for the key processing:
//!
//! - replay: run a recorded scan trace through the key processing, and show
//!   the events that come out.
//! - config: build a config record.
//! - show: decode a config record.
//! - table: dump the combo rule table.

use std::{fs::File, io::Write};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use mf_keys::combo::{rules_for, NSTATES};
use mf_keys::{BankMode, Config, Controller, Event, KeySamples, WINDOW};

mod trace;

#[derive(Parser)]
#[command(name = "mf-tool")]
#[command(about = "Replay key scans and manage config records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Config values that can be given on the command line.
#[derive(clap::Args)]
struct ConfigArgs {
    /// Read the config from this record, before applying the other options.
    #[arg(long, value_name = "FILE")]
    config: Option<String>,

    /// Four banks mode.
    #[arg(long)]
    mode: Option<Mode>,

    /// Note of the bottom left key in bank 0.
    #[arg(long)]
    base_note: Option<u8>,

    /// Mask of the expansion pins that send notes.
    #[arg(long, value_parser = parse_mask)]
    digital: Option<u8>,

    /// Don't send notes for combos.
    #[arg(long)]
    no_combo_notes: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scan trace through the key processing
    Replay {
        /// The trace to replay
        trace: String,

        /// Poll after this many ticks
        #[arg(long, default_value_t = WINDOW)]
        poll_every: usize,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Build a config record
    Config {
        /// Output file
        #[arg(short, long, value_name = "FILE")]
        output: String,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Show the contents of a config record
    Show {
        /// The file to show
        filename: String,
    },

    /// Show the combo rule table
    Table,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Off,
    Internal,
    External,
}

impl From<Mode> for BankMode {
    fn from(mode: Mode) -> BankMode {
        match mode {
            Mode::Off => BankMode::Off,
            Mode::Internal => BankMode::Internal,
            Mode::External => BankMode::External,
        }
    }
}

fn parse_mask(text: &str) -> Result<u8> {
    let mask = match text.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16)?,
        None => text.parse()?,
    };
    if mask > 0x0f {
        return Err(anyhow!("only four expansion pins"));
    }
    Ok(mask)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Replay { trace, poll_every, config } => {
            let config = build_config(config)?;
            replay(trace, *poll_every, config)?;
        }
        Commands::Config { output, config } => {
            let config = build_config(config)?;
            let mut fd = File::create(output)?;
            fd.write_all(&config.encode())?;
            info!("Wrote config to {}", output);
        }
        Commands::Show { filename } => {
            let config = load_config(filename)?;
            println!("{:#?}", config);
            println!("highest note: {}", config.highest_note());
        }
        Commands::Table => {
            for state in 0..NSTATES as u8 {
                for rule in rules_for(state) {
                    println!(
                        "s{:<3} k{:<3} {:<5} -> s{:<3} {}",
                        rule.state,
                        rule.key,
                        format!("{:?}", rule.edge),
                        rule.next,
                        rule.action.map(|a| format!("{:?}", a)).unwrap_or_default(),
                    );
                }
            }
        }
    }

    Ok(())
}

/// Assemble a config from the arguments, starting from the given record, or
/// the default.
fn build_config(args: &ConfigArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(name) => load_config(name)?,
        None => Config::default(),
    };
    if let Some(mode) = args.mode {
        config.bank_mode = mode.into();
    }
    if let Some(base_note) = args.base_note {
        config.base_note = base_note;
    }
    if let Some(digital) = args.digital {
        config.digital_enabled = digital;
    }
    if args.no_combo_notes {
        config.combo_notes = false;
    }
    config.check()?;
    Ok(config)
}

fn load_config(name: &str) -> Result<Config> {
    let data = std::fs::read(name)?;
    Config::decode(&data).ok_or_else(|| anyhow!("{}: not a config record", name))
}

fn replay(name: &str, poll_every: usize, config: Config) -> Result<()> {
    if poll_every == 0 {
        return Err(anyhow!("poll-every must be at least 1"));
    }
    let ticks = trace::load(name)?;
    info!("Replaying {} ticks, polling every {}", ticks.len(), poll_every);

    let samples: KeySamples = KeySamples::new();
    let mut controller = Controller::new(config);
    let mut source = trace::Replay::new(&ticks);
    let mut events = Vec::new();

    // Run a window past the end so the last reading settles.
    let total = ticks.len() + WINDOW;
    for tick in 1..=total {
        samples.tick(&mut source);
        if tick % poll_every == 0 || tick == total {
            controller.poll(&samples, &mut events);
            for event in events.drain(..) {
                show_event(tick, &event);
            }
        }
    }
    if !source.done() {
        return Err(anyhow!("trace was not fully replayed"));
    }
    Ok(())
}

fn show_event(tick: usize, event: &Event) {
    match event {
        Event::Note(note) => {
            let what = if note.on { "on " } else { "off" };
            println!("{:6}: note {} {}", tick, what, note.note);
        }
        Event::Bank(bank) => println!("{:6}: bank {}", tick, bank),
        Event::Combo(action) => println!("{:6}: combo {:?}", tick, action),
    }
}
