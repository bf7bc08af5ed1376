use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use clap::Args;
use pausegate_core::{
    AppId, Config, DecisionEngine, MechanicalEvent, MemoryStateStore, StateStore, Timestamp,
    UiCommand, UiLauncher,
};
use serde::Deserialize;

use super::choice::{self, Choice, ChoiceOptions};
use super::{open_engine, restore, CliResult, Resident};

#[derive(Args)]
pub struct ReplayArgs {
    /// JSONL file to read, or `-` for stdin
    input: PathBuf,
    /// Start from an empty in-memory state instead of the on-disk store
    #[arg(long)]
    memory: bool,
}

/// One line of a replay stream.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Line {
    Choice {
        choice: Choice,
        app: AppId,
        #[serde(default)]
        at: Option<Timestamp>,
        #[serde(flatten)]
        options: ChoiceOptions,
    },
    Event(MechanicalEvent),
}

/// Prints every outbound command as one JSON line.
struct StdoutLauncher;

impl UiLauncher for StdoutLauncher {
    fn dispatch(&mut self, command: &UiCommand) {
        match serde_json::to_string(command) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!(error = %e, "failed to encode ui command"),
        }
    }
}

pub fn run(args: ReplayArgs, resident: Option<&Resident>) -> CliResult {
    let reader: Box<dyn BufRead> = if args.input.as_os_str() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&args.input)?))
    };

    if args.memory {
        let engine = DecisionEngine::new(MemoryStateStore::new(), Config::load()?);
        replay(engine, resident, reader)
    } else {
        replay(open_engine()?, resident, reader)
    }
}

fn replay<S: StateStore>(
    engine: DecisionEngine<S>,
    resident: Option<&Resident>,
    reader: impl BufRead,
) -> CliResult {
    let mut engine = engine.with_launcher(Box::new(StdoutLauncher));
    restore(&mut engine, resident);
    let mut clock: Timestamp = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parsed: Line = serde_json::from_str(trimmed)
            .map_err(|e| format!("line {}: {e}", index + 1))?;

        match parsed {
            Line::Event(event) => {
                clock = event.timestamp;
                engine.handle(&event)?;
            }
            Line::Choice {
                choice,
                app,
                at,
                options,
            } => {
                // Choices without a time happen right after the previous line.
                let now = at.unwrap_or(clock);
                clock = now;
                choice::apply(&mut engine, choice, &app, now, options)?;
            }
        }
    }
    Ok(())
}
