use clap::{Subcommand, ValueEnum};
use pausegate_core::{MechanicalEvent, TimerKind, Timestamp};

use super::{open_engine, print_json, restore, timestamp, CliResult, Resident};

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    QuickTask,
    Intention,
}

impl From<KindArg> for TimerKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::QuickTask => TimerKind::QuickTask,
            KindArg::Intention => TimerKind::Intention,
        }
    }
}

#[derive(Subcommand)]
pub enum EventAction {
    /// The foreground app changed
    Foreground {
        /// Package name now in the foreground
        app: String,
        /// Event time in epoch milliseconds (defaults to now)
        #[arg(long)]
        at: Option<Timestamp>,
    },
    /// A timer keyed by this app fired
    Expired {
        app: String,
        #[arg(long)]
        at: Option<Timestamp>,
    },
    /// A timer was armed outside the engine
    TimerSet {
        app: String,
        #[arg(long, value_enum)]
        kind: KindArg,
        /// Absolute expiry in epoch milliseconds
        #[arg(long)]
        expires_at: Timestamp,
        #[arg(long)]
        at: Option<Timestamp>,
    },
    /// Process every timer that has run out, e.g. after a restart
    Sweep {
        #[arg(long)]
        at: Option<Timestamp>,
    },
}

pub fn run(action: EventAction, resident: Option<&Resident>) -> CliResult {
    let mut engine = open_engine()?;
    restore(&mut engine, resident);

    let event = match action {
        EventAction::Foreground { app, at } => {
            MechanicalEvent::foreground_changed(app, timestamp(at))
        }
        EventAction::Expired { app, at } => MechanicalEvent::timer_expired(app, timestamp(at)),
        EventAction::TimerSet {
            app,
            kind,
            expires_at,
            at,
        } => MechanicalEvent::timer_set(app, timestamp(at), kind.into(), expires_at),
        EventAction::Sweep { at } => {
            let outcomes = engine.sweep(timestamp(at))?;
            return print_json(&outcomes);
        }
    };

    let outcome = engine.handle(&event)?;
    print_json(&outcome)
}
