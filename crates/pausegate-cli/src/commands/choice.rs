use clap::{Args, Subcommand};
use pausegate_core::error::Result;
use pausegate_core::{ActivityEnd, AppId, DecisionEngine, Outcome, StateStore, Timestamp};
use serde::Deserialize;

use super::{open_engine, print_json, restore, timestamp, CliResult, Resident};

/// A choice the user made on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    AcceptQuickTask,
    Decline,
    Intention,
    Alternative,
    FinishAlternative,
    Cancel,
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOptions {
    /// Intention length; the configured default when absent.
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Alternative Activity abandoned before its timer completed.
    #[serde(default)]
    pub early: bool,
}

#[derive(Args)]
pub struct Target {
    /// Package name the choice applies to
    app: String,
    /// Choice time in epoch milliseconds (defaults to now)
    #[arg(long)]
    at: Option<Timestamp>,
}

#[derive(Subcommand)]
pub enum ChoiceAction {
    /// Take a Quick Task
    AcceptQuickTask(Target),
    /// Turn down the Quick Task and go through the intervention
    Decline(Target),
    /// Commit to a bounded-use window
    Intention {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        duration_ms: Option<u64>,
    },
    /// Start an Alternative Activity
    Alternative(Target),
    /// End the running Alternative Activity
    FinishAlternative {
        #[command(flatten)]
        target: Target,
        /// Ended by the user rather than by its timer
        #[arg(long)]
        early: bool,
    },
    /// Dismiss the intervention
    Cancel(Target),
    /// Keep using the app after the Quick Task ran out
    Continue(Target),
    /// Leave the app after the Quick Task ran out
    Quit(Target),
}

impl ChoiceAction {
    fn into_parts(self) -> (Choice, Target, ChoiceOptions) {
        let plain = ChoiceOptions::default();
        match self {
            ChoiceAction::AcceptQuickTask(t) => (Choice::AcceptQuickTask, t, plain),
            ChoiceAction::Decline(t) => (Choice::Decline, t, plain),
            ChoiceAction::Intention {
                target,
                duration_ms,
            } => (
                Choice::Intention,
                target,
                ChoiceOptions {
                    duration_ms,
                    ..plain
                },
            ),
            ChoiceAction::Alternative(t) => (Choice::Alternative, t, plain),
            ChoiceAction::FinishAlternative { target, early } => (
                Choice::FinishAlternative,
                target,
                ChoiceOptions { early, ..plain },
            ),
            ChoiceAction::Cancel(t) => (Choice::Cancel, t, plain),
            ChoiceAction::Continue(t) => (Choice::Continue, t, plain),
            ChoiceAction::Quit(t) => (Choice::Quit, t, plain),
        }
    }
}

/// Route a choice to the matching engine operation.
pub fn apply<S: StateStore>(
    engine: &mut DecisionEngine<S>,
    choice: Choice,
    app: &AppId,
    now: Timestamp,
    options: ChoiceOptions,
) -> Result<Outcome> {
    match choice {
        Choice::AcceptQuickTask => engine.accept_quick_task(app, now),
        Choice::Decline => engine.decline_quick_task(app),
        Choice::Intention => {
            let duration = options
                .duration_ms
                .unwrap_or(engine.config().intention.default_duration_ms);
            engine.set_intention(app, duration, now)
        }
        Choice::Alternative => engine.start_alternative_activity(app),
        Choice::FinishAlternative => {
            let reason = if options.early {
                ActivityEnd::FinishedEarly
            } else {
                ActivityEnd::TimerCompleted
            };
            engine.finish_alternative_activity(app, reason)
        }
        Choice::Cancel => engine.cancel_intervention(app),
        Choice::Continue => engine.post_choice_continue(app, now),
        Choice::Quit => engine.post_choice_quit(app),
    }
}

pub fn run(action: ChoiceAction, resident: Option<&Resident>) -> CliResult {
    let mut engine = open_engine()?;
    restore(&mut engine, resident);
    let (choice, target, options) = action.into_parts();
    let app = AppId::new(target.app);
    let outcome = apply(&mut engine, choice, &app, timestamp(target.at), options)?;
    print_json(&outcome)
}
