use clap::Subcommand;
use pausegate_core::{Database, StateStore};

use super::{open_engine, print_json, CliResult};

#[derive(Subcommand)]
pub enum StateAction {
    /// Print the persisted engine state as JSON
    Show,
    /// Drop the persisted state; the next event starts fresh
    Reset,
}

pub fn run(action: StateAction) -> CliResult {
    match action {
        StateAction::Show => {
            let engine = open_engine()?;
            print_json(&engine.state())?;
        }
        StateAction::Reset => {
            let db = Database::open()?;
            db.clear()?;
            println!("{{\"type\": \"state_reset\"}}");
        }
    }
    Ok(())
}
