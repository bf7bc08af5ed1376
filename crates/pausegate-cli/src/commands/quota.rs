use clap::Subcommand;

use super::{open_engine, print_json, CliResult};

#[derive(Subcommand)]
pub enum QuotaAction {
    /// Restore the Quick Task quota to `quick_task.max_uses`
    Reset,
}

pub fn run(action: QuotaAction) -> CliResult {
    let mut engine = open_engine()?;
    match action {
        QuotaAction::Reset => {
            let quota = engine.reset_quota()?;
            print_json(&quota)?;
        }
    }
    Ok(())
}
