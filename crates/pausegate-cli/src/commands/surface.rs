use clap::Subcommand;
use serde::Serialize;

use super::{open_engine, print_json, restore, CliResult, Resident};

#[derive(Subcommand)]
pub enum SurfaceAction {
    /// A surface booted with these launch parameters
    Boot {
        /// What the surface was launched as, `KIND:APP`
        launch: Resident,
    },
    /// A surface reports that it is alive; pass `--resident` with what it shows
    Resident,
}

#[derive(Serialize)]
struct ResidentReply {
    command: Option<pausegate_core::UiCommand>,
}

pub fn run(action: SurfaceAction, resident: Option<&Resident>) -> CliResult {
    let mut engine = open_engine()?;
    match action {
        SurfaceAction::Boot { launch } => {
            let boot = engine.on_ui_boot(launch.kind, launch.app);
            print_json(&boot)
        }
        SurfaceAction::Resident => {
            restore(&mut engine, resident);
            let command = engine.on_surface_resident();
            print_json(&ResidentReply { command })
        }
    }
}
