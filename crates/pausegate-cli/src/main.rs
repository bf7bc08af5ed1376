use clap::{Parser, Subcommand};
use pausegate_core::{logging, Config};

mod commands;

#[derive(Parser)]
#[command(name = "pausegate-cli", version, about = "Pausegate CLI")]
struct Cli {
    /// Log filter for stderr output (overrides `logging.level`)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Surface still on screen from an earlier call, `KIND:APP`
    #[arg(long, global = true, value_name = "KIND:APP")]
    resident: Option<commands::Resident>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed one mechanical event to the engine
    Event {
        #[command(subcommand)]
        action: commands::event::EventAction,
    },
    /// Report a user choice made on the intervention surface
    Choice {
        #[command(subcommand)]
        action: commands::choice::ChoiceAction,
    },
    /// Replay a JSONL stream of events and choices through one engine
    Replay(commands::replay::ReplayArgs),
    /// Report surface lifecycle to the engine
    Surface {
        #[command(subcommand)]
        action: commands::surface::SurfaceAction,
    },
    /// Inspect or reset the persisted engine state
    State {
        #[command(subcommand)]
        action: commands::state::StateAction,
    },
    /// Quick Task quota management
    Quota {
        #[command(subcommand)]
        action: commands::quota::QuotaAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut logging_config = Config::load_or_default().logging;
    if let Some(level) = cli.log_level {
        logging_config.level = level;
    }
    logging::init(&logging_config);

    let resident = cli.resident.as_ref();
    let result = match cli.command {
        Commands::Event { action } => commands::event::run(action, resident),
        Commands::Choice { action } => commands::choice::run(action, resident),
        Commands::Replay(args) => commands::replay::run(args, resident),
        Commands::Surface { action } => commands::surface::run(action, resident),
        Commands::State { action } => commands::state::run(action),
        Commands::Quota { action } => commands::quota::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
