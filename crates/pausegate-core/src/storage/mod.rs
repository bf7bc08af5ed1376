mod config;
pub mod database;
pub mod migrations;
pub mod state_store;

pub use config::{
    AlternativeActivityConfig, Config, InfrastructureConfig, IntentionConfig, LoggingConfig,
    QuickTaskConfig,
};
pub use database::Database;
pub use state_store::{load_state, save_state, MemoryStateStore, StateStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `PAUSEGATE_DATA_DIR` wins when set. Otherwise `~/.config/pausegate[-dev]/`
/// based on `PAUSEGATE_ENV` (set it to `dev` for a development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("PAUSEGATE_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("PAUSEGATE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pausegate-dev")
            } else {
                base_dir.join("pausegate")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
