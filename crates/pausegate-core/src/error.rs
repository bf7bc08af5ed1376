//! Core error types for pausegate-core.
//!
//! `EngineError` is the decision engine's own taxonomy. Every variant is
//! recovered inside the engine and logged; none of them is ever allowed to
//! leave a UI surface stuck on screen.

use std::path::PathBuf;
use thiserror::Error;

use crate::app::AppId;
use crate::session::SessionKind;

/// Core error type for pausegate-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Decision engine errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Recoverable conditions raised while processing a single event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// `Start` was requested while a session already exists.
    #[error("session conflict: {active:?} session for '{app}' is already active")]
    SessionConflict { active: SessionKind, app: AppId },

    /// `Replace` was requested while no session exists.
    #[error("cannot replace into {requested:?}: no active session")]
    NoActiveSession { requested: SessionKind },

    /// A timer expiry arrived for an app with no matching registry entry.
    #[error("no timer registered for '{app}'; expiry ignored")]
    UnknownTimerKind { app: AppId },

    /// An expired Quick-Task record whose captured foreground app is no
    /// longer the current foreground app.
    #[error("expired quick task record for '{app}' captured in '{captured}' is stale")]
    StaleExpiredRecord { app: AppId, captured: AppId },

    /// The persisted engine state could not be decoded.
    #[error("persisted engine state is corrupt: {0}")]
    StorageCorruption(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
