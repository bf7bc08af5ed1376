pub mod choice;
pub mod config;
pub mod event;
pub mod quota;
pub mod replay;
pub mod state;
pub mod surface;

use std::str::FromStr;

use pausegate_core::{
    now_ms, AppId, Config, Database, DecisionEngine, SessionKind, StateStore, Timestamp,
};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// A surface still on screen from an earlier process, as `KIND:APP`
/// (e.g. `QuickTask:com.example`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resident {
    pub kind: SessionKind,
    pub app: AppId,
}

impl FromStr for Resident {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, app) = s
            .split_once(':')
            .ok_or_else(|| format!("expected KIND:APP, got '{s}'"))?;
        if app.is_empty() {
            return Err(format!("missing app in '{s}'"));
        }
        let kind = serde_json::from_value(serde_json::Value::String(kind.to_string()))
            .map_err(|_| {
                format!(
                    "unknown session kind '{kind}' \
                     (Intervention, QuickTask, AlternativeActivity, PostQuickTaskChoice)"
                )
            })?;
        Ok(Self {
            kind,
            app: AppId::new(app),
        })
    }
}

/// Cold-start an engine over the on-disk store, as a fresh process would.
pub fn open_engine() -> Result<DecisionEngine<Database>, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    Ok(DecisionEngine::new(db, config))
}

/// Hand the resident surface back to a freshly started engine.
pub fn restore<S: StateStore>(engine: &mut DecisionEngine<S>, resident: Option<&Resident>) {
    if let Some(resident) = resident {
        let boot = engine.on_ui_boot(resident.kind, resident.app.clone());
        tracing::debug!(render = ?boot.render, app = %boot.app, "resident surface restored");
    }
}

/// `--at` when given, wall clock otherwise.
pub fn timestamp(at: Option<Timestamp>) -> Timestamp {
    at.unwrap_or_else(now_ms)
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
