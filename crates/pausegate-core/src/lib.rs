//! # Pausegate Core Library
//!
//! Decides whether, when and in what role an intervention surface appears
//! in front of a user who just opened a monitored app.
//!
//! ## Architecture
//!
//! - **Timer Registry**: per-app Quick-Task and Intention timers plus the
//!   global Quick-Task quota. Pure data; expiry is only ever discovered
//!   through externally delivered `TimerExpired` events.
//! - **Storage**: the durable `EngineState` is loaded and saved around every
//!   event (SQLite kv); configuration is TOML.
//! - **Classifier**: mechanical events -> semantic facts.
//! - **Priority chain**: one decision per app entry.
//! - **Session machine**: at most one UI session, process-local.
//! - **Decision engine**: wires it all together and emits UI commands.
//!
//! ## Key Components
//!
//! - [`DecisionEngine`]: orchestrator
//! - [`SessionMachine`]: Start / Replace / End
//! - [`TimerRegistry`]: per-app timers
//! - [`Config`]: application configuration

pub mod app;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod priority;
pub mod session;
pub mod state;
pub mod storage;
pub mod timer;

pub use app::{now_ms, AppId, Timestamp};
pub use classifier::{EventClassifier, SemanticEvent};
pub use engine::{ActivityEnd, BootOutcome, DecisionEngine, Outcome, UiLauncher};
pub use error::{ConfigError, CoreError, DatabaseError, EngineError};
pub use events::{EventType, MechanicalEvent, TimerArm, UiAction, UiCommand};
pub use priority::{evaluate, Decision, SuppressReason};
pub use session::{Session, SessionKind, SessionMachine, SessionObserver, Transition};
pub use state::{EngineState, ExpiredQuickTaskRecord};
pub use storage::{Config, Database, MemoryStateStore, StateStore};
pub use timer::{QuickTaskQuota, QuotaPolicy, TimerKind, TimerRegistry};
