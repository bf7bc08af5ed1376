//! Mechanical event classification.
//!
//! Turns `{type, app, timestamp}` into a semantic fact. The classifier reads
//! the engine state but never mutates it; the engine applies the fact.
//!
//! - Foreground changes are split into infrastructure (notification shade,
//!   dialer, permission prompts) and meaningful switches. Infrastructure is
//!   treated as if no foreground change happened.
//! - Timer expiries are resolved to a kind by the registry, never by the
//!   event. The foreground app at expiry is captured here, once.

use std::collections::HashSet;

use serde::Serialize;

use crate::app::{AppId, Timestamp};
use crate::error::EngineError;
use crate::events::{EventType, MechanicalEvent};
use crate::state::EngineState;
use crate::storage::Config;
use crate::timer::TimerKind;

/// Slack allowed between the mechanical layer's clock and the stored expiry.
pub const EXPIRY_TOLERANCE_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "fact", rename_all = "snake_case")]
pub enum SemanticEvent {
    /// A transient OS surface came to the front. Not an app switch.
    Infrastructure { app: AppId },
    /// The user is now in `app`.
    Foreground {
        app: AppId,
        previous: Option<AppId>,
        at: Timestamp,
    },
    QuickTaskExpired {
        app: AppId,
        at: Timestamp,
        foreground_at_expiration: Option<AppId>,
    },
    IntentionExpired {
        app: AppId,
        at: Timestamp,
        foreground_at_expiration: Option<AppId>,
    },
    TimerArmed {
        app: AppId,
        kind: TimerKind,
        expires_at: Timestamp,
    },
}

#[derive(Debug, Clone, Default)]
pub struct EventClassifier {
    infrastructure: HashSet<String>,
}

impl EventClassifier {
    pub fn new<I, S>(infrastructure: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            infrastructure: infrastructure.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.infrastructure.packages.iter().cloned())
    }

    pub fn is_infrastructure(&self, app: &AppId) -> bool {
        self.infrastructure.contains(app.as_str())
    }

    /// Classify a mechanical event against the current state.
    ///
    /// # Errors
    /// `UnknownTimerKind` when an expiry or arm event cannot be matched to a
    /// timer kind. Callers treat it as a no-op.
    pub fn classify(
        &self,
        state: &EngineState,
        event: &MechanicalEvent,
    ) -> Result<SemanticEvent, EngineError> {
        let app = event.app.clone();
        match event.event_type {
            EventType::ForegroundChanged => {
                if self.is_infrastructure(&app) {
                    return Ok(SemanticEvent::Infrastructure { app });
                }
                Ok(SemanticEvent::Foreground {
                    app,
                    previous: state.last_meaningful_app.clone(),
                    at: event.timestamp,
                })
            }
            EventType::TimerExpired => {
                let probe = event.timestamp.saturating_add(EXPIRY_TOLERANCE_MS);
                let kind = state
                    .timers
                    .expired_kind(&app, probe)
                    .ok_or_else(|| EngineError::UnknownTimerKind { app: app.clone() })?;
                // Time of truth: whatever was in front right now.
                let foreground_at_expiration = state.last_meaningful_app.clone();
                Ok(match kind {
                    TimerKind::QuickTask => SemanticEvent::QuickTaskExpired {
                        app,
                        at: event.timestamp,
                        foreground_at_expiration,
                    },
                    TimerKind::Intention => SemanticEvent::IntentionExpired {
                        app,
                        at: event.timestamp,
                        foreground_at_expiration,
                    },
                })
            }
            EventType::TimerSet => {
                let arm = event
                    .timer
                    .ok_or_else(|| EngineError::UnknownTimerKind { app: app.clone() })?;
                Ok(SemanticEvent::TimerArmed {
                    app,
                    kind: arm.kind,
                    expires_at: arm.expires_at,
                })
            }
        }
    }
}
