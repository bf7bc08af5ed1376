use serde::{Deserialize, Serialize};

use crate::app::{AppId, Timestamp};
use crate::session::SessionKind;
use crate::timer::TimerKind;

/// Mechanical event type. Carries no meaning beyond "foreground changed",
/// "a timer keyed by this app fired" or "a timer was armed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    ForegroundChanged,
    TimerExpired,
    TimerSet,
}

/// Timer details echoed with a `TimerSet` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerArm {
    pub kind: TimerKind,
    pub expires_at: Timestamp,
}

/// Inbound event from the foreground/timer collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanicalEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub app: AppId,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerArm>,
}

impl MechanicalEvent {
    pub fn foreground_changed(app: impl Into<AppId>, timestamp: Timestamp) -> Self {
        Self {
            event_type: EventType::ForegroundChanged,
            app: app.into(),
            timestamp,
            timer: None,
        }
    }

    pub fn timer_expired(app: impl Into<AppId>, timestamp: Timestamp) -> Self {
        Self {
            event_type: EventType::TimerExpired,
            app: app.into(),
            timestamp,
            timer: None,
        }
    }

    pub fn timer_set(
        app: impl Into<AppId>,
        timestamp: Timestamp,
        kind: TimerKind,
        expires_at: Timestamp,
    ) -> Self {
        Self {
            event_type: EventType::TimerSet,
            app: app.into(),
            timestamp,
            timer: Some(TimerArm { kind, expires_at }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiAction {
    Launch,
    Replace,
    Teardown,
}

/// Outbound command to the UI-surface launcher.
///
/// A surface must exist iff the last command was `Launch` or `Replace`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiCommand {
    pub action: UiAction,
    pub session_kind: Option<SessionKind>,
    pub app: Option<AppId>,
}

impl UiCommand {
    pub fn launch(kind: SessionKind, app: AppId) -> Self {
        Self {
            action: UiAction::Launch,
            session_kind: Some(kind),
            app: Some(app),
        }
    }

    pub fn replace(kind: SessionKind, app: AppId) -> Self {
        Self {
            action: UiAction::Replace,
            session_kind: Some(kind),
            app: Some(app),
        }
    }

    pub fn teardown() -> Self {
        Self {
            action: UiAction::Teardown,
            session_kind: None,
            app: None,
        }
    }
}
