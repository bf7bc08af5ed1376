//! Session state machine.
//!
//! A `Session` is the single record of which intervention-related UI role,
//! if any, is entitled to exist. A surface exists iff the session is not
//! `None`. The machine lives only in process memory: it is never part of
//! the persisted engine state.
//!
//! ## Transitions
//!
//! ```text
//! None --Start--> Active(kind, app)
//! Active --Replace--> Active(kind', app')   (single step, never via None)
//! Any --End--> None
//! ```
//!
//! Observers are notified once per transition with `(from, to)`, so a
//! `Replace` is never observable as passing through `None`.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::app::AppId;
use crate::error::EngineError;
use crate::events::UiCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
pub enum SessionKind {
    Intervention,
    QuickTask,
    AlternativeActivity,
    PostQuickTaskChoice,
}

/// The active UI role. Holds no flow-internal detail (countdown step,
/// selected cause, remaining time); that belongs to the screen itself.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", content = "app")]
pub enum Session {
    #[default]
    None,
    Intervention(AppId),
    QuickTask(AppId),
    AlternativeActivity(AppId),
    PostQuickTaskChoice(AppId),
}

impl Session {
    pub fn active(kind: SessionKind, app: AppId) -> Self {
        match kind {
            SessionKind::Intervention => Session::Intervention(app),
            SessionKind::QuickTask => Session::QuickTask(app),
            SessionKind::AlternativeActivity => Session::AlternativeActivity(app),
            SessionKind::PostQuickTaskChoice => Session::PostQuickTaskChoice(app),
        }
    }

    pub fn kind(&self) -> Option<SessionKind> {
        match self {
            Session::None => None,
            Session::Intervention(_) => Some(SessionKind::Intervention),
            Session::QuickTask(_) => Some(SessionKind::QuickTask),
            Session::AlternativeActivity(_) => Some(SessionKind::AlternativeActivity),
            Session::PostQuickTaskChoice(_) => Some(SessionKind::PostQuickTaskChoice),
        }
    }

    pub fn app(&self) -> Option<&AppId> {
        match self {
            Session::None => None,
            Session::Intervention(app)
            | Session::QuickTask(app)
            | Session::AlternativeActivity(app)
            | Session::PostQuickTaskChoice(app) => Some(app),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Session::None)
    }

    pub fn is_bound_to(&self, app: &AppId) -> bool {
        self.app() == Some(app)
    }

    pub fn is(&self, kind: SessionKind, app: &AppId) -> bool {
        self.kind() == Some(kind) && self.is_bound_to(app)
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind(), self.app()) {
            (Some(kind), Some(app)) => write!(f, "{kind:?}({app})"),
            _ => f.write_str("None"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransitionOp {
    Start,
    Replace,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub op: TransitionOp,
    pub from: Session,
    pub to: Session,
}

impl Transition {
    /// The launcher command that makes the surface match `to`.
    pub fn command(&self) -> UiCommand {
        match (self.op, self.to.kind(), self.to.app()) {
            (TransitionOp::Start, Some(kind), Some(app)) => UiCommand::launch(kind, app.clone()),
            (TransitionOp::Replace, Some(kind), Some(app)) => {
                UiCommand::replace(kind, app.clone())
            }
            _ => UiCommand::teardown(),
        }
    }
}

/// Receives every session change, in order.
pub trait SessionObserver {
    fn on_session_changed(&mut self, from: &Session, to: &Session);
}

#[derive(Default)]
pub struct SessionMachine {
    current: Session,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl fmt::Debug for SessionMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionMachine")
            .field("current", &self.current)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn current(&self) -> &Session {
        &self.current
    }

    /// Whether the surface should currently be shown given the meaningful
    /// foreground app. An Alternative Activity is hidden, not destroyed,
    /// while the user is in another app.
    pub fn is_visible(&self, foreground: Option<&AppId>) -> bool {
        match &self.current {
            Session::None => false,
            Session::AlternativeActivity(app) => foreground == Some(app),
            _ => true,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a session. Legal only while no session exists.
    pub fn start(&mut self, kind: SessionKind, app: AppId) -> Result<Transition, EngineError> {
        if let (Some(active), Some(bound)) = (self.current.kind(), self.current.app()) {
            return Err(EngineError::SessionConflict {
                active,
                app: bound.clone(),
            });
        }
        Ok(self.apply(TransitionOp::Start, Session::active(kind, app)))
    }

    /// Swap kind and app of the active session in a single step.
    pub fn replace(&mut self, kind: SessionKind, app: AppId) -> Result<Transition, EngineError> {
        if self.current.is_none() {
            return Err(EngineError::NoActiveSession { requested: kind });
        }
        Ok(self.apply(TransitionOp::Replace, Session::active(kind, app)))
    }

    /// End whatever session exists. Returns `None` if there was none.
    pub fn end(&mut self) -> Option<Transition> {
        if self.current.is_none() {
            return None;
        }
        Some(self.apply(TransitionOp::End, Session::None))
    }

    /// Make `(kind, app)` the active session: start it, or, when another
    /// session is resident, recover the conflict by replacing it. Returns
    /// `None` when that session is already active.
    pub fn launch(&mut self, kind: SessionKind, app: AppId) -> Option<Transition> {
        if self.current.is(kind, &app) {
            return None;
        }
        match self.start(kind, app.clone()) {
            Ok(transition) => Some(transition),
            Err(conflict) => {
                warn!(error = %conflict, "replacing resident session");
                self.replace(kind, app).ok()
            }
        }
    }

    /// Authority rule: the app and kind a surface was launched with always
    /// win over whatever session is resident in memory.
    pub fn reconcile_boot(&mut self, kind: SessionKind, app: AppId) -> Option<Transition> {
        if self.current.is(kind, &app) {
            return None;
        }
        if !self.current.is_none() {
            info!(resident = %self.current, %app, ?kind, "launch command overrides resident session");
        }
        self.launch(kind, app)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn apply(&mut self, op: TransitionOp, to: Session) -> Transition {
        let from = std::mem::replace(&mut self.current, to.clone());
        info!(?op, %from, %to, "session transition");
        for observer in &mut self.observers {
            observer.on_session_changed(&from, &to);
        }
        Transition { op, from, to }
    }
}

/// Ephemeral hand-off from the engine to a surface that has not booted yet
/// ("next boot should render this"). Lives in process memory only, so a
/// restart clears it.
#[derive(Debug, Default)]
pub struct BootChannel {
    pending: Option<(SessionKind, AppId)>,
}

impl BootChannel {
    pub fn post(&mut self, kind: SessionKind, app: AppId) {
        self.pending = Some((kind, app));
    }

    pub fn take(&mut self) -> Option<(SessionKind, AppId)> {
        self.pending.take()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}
