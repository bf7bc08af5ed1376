//! Decision engine.
//!
//! The only component that issues UI commands. Every entry point runs the
//! same cycle:
//!
//! ```text
//! load EngineState -> classify / apply -> priority chain -> session transition
//!     -> save EngineState -> emit at most one UiCommand
//! ```
//!
//! The engine holds no clock and schedules nothing. Everything the next
//! decision needs comes from the state store, so a freshly constructed
//! engine (cold start after process death) decides exactly like one that
//! has seen the whole history. The session machine and boot channel are
//! process-local and start empty.
//!
//! Events are assumed to be delivered one at a time; two calls never
//! interleave their load/save cycles.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::{AppId, Timestamp};
use crate::classifier::{EventClassifier, SemanticEvent};
use crate::error::Result;
use crate::events::{MechanicalEvent, UiCommand};
use crate::priority::{evaluate, Decision, SuppressReason};
use crate::session::{BootChannel, Session, SessionKind, SessionMachine, SessionObserver};
use crate::state::{EngineState, ExpiredQuickTaskRecord};
use crate::storage::{load_state, save_state, Config, StateStore};
use crate::timer::{QuickTaskQuota, TimerKind};

/// Sink for outbound commands (the UI-surface launcher).
pub trait UiLauncher {
    fn dispatch(&mut self, command: &UiCommand);
}

/// Why an Alternative Activity ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityEnd {
    TimerCompleted,
    FinishedEarly,
}

/// Result of one engine step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fact: Option<SemanticEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<UiCommand>,
}

impl Outcome {
    fn command(command: Option<UiCommand>) -> Self {
        Self {
            command,
            ..Self::default()
        }
    }
}

/// What a booting surface must render, after the authority rule ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootOutcome {
    pub render: SessionKind,
    pub app: AppId,
    /// The engine's pending hand-off, if one was waiting.
    pub pending: Option<(SessionKind, AppId)>,
}

pub struct DecisionEngine<S: StateStore> {
    store: S,
    config: Config,
    classifier: EventClassifier,
    sessions: SessionMachine,
    boot: BootChannel,
    launcher: Option<Box<dyn UiLauncher>>,
}

impl<S: StateStore> DecisionEngine<S> {
    pub fn new(store: S, config: Config) -> Self {
        let classifier = EventClassifier::from_config(&config);
        Self {
            store,
            config,
            classifier,
            sessions: SessionMachine::new(),
            boot: BootChannel::default(),
            launcher: None,
        }
    }

    pub fn with_launcher(mut self, launcher: Box<dyn UiLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.sessions.subscribe(observer);
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Session {
        self.sessions.current()
    }

    /// Read the persisted state without changing it.
    pub fn state(&self) -> EngineState {
        self.load()
    }

    /// Whether the surface should be shown right now.
    pub fn is_surface_visible(&self) -> bool {
        let state = self.load();
        self.sessions.is_visible(state.last_meaningful_app.as_ref())
    }

    // ── Mechanical events ────────────────────────────────────────────

    /// Process one mechanical event.
    ///
    /// # Errors
    /// Returns an error only when the state cannot be saved; the surface is
    /// torn down in that case.
    pub fn handle(&mut self, event: &MechanicalEvent) -> Result<Outcome> {
        debug!(?event, "handling mechanical event");
        self.transact(|engine, state| match engine.classifier.classify(state, event) {
            Ok(fact) => engine.apply_fact(state, fact),
            Err(e) => {
                warn!(error = %e, "ignoring event");
                Outcome::default()
            }
        })
    }

    /// Process every timer that has run out by `now`, as if a
    /// `TimerExpired` fact had arrived for each. Used to catch up after
    /// the process was dead while timers fired.
    pub fn sweep(&mut self, now: Timestamp) -> Result<Vec<Outcome>> {
        let mut outcomes = Vec::new();
        let mut state = self.load();
        let expired = state.timers.take_expired(now);
        for (app, kind) in expired {
            let foreground_at_expiration = state.last_meaningful_app.clone();
            let fact = match kind {
                TimerKind::QuickTask => SemanticEvent::QuickTaskExpired {
                    app,
                    at: now,
                    foreground_at_expiration,
                },
                TimerKind::Intention => SemanticEvent::IntentionExpired {
                    app,
                    at: now,
                    foreground_at_expiration,
                },
            };
            outcomes.push(self.apply_fact(&mut state, fact));
        }
        self.commit(&state)?;
        for outcome in &outcomes {
            self.emit(outcome.command.as_ref());
        }
        Ok(outcomes)
    }

    // ── User choices ─────────────────────────────────────────────────

    /// The user took a Quick Task for `app`. Falls back to an Intervention
    /// when the quota turns out to be spent.
    pub fn accept_quick_task(&mut self, app: &AppId, now: Timestamp) -> Result<Outcome> {
        self.transact(|engine, state| {
            // A repeated accept while the grant is still running spends nothing.
            if let Some(timer) = state
                .timers
                .get(app, TimerKind::QuickTask)
                .filter(|t| t.is_valid(now))
            {
                info!(%app, remaining_ms = timer.remaining_ms(now), "quick task already running");
                return Outcome {
                    fact: None,
                    decision: Some(Decision::Suppress(SuppressReason::QuickTaskActive)),
                    command: engine.end_for(app),
                };
            }
            let policy = engine.config.quota_policy();
            if !state.quota.try_consume(now, &policy) {
                info!(%app, "quick task refused: quota spent");
                return engine.launch(Decision::StartIntervention, app);
            }
            let timer = state
                .timers
                .set_quick_task(app.clone(), engine.config.quick_task.duration_ms, now);
            state.remove_expired_record(app);
            info!(
                %app,
                expires_at = timer.expires_at,
                until = ?timer.expires_at_utc(),
                remaining_uses = state.quota.remaining_uses(),
                "quick task granted"
            );
            Outcome::command(engine.end_for(app))
        })
    }

    /// The user turned down the Quick Task offer and goes through the
    /// full intervention instead.
    pub fn decline_quick_task(&mut self, app: &AppId) -> Result<Outcome> {
        self.transact(|engine, _| engine.launch(Decision::StartIntervention, app))
    }

    /// The user committed to a bounded-use window for `app`.
    pub fn set_intention(&mut self, app: &AppId, duration_ms: u64, now: Timestamp) -> Result<Outcome> {
        self.transact(|engine, state| {
            let timer = state.timers.set_intention(app.clone(), duration_ms, now);
            info!(%app, expires_at = timer.expires_at, "intention set");
            Outcome::command(engine.end_for(app))
        })
    }

    pub fn start_alternative_activity(&mut self, app: &AppId) -> Result<Outcome> {
        self.transact(|engine, _| {
            let transition = engine
                .sessions
                .launch(SessionKind::AlternativeActivity, app.clone());
            Outcome::command(transition.map(|t| engine.post_boot(t.command())))
        })
    }

    pub fn finish_alternative_activity(&mut self, app: &AppId, reason: ActivityEnd) -> Result<Outcome> {
        self.transact(|engine, _| {
            info!(%app, ?reason, "alternative activity finished");
            Outcome::command(engine.end_for(app))
        })
    }

    pub fn cancel_intervention(&mut self, app: &AppId) -> Result<Outcome> {
        self.transact(|engine, _| Outcome::command(engine.end_for(app)))
    }

    /// The user wants more time after a Quick Task ran out.
    pub fn post_choice_continue(&mut self, app: &AppId, now: Timestamp) -> Result<Outcome> {
        self.transact(|engine, state| {
            state.remove_expired_record(app);
            let policy = engine.config.quota_policy();
            state.quota.refill_if_due(now, &policy);
            let decision = if state.quota.has_remaining() {
                Decision::ShowQuickTaskDialog
            } else {
                Decision::StartIntervention
            };
            engine.launch(decision, app)
        })
    }

    /// The user quits the app after a Quick Task ran out.
    pub fn post_choice_quit(&mut self, app: &AppId) -> Result<Outcome> {
        self.transact(|engine, state| {
            state.remove_expired_record(app);
            Outcome::command(engine.end_for(app))
        })
    }

    /// Restore the quota to its configured size.
    pub fn reset_quota(&mut self) -> Result<QuickTaskQuota> {
        let mut state = self.load();
        state.quota.reset(self.config.quick_task.max_uses);
        info!(remaining_uses = state.quota.remaining_uses(), "quota reset");
        self.commit(&state)?;
        Ok(state.quota)
    }

    // ── Surface lifecycle ────────────────────────────────────────────

    /// A surface booted with `(kind, app)`. The launch parameters always win
    /// over a resident session; the ephemeral hand-off is consumed.
    pub fn on_ui_boot(&mut self, kind: SessionKind, app: AppId) -> BootOutcome {
        let pending = self.boot.take();
        if let Some((pending_kind, pending_app)) = &pending {
            if *pending_kind != kind || *pending_app != app {
                debug!(?pending_kind, %pending_app, ?kind, %app, "boot differs from pending hand-off");
            }
        }
        self.sessions.reconcile_boot(kind, app.clone());
        BootOutcome {
            render: kind,
            app,
            pending,
        }
    }

    /// A surface reports that it is alive. With no session it must go.
    pub fn on_surface_resident(&mut self) -> Option<UiCommand> {
        if !self.sessions.current().is_none() {
            return None;
        }
        warn!("surface resident without a session; tearing down");
        let command = UiCommand::teardown();
        self.emit(Some(&command));
        Some(command)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn fresh_state(&self) -> EngineState {
        EngineState::with_quota(QuickTaskQuota::new(self.config.quick_task.max_uses))
    }

    fn load(&self) -> EngineState {
        load_state(&self.store, || self.fresh_state())
    }

    fn commit(&mut self, state: &EngineState) -> Result<()> {
        if let Err(e) = save_state(&self.store, state) {
            warn!(error = %e, "failed to save engine state; tearing down surface");
            self.boot.clear();
            if self.sessions.end().is_some() {
                self.emit(Some(&UiCommand::teardown()));
            }
            return Err(e);
        }
        Ok(())
    }

    fn transact<F>(&mut self, step: F) -> Result<Outcome>
    where
        F: FnOnce(&mut Self, &mut EngineState) -> Outcome,
    {
        let mut state = self.load();
        let outcome = step(self, &mut state);
        self.commit(&state)?;
        self.emit(outcome.command.as_ref());
        Ok(outcome)
    }

    fn emit(&mut self, command: Option<&UiCommand>) {
        let Some(command) = command else {
            return;
        };
        info!(action = ?command.action, kind = ?command.session_kind, app = ?command.app, "ui command");
        if let Some(launcher) = self.launcher.as_mut() {
            launcher.dispatch(command);
        }
    }

    fn apply_fact(&mut self, state: &mut EngineState, fact: SemanticEvent) -> Outcome {
        let (decision, command) = match &fact {
            SemanticEvent::Infrastructure { app } => {
                debug!(%app, "infrastructure surface; not an app switch");
                (None, None)
            }
            SemanticEvent::Foreground { app, at, .. } => self.on_foreground(state, app, *at),
            SemanticEvent::QuickTaskExpired {
                app,
                at,
                foreground_at_expiration,
            } => {
                state.timers.remove(app, TimerKind::QuickTask);
                match ExpiredQuickTaskRecord::capture(app, *at, foreground_at_expiration.as_ref()) {
                    Some(_) if !self.config.is_monitored(app) => {
                        debug!(%app, "quick task expired for an app no longer monitored");
                        (None, None)
                    }
                    Some(record) => {
                        info!(%app, "quick task expired in foreground");
                        state.insert_expired_record(app.clone(), record);
                        self.decide(state, app, *at)
                    }
                    None => {
                        debug!(%app, "quick task expired in background");
                        let command = if self.sessions.current().is(SessionKind::QuickTask, app) {
                            self.sessions.end().map(|t| t.command())
                        } else {
                            None
                        };
                        (None, command)
                    }
                }
            }
            SemanticEvent::IntentionExpired {
                app,
                at,
                foreground_at_expiration,
            } => {
                state.timers.remove(app, TimerKind::Intention);
                info!(%app, "intention expired");
                if foreground_at_expiration.as_ref() == Some(app) && self.config.is_monitored(app) {
                    self.decide(state, app, *at)
                } else {
                    (None, None)
                }
            }
            SemanticEvent::TimerArmed {
                app,
                kind,
                expires_at,
            } => {
                state.timers.arm(*kind, app.clone(), *expires_at);
                debug!(%app, ?kind, expires_at, "timer armed");
                (None, None)
            }
        };
        Outcome {
            fact: Some(fact),
            decision,
            command,
        }
    }

    fn on_foreground(
        &mut self,
        state: &mut EngineState,
        app: &AppId,
        now: Timestamp,
    ) -> (Option<Decision>, Option<UiCommand>) {
        state.last_meaningful_app = Some(app.clone());
        for dropped in state.invalidate_records_outside(app) {
            debug!(app = %dropped, "user left; expired record invalidated");
        }

        let current = self.sessions.current().clone();
        let leaving = current.app().is_some_and(|bound| bound != app);

        let decision = self
            .config
            .is_monitored(app)
            .then(|| evaluate(state, &current, app, now, &self.config.quota_policy()));

        // Same app, flow already on screen: resume it rather than switching role.
        if current.is_bound_to(app) {
            return (decision, None);
        }

        if let Some(kind) = decision.and_then(|d| d.session_kind()) {
            let command = self
                .sessions
                .launch(kind, app.clone())
                .map(|t| self.post_boot(t.command()));
            return (decision, command);
        }

        if leaving {
            if current.kind() == Some(SessionKind::AlternativeActivity) {
                debug!(bound = ?current.app(), %app, "alternative activity hidden");
                return (decision, None);
            }
            let command = self.sessions.end().map(|t| t.command());
            return (decision, command);
        }

        (decision, None)
    }

    fn decide(
        &mut self,
        state: &mut EngineState,
        app: &AppId,
        now: Timestamp,
    ) -> (Option<Decision>, Option<UiCommand>) {
        let current = self.sessions.current().clone();
        let decision = evaluate(state, &current, app, now, &self.config.quota_policy());
        let command = decision.session_kind().and_then(|kind| {
            self.sessions
                .launch(kind, app.clone())
                .map(|t| self.post_boot(t.command()))
        });
        (Some(decision), command)
    }

    fn launch(&mut self, decision: Decision, app: &AppId) -> Outcome {
        let command = decision.session_kind().and_then(|kind| {
            self.sessions
                .launch(kind, app.clone())
                .map(|t| self.post_boot(t.command()))
        });
        Outcome {
            fact: None,
            decision: Some(decision),
            command,
        }
    }

    /// End the session bound to `app`. A call naming an app while no
    /// session exists comes from an orphaned surface, which gets torn
    /// down. A session for a different app is left alone.
    fn end_for(&mut self, app: &AppId) -> Option<UiCommand> {
        let current = self.sessions.current();
        if current.is_bound_to(app) {
            return self.sessions.end().map(|t| t.command());
        }
        if current.is_none() {
            return Some(UiCommand::teardown());
        }
        debug!(%app, session = %current, "no session for app; nothing to end");
        None
    }

    fn post_boot(&mut self, command: UiCommand) -> UiCommand {
        if let (Some(kind), Some(app)) = (command.session_kind, command.app.clone()) {
            self.boot.post(kind, app);
        }
        command
    }
}
