//! Priority-chain evaluation.
//!
//! Given the app being entered and the current durable state, produce
//! exactly one decision. Rules run in fixed order and the first match wins:
//!
//! 1. Quick-Task timer valid for the app            -> Suppress
//! 2. Alternative Activity running for the app      -> Suppress
//! 3. Intention timer valid for the app             -> Suppress
//! 4. Expired Quick Task captured in this app       -> ShowPostQuickTaskChoice
//! 5. Quota remaining                               -> ShowQuickTaskDialog
//! 6. Otherwise                                     -> StartIntervention
//!
//! Rules 1-3 are permission already granted. Rule 4 resolves the aftermath
//! of a spent grant before a fresh one is offered.

use serde::Serialize;
use tracing::debug;

use crate::app::{AppId, Timestamp};
use crate::error::EngineError;
use crate::session::{Session, SessionKind};
use crate::state::EngineState;
use crate::timer::{QuotaPolicy, TimerKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    QuickTaskActive,
    AlternativeActivityRunning,
    IntentionActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Suppress(SuppressReason),
    ShowQuickTaskDialog,
    StartIntervention,
    ShowPostQuickTaskChoice,
}

impl Decision {
    /// The session a positive decision asks for.
    pub fn session_kind(&self) -> Option<SessionKind> {
        match self {
            Decision::Suppress(_) => None,
            Decision::ShowQuickTaskDialog => Some(SessionKind::QuickTask),
            Decision::StartIntervention => Some(SessionKind::Intervention),
            Decision::ShowPostQuickTaskChoice => Some(SessionKind::PostQuickTaskChoice),
        }
    }

    pub fn is_suppress(&self) -> bool {
        matches!(self, Decision::Suppress(_))
    }
}

/// Run the priority chain for `app` at `now`.
///
/// Takes the state mutably for two narrow reasons: a stale expired record
/// for `app` is deleted on the way through, and a due quota refill is
/// applied before the quota is read.
pub fn evaluate(
    state: &mut EngineState,
    session: &Session,
    app: &AppId,
    now: Timestamp,
    policy: &QuotaPolicy,
) -> Decision {
    if state.timers.is_kind_valid(app, TimerKind::QuickTask, now) {
        debug!(%app, "suppress: quick task active");
        return Decision::Suppress(SuppressReason::QuickTaskActive);
    }

    if session.is(SessionKind::AlternativeActivity, app) {
        debug!(%app, "suppress: alternative activity running");
        return Decision::Suppress(SuppressReason::AlternativeActivityRunning);
    }

    if state.timers.is_kind_valid(app, TimerKind::Intention, now) {
        debug!(%app, "suppress: intention active");
        return Decision::Suppress(SuppressReason::IntentionActive);
    }

    match check_expired_record(state, app) {
        Ok(true) => return Decision::ShowPostQuickTaskChoice,
        Ok(false) => {}
        Err(stale) => {
            debug!(error = %stale, "discarding expired record");
            state.remove_expired_record(app);
        }
    }

    state.quota.refill_if_due(now, policy);
    if state.quota.has_remaining() {
        Decision::ShowQuickTaskDialog
    } else {
        Decision::StartIntervention
    }
}

/// `Ok(true)` if `app` has a live expired record, `Ok(false)` if it has
/// none, `Err(StaleExpiredRecord)` if the user is no longer where the
/// record was captured.
fn check_expired_record(state: &EngineState, app: &AppId) -> Result<bool, EngineError> {
    let Some(record) = state.expired_record(app) else {
        return Ok(false);
    };
    let captured = record.foreground_app_at_expiration();
    let still_there = record.expired_while_foreground()
        && captured == app
        && state.last_meaningful_app.as_ref() == Some(app);
    if still_there {
        Ok(true)
    } else {
        Err(EngineError::StaleExpiredRecord {
            app: app.clone(),
            captured: captured.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ExpiredQuickTaskRecord;
    use crate::timer::QuickTaskQuota;

    fn app(id: &str) -> AppId {
        AppId::new(id)
    }

    fn state_with_quota(uses: u32) -> EngineState {
        EngineState::with_quota(QuickTaskQuota::new(uses))
    }

    fn eval(state: &mut EngineState, session: &Session, id: &str, now: Timestamp) -> Decision {
        evaluate(state, session, &app(id), now, &QuotaPolicy::default())
    }

    #[test]
    fn quota_available_offers_quick_task() {
        let mut state = state_with_quota(1);
        assert_eq!(eval(&mut state, &Session::None, "a", 0), Decision::ShowQuickTaskDialog);
    }

    #[test]
    fn empty_quota_starts_intervention() {
        let mut state = state_with_quota(0);
        assert_eq!(eval(&mut state, &Session::None, "a", 0), Decision::StartIntervention);
    }

    #[test]
    fn quick_task_timer_beats_empty_quota() {
        let mut state = state_with_quota(0);
        state.timers.set_quick_task(app("a"), 60_000, 0);
        assert_eq!(
            eval(&mut state, &Session::None, "a", 30_000),
            Decision::Suppress(SuppressReason::QuickTaskActive)
        );
    }

    #[test]
    fn alternative_activity_suppresses_only_its_app() {
        let mut state = state_with_quota(0);
        let session = Session::AlternativeActivity(app("a"));
        assert_eq!(
            eval(&mut state, &session, "a", 0),
            Decision::Suppress(SuppressReason::AlternativeActivityRunning)
        );
        assert_eq!(eval(&mut state, &session, "b", 0), Decision::StartIntervention);
    }

    #[test]
    fn intention_window() {
        let mut state = state_with_quota(0);
        state.timers.set_intention(app("a"), 300_000, 0);
        assert_eq!(
            eval(&mut state, &Session::None, "a", 100_000),
            Decision::Suppress(SuppressReason::IntentionActive)
        );
        assert_eq!(
            eval(&mut state, &Session::None, "a", 400_000),
            Decision::StartIntervention
        );
    }

    #[test]
    fn expired_record_outranks_quota() {
        let mut state = state_with_quota(5);
        state.last_meaningful_app = Some(app("a"));
        let record = ExpiredQuickTaskRecord::capture(&app("a"), 61_000, Some(&app("a"))).unwrap();
        state.insert_expired_record(app("a"), record);
        assert_eq!(
            eval(&mut state, &Session::None, "a", 62_000),
            Decision::ShowPostQuickTaskChoice
        );
        // Evaluation does not consume the record.
        assert!(state.expired_record(&app("a")).is_some());
    }

    #[test]
    fn stale_record_is_deleted_and_chain_falls_through() {
        let mut state = state_with_quota(1);
        let record = ExpiredQuickTaskRecord::capture(&app("a"), 61_000, Some(&app("a"))).unwrap();
        state.insert_expired_record(app("a"), record);
        state.last_meaningful_app = Some(app("b"));

        assert_eq!(
            eval(&mut state, &Session::None, "a", 62_000),
            Decision::ShowQuickTaskDialog
        );
        assert!(state.expired_record(&app("a")).is_none());
    }

    #[test]
    fn due_refill_applies_before_quota_check() {
        let policy = QuotaPolicy {
            max_uses: 1,
            refill_window_ms: Some(1_000),
        };
        let mut state = state_with_quota(1);
        assert!(state.quota.try_consume(0, &policy));
        assert_eq!(
            evaluate(&mut state, &Session::None, &app("a"), 500, &policy),
            Decision::StartIntervention
        );
        assert_eq!(
            evaluate(&mut state, &Session::None, &app("a"), 1_500, &policy),
            Decision::ShowQuickTaskDialog
        );
    }

    #[test]
    fn decision_maps_to_session_kind() {
        assert_eq!(Decision::StartIntervention.session_kind(), Some(SessionKind::Intervention));
        assert_eq!(
            Decision::Suppress(SuppressReason::IntentionActive).session_kind(),
            None
        );
    }
}
