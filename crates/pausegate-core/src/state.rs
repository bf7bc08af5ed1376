//! Durable engine state.
//!
//! `EngineState` holds only facts that stay true regardless of which UI
//! process is alive: timers, the quota counter, expired-task records and
//! the last meaningful foreground app. Anything describing what is on
//! screen right now lives in [`crate::session`] and is never serialized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::app::{AppId, Timestamp};
use crate::timer::{QuickTaskQuota, TimerRegistry};

/// Current persisted layout version.
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Frozen record of a Quick Task that ran out while its app was in front.
///
/// Fields are captured once at expiry and are read-only afterwards; the
/// only permitted change is deleting the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiredQuickTaskRecord {
    expired_at: Timestamp,
    expired_while_foreground: bool,
    foreground_app_at_expiration: AppId,
}

impl ExpiredQuickTaskRecord {
    /// Capture the record for `app` given the foreground app observed at
    /// the instant of expiry. Returns `None` when the user was elsewhere:
    /// a background expiry leaves no record.
    pub fn capture(
        app: &AppId,
        expired_at: Timestamp,
        foreground_at_expiration: Option<&AppId>,
    ) -> Option<Self> {
        let foreground = foreground_at_expiration?;
        if foreground != app {
            return None;
        }
        Some(Self {
            expired_at,
            expired_while_foreground: true,
            foreground_app_at_expiration: foreground.clone(),
        })
    }

    pub fn expired_at(&self) -> Timestamp {
        self.expired_at
    }

    pub fn expired_while_foreground(&self) -> bool {
        self.expired_while_foreground
    }

    pub fn foreground_app_at_expiration(&self) -> &AppId {
        &self.foreground_app_at_expiration
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub timers: TimerRegistry,
    #[serde(default)]
    pub quota: QuickTaskQuota,
    #[serde(default)]
    expired_records: BTreeMap<AppId, ExpiredQuickTaskRecord>,
    #[serde(default)]
    pub last_meaningful_app: Option<AppId>,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::with_quota(QuickTaskQuota::default())
    }
}

impl EngineState {
    pub fn with_quota(quota: QuickTaskQuota) -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            timers: TimerRegistry::new(),
            quota,
            expired_records: BTreeMap::new(),
            last_meaningful_app: None,
        }
    }

    pub fn expired_record(&self, app: &AppId) -> Option<&ExpiredQuickTaskRecord> {
        self.expired_records.get(app)
    }

    pub fn insert_expired_record(&mut self, app: AppId, record: ExpiredQuickTaskRecord) {
        self.expired_records.insert(app, record);
    }

    pub fn remove_expired_record(&mut self, app: &AppId) -> Option<ExpiredQuickTaskRecord> {
        self.expired_records.remove(app)
    }

    /// Drop every record captured in an app other than `foreground`.
    /// Returns the apps whose records were dropped.
    pub fn invalidate_records_outside(&mut self, foreground: &AppId) -> Vec<AppId> {
        let stale: Vec<AppId> = self
            .expired_records
            .iter()
            .filter(|(_, r)| r.foreground_app_at_expiration() != foreground)
            .map(|(app, _)| app.clone())
            .collect();
        for app in &stale {
            self.expired_records.remove(app);
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(id: &str) -> AppId {
        AppId::new(id)
    }

    #[test]
    fn capture_requires_matching_foreground() {
        assert!(ExpiredQuickTaskRecord::capture(&app("a"), 10, Some(&app("b"))).is_none());
        assert!(ExpiredQuickTaskRecord::capture(&app("a"), 10, None).is_none());

        let record = ExpiredQuickTaskRecord::capture(&app("a"), 10, Some(&app("a"))).unwrap();
        assert!(record.expired_while_foreground());
        assert_eq!(record.foreground_app_at_expiration(), &app("a"));
        assert_eq!(record.expired_at(), 10);
    }

    #[test]
    fn invalidation_keeps_records_for_current_foreground() {
        let mut state = EngineState::default();
        for id in ["a", "b"] {
            let record = ExpiredQuickTaskRecord::capture(&app(id), 0, Some(&app(id))).unwrap();
            state.insert_expired_record(app(id), record);
        }
        let dropped = state.invalidate_records_outside(&app("a"));
        assert_eq!(dropped, vec![app("b")]);
        assert!(state.expired_record(&app("a")).is_some());
        assert!(state.expired_record(&app("b")).is_none());
    }

    #[test]
    fn default_state_is_current_version() {
        let state = EngineState::default();
        assert_eq!(state.schema_version, STATE_SCHEMA_VERSION);
        assert!(state.timers.is_empty());
        assert!(state.last_meaningful_app.is_none());
    }
}
