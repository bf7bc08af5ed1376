//! Per-app Quick-Task and Intention timers.
//!
//! The registry is pure data. It owns no clock and never polls: expiry is a
//! comparison against a caller-supplied `now`, and the caller only asks when
//! the mechanical layer has delivered a `TimerExpired` fact.
//!
//! Timers are keyed by app and kind. Setting a timer overwrites the previous
//! timer of the same kind for the same app; nothing done for one app reads
//! or touches another app's entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::app::{AppId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    QuickTask,
    Intention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub expires_at: Timestamp,
}

impl Timer {
    pub fn is_valid(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }

    pub fn remaining_ms(&self, now: Timestamp) -> u64 {
        self.expires_at.saturating_sub(now)
    }

    pub fn expires_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.expires_at as i64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRegistry {
    #[serde(default)]
    quick_tasks: BTreeMap<AppId, Timer>,
    #[serde(default)]
    intentions: BTreeMap<AppId, Timer>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn set_quick_task(&mut self, app: AppId, duration_ms: u64, now: Timestamp) -> Timer {
        self.arm(TimerKind::QuickTask, app, now.saturating_add(duration_ms))
    }

    pub fn set_intention(&mut self, app: AppId, duration_ms: u64, now: Timestamp) -> Timer {
        self.arm(TimerKind::Intention, app, now.saturating_add(duration_ms))
    }

    /// Arm a timer with an absolute expiry, replacing any timer of the same
    /// kind for `app`.
    pub fn arm(&mut self, kind: TimerKind, app: AppId, expires_at: Timestamp) -> Timer {
        let timer = Timer { expires_at };
        self.map_mut(kind).insert(app, timer);
        timer
    }

    pub fn remove(&mut self, app: &AppId, kind: TimerKind) -> Option<Timer> {
        self.map_mut(kind).remove(app)
    }

    /// Remove and return every timer that has expired at `now`.
    pub fn take_expired(&mut self, now: Timestamp) -> Vec<(AppId, TimerKind)> {
        let mut expired = Vec::new();
        for kind in [TimerKind::QuickTask, TimerKind::Intention] {
            let map = self.map_mut(kind);
            let apps: Vec<AppId> = map
                .iter()
                .filter(|(_, timer)| !timer.is_valid(now))
                .map(|(app, _)| app.clone())
                .collect();
            for app in apps {
                map.remove(&app);
                expired.push((app, kind));
            }
        }
        expired
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn get(&self, app: &AppId, kind: TimerKind) -> Option<Timer> {
        self.map(kind).get(app).copied()
    }

    pub fn is_kind_valid(&self, app: &AppId, kind: TimerKind, now: Timestamp) -> bool {
        self.get(app, kind).is_some_and(|t| t.is_valid(now))
    }

    /// True if any timer for `app` is still running at `now`.
    pub fn is_valid(&self, app: &AppId, now: Timestamp) -> bool {
        self.is_kind_valid(app, TimerKind::QuickTask, now)
            || self.is_kind_valid(app, TimerKind::Intention, now)
    }

    /// The kind of `app`'s timer that has run out by `now`, if any.
    /// Quick Task is checked first.
    pub fn expired_kind(&self, app: &AppId, now: Timestamp) -> Option<TimerKind> {
        [TimerKind::QuickTask, TimerKind::Intention]
            .into_iter()
            .find(|&kind| self.get(app, kind).is_some_and(|t| !t.is_valid(now)))
    }

    pub fn is_empty(&self) -> bool {
        self.quick_tasks.is_empty() && self.intentions.is_empty()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn map(&self, kind: TimerKind) -> &BTreeMap<AppId, Timer> {
        match kind {
            TimerKind::QuickTask => &self.quick_tasks,
            TimerKind::Intention => &self.intentions,
        }
    }

    fn map_mut(&mut self, kind: TimerKind) -> &mut BTreeMap<AppId, Timer> {
        match kind {
            TimerKind::QuickTask => &mut self.quick_tasks,
            TimerKind::Intention => &mut self.intentions,
        }
    }
}
