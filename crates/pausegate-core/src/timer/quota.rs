//! Global Quick-Task quota.
//!
//! One counter shared by every monitored app. The reset cadence is not the
//! engine's decision: it is either an explicit `reset` or, when configured,
//! a fixed refill window.

use serde::{Deserialize, Serialize};

use crate::app::Timestamp;

pub const DEFAULT_MAX_USES: u32 = 1;

/// Refill policy taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub max_uses: u32,
    /// When set, the quota refills to `max_uses` once this long has passed
    /// since the window opened.
    pub refill_window_ms: Option<u64>,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            max_uses: DEFAULT_MAX_USES,
            refill_window_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickTaskQuota {
    remaining_uses: u32,
    /// Start of the current refill window (epoch ms).
    #[serde(default)]
    window_started_at: Option<Timestamp>,
}

impl Default for QuickTaskQuota {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_USES)
    }
}

impl QuickTaskQuota {
    pub fn new(remaining_uses: u32) -> Self {
        Self {
            remaining_uses,
            window_started_at: None,
        }
    }

    pub fn remaining_uses(&self) -> u32 {
        self.remaining_uses
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining_uses > 0
    }

    pub fn window_started_at(&self) -> Option<Timestamp> {
        self.window_started_at
    }

    /// Restore the quota if the configured window has elapsed.
    /// Returns true if a refill happened.
    pub fn refill_if_due(&mut self, now: Timestamp, policy: &QuotaPolicy) -> bool {
        let (Some(window), Some(started)) = (policy.refill_window_ms, self.window_started_at)
        else {
            return false;
        };
        if now.saturating_sub(started) < window {
            return false;
        }
        self.remaining_uses = policy.max_uses;
        self.window_started_at = None;
        true
    }

    /// Consume one use. The refill check and the decrement happen in the
    /// same call so a grant never observes a half-updated counter.
    pub fn try_consume(&mut self, now: Timestamp, policy: &QuotaPolicy) -> bool {
        self.refill_if_due(now, policy);
        if self.remaining_uses == 0 {
            return false;
        }
        self.remaining_uses -= 1;
        if self.window_started_at.is_none() {
            self.window_started_at = Some(now);
        }
        true
    }

    pub fn reset(&mut self, max_uses: u32) {
        self.remaining_uses = max_uses;
        self.window_started_at = None;
    }
}
