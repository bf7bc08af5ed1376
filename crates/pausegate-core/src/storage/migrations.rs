//! Persisted state layout migrations.
//!
//! The state document carries a `schema_version`. Documents written before
//! versioning (version 0) may hold fields describing transient UI status,
//! which must never survive a restart; they are stripped here before the
//! document is decoded.

use serde_json::Value;

use crate::state::STATE_SCHEMA_VERSION;

/// Top-level keys that describe what was on screen rather than durable facts.
pub const LEGACY_EPHEMERAL_KEYS: &[&str] = &[
    "currentSession",
    "current_session",
    "activeSession",
    "active_session",
    "session",
    "isQuickTaskPending",
    "is_quick_task_pending",
    "pendingPostQuickTaskChoice",
    "pending_post_quick_task_choice",
    "postQuickTaskChoice",
    "post_quick_task_choice",
    "uiState",
    "ui_state",
    "interventionInProgress",
    "intervention_in_progress",
    "surfaceVisible",
    "surface_visible",
];

/// What a migration pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub stripped_keys: Vec<String>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.from_version == STATE_SCHEMA_VERSION && self.stripped_keys.is_empty()
    }
}

/// Bring a raw state document up to the current layout in place.
///
/// Non-object documents are left untouched; decoding rejects them later.
pub fn migrate_state(doc: &mut Value) -> MigrationReport {
    let Some(obj) = doc.as_object_mut() else {
        return MigrationReport::default();
    };

    let from_version = obj
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;

    let mut report = MigrationReport {
        from_version,
        stripped_keys: Vec::new(),
    };

    // Stripping runs regardless of version: a current-version document
    // carrying one of these keys was written by something else.
    for key in LEGACY_EPHEMERAL_KEYS {
        if obj.remove(*key).is_some() {
            report.stripped_keys.push((*key).to_string());
        }
    }

    if from_version < 1 {
        migrate_v1(obj);
    }

    report
}

/// Migration v1: stamp the versioned layout.
fn migrate_v1(obj: &mut serde_json::Map<String, Value>) {
    obj.insert("schema_version".to_string(), Value::from(1u32));
}
