//! Load/save of [`EngineState`] around every event.
//!
//! Loading never fails the caller: a missing document yields a fresh state,
//! and a corrupt one is logged and replaced with a fresh state. Losing a
//! timer early is preferable to blocking the user.

use std::cell::RefCell;

use tracing::{debug, warn};

use super::migrations::migrate_state;
use crate::error::{EngineError, Result};
use crate::state::{EngineState, STATE_SCHEMA_VERSION};

/// Backing store for the serialized engine state.
pub trait StateStore {
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, document: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

impl<T: StateStore + ?Sized> StateStore for &T {
    fn read(&self) -> Result<Option<String>> {
        (**self).read()
    }

    fn write(&self, document: &str) -> Result<()> {
        (**self).write(document)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// Process-local store, used by tests and by replay runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    document: RefCell<Option<String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: RefCell::new(Some(document.into())),
        }
    }

    pub fn document(&self) -> Option<String> {
        self.document.borrow().clone()
    }
}

impl StateStore for MemoryStateStore {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.document.borrow().clone())
    }

    fn write(&self, document: &str) -> Result<()> {
        *self.document.borrow_mut() = Some(document.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.document.borrow_mut() = None;
        Ok(())
    }
}

/// Decode a raw document, applying layout migrations first.
pub fn decode_state(document: &str) -> Result<EngineState, EngineError> {
    let mut value: serde_json::Value = serde_json::from_str(document)
        .map_err(|e| EngineError::StorageCorruption(e.to_string()))?;

    let report = migrate_state(&mut value);
    if !report.stripped_keys.is_empty() {
        warn!(
            keys = ?report.stripped_keys,
            from_version = report.from_version,
            "stripped transient UI fields from persisted state"
        );
    }

    let mut state: EngineState = serde_json::from_value(value)
        .map_err(|e| EngineError::StorageCorruption(e.to_string()))?;
    state.schema_version = STATE_SCHEMA_VERSION;
    Ok(state)
}

/// Load the engine state, falling back to `fresh()` when nothing usable is stored.
pub fn load_state<S, F>(store: &S, fresh: F) -> EngineState
where
    S: StateStore + ?Sized,
    F: FnOnce() -> EngineState,
{
    let document = match store.read() {
        Ok(Some(document)) => document,
        Ok(None) => {
            debug!("no persisted engine state; starting fresh");
            return fresh();
        }
        Err(e) => {
            warn!(error = %e, "failed to read engine state; starting fresh");
            return fresh();
        }
    };

    match decode_state(&document) {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, "discarding persisted engine state");
            fresh()
        }
    }
}

/// Persist the engine state.
///
/// # Errors
/// Returns an error if serialization or the backing store fails.
pub fn save_state<S: StateStore + ?Sized>(store: &S, state: &EngineState) -> Result<()> {
    let document = serde_json::to_string(state)?;
    store.write(&document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppId;
    use crate::timer::QuickTaskQuota;

    #[test]
    fn missing_document_yields_fresh_state() {
        let store = MemoryStateStore::new();
        let state = load_state(&store, || EngineState::with_quota(QuickTaskQuota::new(3)));
        assert_eq!(state.quota.remaining_uses(), 3);
    }

    #[test]
    fn corrupt_document_yields_fresh_state() {
        let store = MemoryStateStore::with_document("{not json");
        let state = load_state(&store, EngineState::default);
        assert_eq!(state, EngineState::default());

        let store = MemoryStateStore::with_document("{\"timers\": 42}");
        let state = load_state(&store, EngineState::default);
        assert_eq!(state, EngineState::default());
    }

    #[test]
    fn corrupt_document_reports_storage_corruption() {
        assert!(matches!(
            decode_state("42"),
            Err(EngineError::StorageCorruption(_))
        ));
    }

    #[test]
    fn save_then_load_preserves_state() {
        let store = MemoryStateStore::new();
        let mut state = EngineState::default();
        state.timers.set_quick_task(AppId::new("a"), 60_000, 0);
        state.last_meaningful_app = Some(AppId::new("a"));
        save_state(&store, &state).unwrap();

        let loaded = load_state(&store, EngineState::default);
        assert_eq!(loaded, state);
    }

    #[test]
    fn legacy_session_field_is_stripped_on_load() {
        let store = MemoryStateStore::with_document(
            r#"{"last_meaningful_app":"a","activeSession":{"kind":"QuickTask","app":"a"}}"#,
        );
        let state = load_state(&store, EngineState::default);
        assert_eq!(state.last_meaningful_app, Some(AppId::new("a")));

        save_state(&store, &state).unwrap();
        let saved = store.document().unwrap();
        assert!(!saved.contains("activeSession"));
        assert!(!saved.contains("QuickTask"));
    }
}
