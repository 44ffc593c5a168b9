//! Persistence collaborator interface.
//!
//! The store owns merge logic; the collaborator only moves an opaque JSON
//! blob to and from its storage medium.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::Value;

/// Load/save transport for the serialized [`StoreState`](super::StoreState).
pub trait StatePersistence: Send + Sync + fmt::Debug {
    /// Load the most recently saved blob, or `None` if nothing was saved.
    fn load(&self) -> Result<Option<Value>, anyhow::Error>;

    /// Replace the saved blob.
    fn save(&self, state: &Value) -> Result<(), anyhow::Error>;

    /// Mirror one slot value under its per-slot key (for hosts that expose
    /// outfit values as chat variables). Default: no-op.
    fn mirror_variable(&self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        let _ = (key, value);
        Ok(())
    }
}

/// Process-local persistence. Also records mirrored variables.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    blob: Mutex<Option<Value>>,
    variables: Mutex<BTreeMap<String, String>>,
    saves: AtomicUsize,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing blob, as if it had been saved earlier.
    pub fn with_state(state: Value) -> Self {
        Self {
            blob: Mutex::new(Some(state)),
            ..Self::default()
        }
    }

    /// The currently saved blob.
    pub fn snapshot(&self) -> Option<Value> {
        self.blob.lock().clone()
    }

    /// Overwrite the saved blob out-of-band (e.g. another writer).
    pub fn replace(&self, state: Option<Value>) {
        *self.blob.lock() = state;
    }

    pub fn variable(&self, key: &str) -> Option<String> {
        self.variables.lock().get(key).cloned()
    }

    pub fn variables(&self) -> BTreeMap<String, String> {
        self.variables.lock().clone()
    }

    /// How many times `save` was called.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl StatePersistence for InMemoryPersistence {
    fn load(&self) -> Result<Option<Value>, anyhow::Error> {
        Ok(self.blob.lock().clone())
    }

    fn save(&self, state: &Value) -> Result<(), anyhow::Error> {
        *self.blob.lock() = Some(state.clone());
        self.saves.fetch_add(1, Ordering::Relaxed);
        log::debug!("InMemoryPersistence::save: #{}", self.save_count());
        Ok(())
    }

    fn mirror_variable(&self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        self.variables
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_before_save_is_none() {
        let persistence = InMemoryPersistence::new();
        assert!(persistence.load().unwrap().is_none());
        assert_eq!(persistence.save_count(), 0);
    }

    #[test]
    fn test_save_then_load() {
        let persistence = InMemoryPersistence::new();
        persistence.save(&json!({"a": 1})).unwrap();
        assert_eq!(persistence.load().unwrap(), Some(json!({"a": 1})));
        assert_eq!(persistence.save_count(), 1);
    }

    #[test]
    fn test_mirror_variable_recorded() {
        let persistence = InMemoryPersistence::new();
        persistence.mirror_variable("k", "v").unwrap();
        assert_eq!(persistence.variable("k").as_deref(), Some("v"));
    }
}
