//! Shared, single-writer access to the state store.
//!
//! Every mutation runs under one lock acquisition: reconcile the in-memory
//! tree with a fresh persisted read, apply the change to the reconciled
//! tree, save it, then publish it as the new in-memory state. No reader ever
//! observes a half-merged tree, and a failed save leaves memory untouched.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use super::persistence::StatePersistence;
use super::store::StateStore;
use crate::utilities::errors::{OutfitError, Result};

/// Cloneable handle over one [`StateStore`] and its persistence collaborator.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<Mutex<StateStore>>,
    persistence: Arc<dyn StatePersistence>,
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("persistence", &self.persistence)
            .finish_non_exhaustive()
    }
}

impl StoreHandle {
    /// A handle with empty in-memory state. Nothing is read until the
    /// first mutation or [`reload`](Self::reload).
    pub fn new(persistence: Arc<dyn StatePersistence>) -> Self {
        Self {
            store: Arc::new(Mutex::new(StateStore::new())),
            persistence,
        }
    }

    /// A handle primed from persistence.
    pub fn open(persistence: Arc<dyn StatePersistence>) -> Result<Self> {
        let handle = Self::new(persistence);
        handle.reload()?;
        Ok(handle)
    }

    pub fn persistence(&self) -> &Arc<dyn StatePersistence> {
        &self.persistence
    }

    /// Reconcile memory with the persisted blob without writing anything.
    pub fn reload(&self) -> Result<()> {
        let mut guard = self.store.lock();
        if let Some(persisted) = self.persistence.load().map_err(OutfitError::Persistence)? {
            let mut working = guard.clone();
            working.reconcile(&persisted)?;
            *guard = working;
        }
        Ok(())
    }

    /// Read the current in-memory state.
    pub fn read<R>(&self, f: impl FnOnce(&StateStore) -> R) -> R {
        let guard = self.store.lock();
        f(&guard)
    }

    /// Apply a mutation and persist it as one unit.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut StateStore) -> R) -> Result<R> {
        let mut guard = self.store.lock();

        let mut working = guard.clone();
        if let Some(persisted) = self.persistence.load().map_err(OutfitError::Persistence)? {
            working.reconcile(&persisted)?;
        }

        let result = f(&mut working);
        working.state_mut().saved_at = Some(Utc::now());

        let blob = working.to_value()?;
        self.persistence
            .save(&blob)
            .map_err(OutfitError::Persistence)?;
        log::debug!("StoreHandle::mutate: state saved");

        *guard = working;
        Ok(result)
    }

    /// Clear all outfit state, presets, and settings, in memory and in
    /// persistence. No merge: the empty tree replaces whatever was saved.
    pub fn wipe_all(&self) -> Result<()> {
        let mut guard = self.store.lock();
        let mut empty = StateStore::new();
        empty.state_mut().saved_at = Some(Utc::now());
        self.persistence
            .save(&empty.to_value()?)
            .map_err(OutfitError::Persistence)?;
        *guard = empty;
        log::info!("StoreHandle::wipe_all: all outfit data cleared");
        Ok(())
    }

    /// Forward a per-slot value to the collaborator's variable mirror.
    /// Failures are logged, not returned.
    pub fn mirror_variable(&self, key: &str, value: &str) {
        if let Err(e) = self.persistence.mirror_variable(key, value) {
            log::warn!("StoreHandle: failed to mirror variable '{}': {}", key, e);
        }
    }
}
