//! In-memory store, used by tests and single-process deployments that
//! don't need drafts to survive a restart.

use std::collections::HashMap;
use std::sync::Mutex;

use civdraft_draft::Draft;
use civdraft_protocol::DraftId;

use crate::{SessionStore, StoreError};

/// A `HashMap` of drafts behind a mutex.
///
/// Records are cloned in and out, so callers never hold a reference into
/// the map across an await point.
#[derive(Debug, Default)]
pub struct MemoryStore {
    drafts: Mutex<HashMap<DraftId, Draft>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored drafts.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<DraftId, Draft>> {
        // A panic while holding the lock can't leave a half-written
        // record: every write is a single insert.
        self.drafts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, id: &DraftId) -> Result<Option<Draft>, StoreError> {
        Ok(self.lock().get(id).cloned())
    }

    fn put(&self, draft: &Draft) -> Result<(), StoreError> {
        self.lock().insert(draft.id.clone(), draft.clone());
        Ok(())
    }

    fn exists(&self, id: &DraftId) -> Result<bool, StoreError> {
        Ok(self.lock().contains_key(id))
    }
}
