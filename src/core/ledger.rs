/// Completion ledger — recently completed catalog quests, most recent first.

use std::sync::{Arc, Mutex};

use crate::core::store::{KeyValueStore, MemoryStore, StoreError};
use crate::schema::quest::QuestOrigin;

/// Store key holding the JSON array of completed ids.
pub const LEDGER_KEY: &str = "completed_quest_ids";

/// Capped recency list that keeps the catalog path from repeating itself.
///
/// Only catalog ids are ever recorded. Mutations are serialized through an
/// internal lock so concurrent sessions cannot break the cap.
pub struct CompletionLedger {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
    ids: Mutex<Vec<String>>,
}

impl CompletionLedger {
    /// Open the ledger persisted in `store`. Unreadable state starts empty.
    pub fn open(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        let mut ids = match store.get(LEDGER_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!("Discarding corrupt completion ledger: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read completion ledger: {}", e);
                Vec::new()
            }
        };
        ids.truncate(capacity);

        Self {
            store,
            capacity,
            ids: Mutex::new(ids),
        }
    }

    pub fn in_memory(capacity: usize) -> Self {
        Self::open(Arc::new(MemoryStore::new()), capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_recently_completed(&self, id: &str) -> bool {
        self.lock().iter().any(|recent| recent == id)
    }

    /// Record a completion and persist the ledger.
    ///
    /// Generative and default quests are ignored. The in-memory ledger is
    /// updated even when persisting fails.
    pub fn mark_completed(&self, origin: &QuestOrigin) -> Result<(), StoreError> {
        let QuestOrigin::Catalog(id) = origin else {
            return Ok(());
        };

        // Persist under the lock so stored snapshots land in mutation order.
        let mut ids = self.lock();
        ids.insert(0, id.clone());
        ids.truncate(self.capacity);
        let snapshot = serde_json::to_string(&*ids)?;
        self.store.set(LEDGER_KEY, &snapshot)
    }

    /// Ids currently in the ledger, most recent first.
    pub fn recent(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.ids.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for CompletionLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionLedger")
            .field("capacity", &self.capacity)
            .field("ids", &*self.lock())
            .finish()
    }
}
