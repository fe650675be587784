//! In-memory generation store: an arena of immutable snapshots plus a
//! single atomically-swapped active pointer.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::RwLock;

use crate::domain::{Generation, GenerationId, RecordMap};
use crate::error::StoreError;
use crate::port::store::{GenerationStore, RetentionPolicy};

struct Retained {
    generation: Arc<Generation>,
    /// When this generation stopped being active; `None` while active.
    superseded_at: Option<Instant>,
}

struct Inner {
    /// Oldest first; the last entry is the active generation.
    history: VecDeque<Retained>,
    next_id: GenerationId,
}

/// Store backed entirely by memory. Also used as the read path of the
/// durable store.
pub struct MemoryStore {
    inner: RwLock<Inner>,
    retention: RetentionPolicy,
}

impl MemoryStore {
    pub fn new(retention: RetentionPolicy) -> Self {
        let genesis = Arc::new(Generation::genesis());
        let mut history = VecDeque::new();
        history.push_back(Retained {
            generation: Arc::clone(&genesis),
            superseded_at: None,
        });
        Self {
            inner: RwLock::new(Inner {
                history,
                next_id: GenerationId::GENESIS.next(),
            }),
            retention,
        }
    }

    /// Seed the store with a generation restored from durable storage.
    pub fn with_restored(retention: RetentionPolicy, restored: Generation) -> Self {
        let next_id = restored.id.next();
        let mut history = VecDeque::new();
        history.push_back(Retained {
            generation: Arc::new(restored),
            superseded_at: None,
        });
        Self {
            inner: RwLock::new(Inner { history, next_id }),
            retention,
        }
    }

    /// Install a pre-built generation (restored or durably persisted by a
    /// wrapping store). Same conflict semantics as `commit`.
    pub(crate) fn install(
        &self,
        expected_parent: GenerationId,
        generation: Generation,
    ) -> Result<Arc<Generation>, StoreError> {
        let mut inner = self.inner.write();
        let active_id = inner.history.back().expect("store holds >= 1 generation").generation.id;
        if active_id != expected_parent {
            return Err(StoreError::Conflict {
                expected: expected_parent,
                actual: active_id,
            });
        }

        let generation = Arc::new(generation);
        inner.next_id = generation.id.next();
        if let Some(previous) = inner.history.back_mut() {
            previous.superseded_at = Some(Instant::now());
        }
        inner.history.push_back(Retained {
            generation: Arc::clone(&generation),
            superseded_at: None,
        });
        Ok(generation)
    }

    /// Ids of all retained generations, oldest first.
    pub fn retained_ids(&self) -> Vec<GenerationId> {
        self.inner
            .read()
            .history
            .iter()
            .map(|r| r.generation.id)
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}

impl GenerationStore for MemoryStore {
    fn active(&self) -> Arc<Generation> {
        let inner = self.inner.read();
        Arc::clone(&inner.history.back().expect("store holds >= 1 generation").generation)
    }

    fn read(&self, id: GenerationId) -> Option<Arc<Generation>> {
        let inner = self.inner.read();
        inner
            .history
            .iter()
            .find(|r| r.generation.id == id)
            .map(|r| Arc::clone(&r.generation))
    }

    fn commit(
        &self,
        expected_parent: GenerationId,
        records: RecordMap,
    ) -> Result<Arc<Generation>, StoreError> {
        let mut inner = self.inner.write();
        let active_id = inner.history.back().expect("store holds >= 1 generation").generation.id;
        if active_id != expected_parent {
            return Err(StoreError::Conflict {
                expected: expected_parent,
                actual: active_id,
            });
        }

        let generation = Arc::new(Generation {
            id: inner.next_id,
            created_at: Utc::now(),
            records,
        });
        inner.next_id = inner.next_id.next();

        let now = Instant::now();
        if let Some(previous) = inner.history.back_mut() {
            previous.superseded_at = Some(now);
        }
        inner.history.push_back(Retained {
            generation: Arc::clone(&generation),
            superseded_at: None,
        });

        Ok(generation)
    }

    fn prune(&self) -> usize {
        let mut inner = self.inner.write();
        let keep = self.retention.keep.max(1);
        let grace = self.retention.grace;
        let mut pruned = 0;

        while inner.history.len() > keep {
            let eligible = inner
                .history
                .front()
                .and_then(|r| r.superseded_at)
                .is_some_and(|at| at.elapsed() >= grace);
            if !eligible {
                break;
            }
            inner.history.pop_front();
            pruned += 1;
        }

        pruned
    }
}
