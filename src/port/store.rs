//! Generation store port.
//!
//! The store holds immutable [`Generation`] snapshots plus a single active
//! pointer. Readers copy the active `Arc` once per call and never block on a
//! concurrent commit; only the reconciliation engine writes.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Generation, GenerationId, RecordMap};
use crate::error::StoreError;

/// How many generations are kept for audit/rollback, and how long a pruned
/// candidate must have been inactive before it is dropped.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// Number of most-recent generations retained.
    pub keep: usize,
    /// Grace period before an out-of-window generation becomes collectable,
    /// bounding how long a reader may hold a snapshot reference.
    pub grace: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep: 16,
            grace: Duration::from_secs(60),
        }
    }
}

/// Versioned persistence of instrument records, one active generation at a
/// time.
pub trait GenerationStore: Send + Sync {
    /// The currently active generation. Never blocks on a concurrent commit.
    fn active(&self) -> Arc<Generation>;

    /// A retained generation by id, if still within the retention window.
    fn read(&self, id: GenerationId) -> Option<Arc<Generation>>;

    /// Atomically commit `records` as the next generation.
    ///
    /// All-or-nothing: on success the new generation is fully active; on any
    /// failure the parent stays fully active. `expected_parent` must be the
    /// active generation the record set was built from; if another commit
    /// landed in between, the call fails with [`StoreError::Conflict`] and
    /// the caller rebases and retries.
    fn commit(
        &self,
        expected_parent: GenerationId,
        records: RecordMap,
    ) -> Result<Arc<Generation>, StoreError>;

    /// Drop generations outside the retention window. Returns how many were
    /// collected.
    fn prune(&self) -> usize;
}
