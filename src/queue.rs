//! Pending change queue - durable record of unconfirmed mutations.
//!
//! Every mutation made while offline lands here in FIFO order and survives
//! restarts through the local cache. There is deliberately no deduplication,
//! merging, or cross-change dependency tracking: changes replay in enqueue
//! order, each independently. The queue is persisted before any remote
//! attempt, so a reload mid-sync resumes verbatim on the next reconnect.

use crate::{
    cache::{CacheSlotKey, LocalCacheStore},
    connectivity::ConnectivityMonitor,
    errors::Result,
    models::{ChangeOp, PendingChange},
};
use tracing::{debug, info};

/// Ordered queue of not-yet-confirmed mutations.
#[derive(Debug, Default)]
pub struct PendingChangeQueue {
    changes: Vec<PendingChange>,
}

impl PendingChangeQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores the queue from its cache slot, empty if never persisted.
    pub async fn restore(cache: &LocalCacheStore) -> Result<Self> {
        let changes: Vec<PendingChange> = cache
            .read_slot(CacheSlotKey::PendingChanges)
            .await?
            .unwrap_or_default();
        if !changes.is_empty() {
            info!("Restored {} pending changes from cache.", changes.len());
        }
        Ok(Self { changes })
    }

    /// Persists the current queue contents to the cache slot.
    pub async fn persist(&self, cache: &LocalCacheStore) -> Result<()> {
        cache
            .write_slot(CacheSlotKey::PendingChanges, &self.changes)
            .await
    }

    /// Routes a mutation based on connectivity.
    ///
    /// Returns `true` while online: nothing is queued and the caller performs
    /// the remote write directly. Returns `false` while offline: the change
    /// has been recorded and the caller must not attempt the write.
    pub fn enqueue(
        &mut self,
        monitor: &ConnectivityMonitor,
        path: String,
        payload: serde_json::Value,
        operation: ChangeOp,
    ) -> bool {
        if monitor.is_online() {
            return true;
        }

        debug!("Queued offline {:?} for {}.", operation, path);
        self.changes.push(PendingChange {
            path,
            payload,
            operation,
            queued_at: chrono::Utc::now(),
        });
        false
    }

    /// Records a change unconditionally, regardless of connectivity. Used
    /// when an online remote write fails and must be deferred.
    pub fn push(&mut self, change: PendingChange) {
        self.changes.push(change);
    }

    /// Takes the full FIFO list, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<PendingChange> {
        std::mem::take(&mut self.changes)
    }

    /// Removes one confirmed change, matched by path and queue timestamp.
    pub fn remove(&mut self, change: &PendingChange) {
        self.changes
            .retain(|c| !(c.path == change.path && c.queued_at == change.queued_at));
    }

    /// Replaces the queue contents, preserving the given order. The
    /// reconciler uses this to keep exactly the failed subset.
    pub fn replace(&mut self, changes: Vec<PendingChange>) {
        self.changes = changes;
    }

    /// Number of queued changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Read-only view of the queued changes, oldest first.
    #[must_use]
    pub fn changes(&self) -> &[PendingChange] {
        &self.changes
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enqueue_online_does_not_queue() {
        let monitor = ConnectivityMonitor::new(true);
        let mut queue = PendingChangeQueue::new();

        let proceed = queue.enqueue(
            &monitor,
            "projects/p1".to_string(),
            json!({ "title": "x" }),
            ChangeOp::Update,
        );
        assert!(proceed);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueue_offline_queues_in_fifo_order() {
        let monitor = ConnectivityMonitor::new(false);
        let mut queue = PendingChangeQueue::new();

        for i in 0..3 {
            let proceed = queue.enqueue(
                &monitor,
                format!("projects/p{i}"),
                json!({ "i": i }),
                ChangeOp::Add,
            );
            assert!(!proceed);
        }

        assert_eq!(queue.len(), 3);
        let drained = queue.drain();
        assert!(queue.is_empty());
        let paths: Vec<_> = drained.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["projects/p0", "projects/p1", "projects/p2"]);
    }

    #[test]
    fn test_remove_matches_single_change() {
        let monitor = ConnectivityMonitor::new(false);
        let mut queue = PendingChangeQueue::new();
        queue.enqueue(&monitor, "projects/a".to_string(), json!({}), ChangeOp::Add);
        queue.enqueue(&monitor, "projects/b".to_string(), json!({}), ChangeOp::Add);

        let target = queue.changes()[0].clone();
        queue.remove(&target);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.changes()[0].path, "projects/b");
    }

    #[tokio::test]
    async fn test_persist_and_restore_round_trip() -> Result<()> {
        let cache = LocalCacheStore::in_memory().await?;
        let monitor = ConnectivityMonitor::new(false);

        let mut queue = PendingChangeQueue::new();
        queue.enqueue(
            &monitor,
            "journalEntries/j1".to_string(),
            json!({ "content": "note" }),
            ChangeOp::Add,
        );
        queue.enqueue(
            &monitor,
            "projects/p1".to_string(),
            json!({ "title": "new" }),
            ChangeOp::Update,
        );
        queue.persist(&cache).await?;

        let restored = PendingChangeQueue::restore(&cache).await?;
        assert_eq!(restored.changes(), queue.changes());
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_with_no_slot_is_empty() -> Result<()> {
        let cache = LocalCacheStore::in_memory().await?;
        let restored = PendingChangeQueue::restore(&cache).await?;
        assert!(restored.is_empty());
        Ok(())
    }
}
