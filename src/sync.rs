//! Sync reconciler - drains the pending queue against the remote store.
//!
//! Runs on every reconnect. Each pending change is attempted independently:
//! one failure never aborts the batch. After all attempts settle, the queue
//! holds exactly the failed subset, persisted for the next cycle. The retry
//! policy is deliberately unbounded - no backoff, no attempt ceiling - and a
//! change stays queued until a cycle confirms it.

use crate::{
    cache::LocalCacheStore,
    errors::Result,
    notify::Notifier,
    queue::PendingChangeQueue,
    remote::RemoteStore,
};
use tracing::{info, warn};

/// What one reconcile cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Changes attempted this cycle
    pub attempted: usize,
    /// Changes confirmed and dropped from the queue
    pub synced: usize,
    /// Changes that failed and remain queued
    pub failed: usize,
}

/// Replays the pending queue against the remote store.
///
/// A missing user identifier makes this a no-op: nothing is attempted and the
/// queue is left untouched. Sync events go to the notifier only when there is
/// work to do, gated by `alerts`.
pub async fn reconcile<R: RemoteStore, N: Notifier>(
    queue: &mut PendingChangeQueue,
    cache: &LocalCacheStore,
    remote: &R,
    user_id: Option<&str>,
    notifier: &N,
    alerts: bool,
) -> Result<SyncOutcome> {
    let Some(user_id) = user_id else {
        return Ok(SyncOutcome::default());
    };
    if queue.is_empty() {
        return Ok(SyncOutcome::default());
    }

    let changes = queue.drain();
    let attempted = changes.len();
    info!("Sync started: {} pending changes.", attempted);
    if alerts {
        notifier.notify("Sync started", &format!("{attempted} changes to sync"), None);
    }

    let mut failures = Vec::new();
    for change in changes {
        match remote.apply_change(user_id, &change).await {
            Ok(()) => {}
            Err(e) => {
                warn!(
                    "Sync of {:?} {} failed, keeping queued: {}",
                    change.operation, change.path, e
                );
                failures.push(change);
            }
        }
    }

    let failed = failures.len();
    let synced = attempted - failed;
    queue.replace(failures);
    queue.persist(cache).await?;

    if failed == 0 {
        info!("Sync completed: {} changes confirmed.", synced);
        if alerts {
            notifier.notify("Sync completed", &format!("{synced} changes synced"), None);
        }
    } else {
        warn!("Sync failed for {} of {} changes.", failed, attempted);
        if alerts {
            notifier.notify(
                "Sync failed",
                &format!("{failed} of {attempted} changes still pending"),
                None,
            );
        }
    }

    Ok(SyncOutcome {
        attempted,
        synced,
        failed,
    })
}
