//! Lease reaper and resume sweep
//!
//! Runs on an interval. Each sweep returns items whose lease expired to
//! `pending` (or gives up on them after too many attempts) and queues every
//! import that is still `pending`. The first sweep runs at startup, which is
//! how imports interrupted by a restart get resumed.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::store::{BatchStore, StoreError};
use super::worker::{BatchQueue, Enqueued};

/// What one sweep did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub requeued_items: usize,
    pub abandoned_items: usize,
    pub queued_imports: usize,
}

pub struct Reaper {
    store: Arc<dyn BatchStore>,
    queue: BatchQueue,
    max_attempts: i32,
}

impl Reaper {
    pub fn new(store: Arc<dyn BatchStore>, queue: BatchQueue, max_attempts: i32) -> Self {
        Self {
            store,
            queue,
            max_attempts,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn sweep(&self) -> Result<SweepReport, StoreError> {
        let mut report = SweepReport::default();

        for reclaimed in self.store.reclaim_expired(self.max_attempts).await? {
            if reclaimed.requeued {
                report.requeued_items += 1;
                tracing::warn!(
                    item_id = %reclaimed.item_id,
                    import_id = %reclaimed.import_id,
                    "Lease expired, item returned to pending"
                );
            } else {
                report.abandoned_items += 1;
                tracing::warn!(
                    item_id = %reclaimed.item_id,
                    import_id = %reclaimed.import_id,
                    "Lease expired too many times, item marked as error"
                );
            }
        }

        for import_id in self.store.pending_imports().await? {
            match self.queue.enqueue(import_id) {
                Ok(Enqueued::Queued) => report.queued_imports += 1,
                Ok(Enqueued::AlreadyQueued) => {}
                Ok(Enqueued::Deferred) => break,
                Err(e) => {
                    tracing::warn!(%import_id, error = %e, "Could not queue pending import");
                    break;
                }
            }
        }

        if report != SweepReport::default() {
            tracing::info!(
                requeued_items = report.requeued_items,
                abandoned_items = report.abandoned_items,
                queued_imports = report.queued_imports,
                "Sweep finished"
            );
        }

        Ok(report)
    }

    /// Sweep now and then every `period` until aborted
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep().await {
                    tracing::error!(error = %e, "Sweep failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::memory::InMemoryBatchStore;
    use crate::batch::store::{ImportStore, ItemStore};
    use crate::batch::types::{Claim, ItemStatus};
    use venue_common::SearchType;

    async fn pending_import(store: &InMemoryBatchStore, names: &[&str]) -> uuid::Uuid {
        let import = store.create_import("venues.csv", SearchType::Venue).await.unwrap();
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        store.create_items(import.id, &names).await.unwrap();
        import.id
    }

    #[tokio::test]
    async fn test_sweep_queues_pending_imports() {
        let store = Arc::new(InMemoryBatchStore::new());
        let first = pending_import(&store, &["A"]).await;
        let done = pending_import(&store, &[]).await;
        store.mark_completed(done).await.unwrap();

        let (queue, receiver) = BatchQueue::channel(8);
        let reaper = Reaper::new(store.clone(), queue.clone(), 3);

        let report = reaper.sweep().await.unwrap();
        assert_eq!(report.queued_imports, 1);
        assert_eq!(receiver.next().await, Some(first));

        // Still pending, so the next sweep queues it again.
        assert_eq!(reaper.sweep().await.unwrap().queued_imports, 1);
    }

    #[tokio::test]
    async fn test_sweep_recovers_expired_lease() {
        let store = Arc::new(InMemoryBatchStore::new());
        let import_id = pending_import(&store, &["Stuck Hall"]).await;
        store
            .claim_next(import_id, "dead-worker", Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let (queue, receiver) = BatchQueue::channel(8);
        let report = Reaper::new(store.clone(), queue, 3).sweep().await.unwrap();

        assert_eq!(report.requeued_items, 1);
        assert_eq!(report.queued_imports, 1);
        assert_eq!(receiver.next().await, Some(import_id));

        match store
            .claim_next(import_id, "live-worker", Duration::from_secs(60))
            .await
            .unwrap()
        {
            Claim::Claimed(item) => assert_eq!(item.attempts, 2),
            other => panic!("expected a claim, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sweep_abandons_after_max_attempts() {
        let store = Arc::new(InMemoryBatchStore::new());
        let import_id = pending_import(&store, &["Cursed Manor"]).await;
        store
            .claim_next(import_id, "dead-worker", Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let (queue, _receiver) = BatchQueue::channel(8);
        let report = Reaper::new(store.clone(), queue, 1).sweep().await.unwrap();

        assert_eq!(report.abandoned_items, 1);
        let items = store.list_items(import_id).await.unwrap();
        assert_eq!(items[0].status, ItemStatus::Error);
        assert!(items[0].error_message.is_some());
    }
}
