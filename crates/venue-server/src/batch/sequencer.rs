//! Drains one import item by item
//!
//! A drain repeats claim -> invoke -> settle until the import has nothing
//! left to claim, then marks the import completed. Each item is settled
//! before the next claim runs, so at most one item per import is ever in
//! flight and items go out in creation order.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

use super::store::{BatchStore, StoreError};
use super::types::{Claim, Item, ItemStatus};
use crate::config::BatchConfig;
use crate::search::{SearchFailure, SearchInvoker};

/// Timing knobs for one sequencer
#[derive(Debug, Clone, Copy)]
pub struct SequencerSettings {
    pub search_timeout: Duration,
    pub lease: Duration,
    pub heartbeat_interval: Duration,
}

impl From<&BatchConfig> for SequencerSettings {
    fn from(config: &BatchConfig) -> Self {
        Self {
            search_timeout: config.search_timeout(),
            lease: config.lease(),
            heartbeat_interval: config.heartbeat_interval(),
        }
    }
}

/// What one call to [`Sequencer::drain`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub dispatched: usize,
    pub completed: usize,
    pub failed: usize,
    /// `true` when this drain marked the import completed; `false` when it
    /// stopped because another worker owns the in-flight item
    pub import_completed: bool,
}

/// How a dispatched item was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settled {
    Completed,
    Failed,
    /// The lease was taken away while the search ran; the item is someone
    /// else's now
    Lost,
}

/// Dispatches the items of an import one at a time
#[derive(Clone)]
pub struct Sequencer {
    store: Arc<dyn BatchStore>,
    invoker: Arc<dyn SearchInvoker>,
    settings: SequencerSettings,
    owner: String,
}

impl Sequencer {
    pub fn new(
        store: Arc<dyn BatchStore>,
        invoker: Arc<dyn SearchInvoker>,
        settings: SequencerSettings,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            store,
            invoker,
            settings,
            owner: owner.into(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Dispatch every pending item of the import, then complete it
    ///
    /// Search failures settle the item as `error` and the drain moves on.
    /// Store failures abort the drain; the import stays `pending`.
    #[tracing::instrument(skip(self), fields(owner = %self.owner))]
    pub async fn drain(&self, import_id: Uuid) -> Result<DrainReport, StoreError> {
        let mut report = DrainReport::default();

        loop {
            let claim = self
                .store
                .claim_next(import_id, &self.owner, self.settings.lease)
                .await?;

            match claim {
                Claim::Claimed(item) => {
                    report.dispatched += 1;
                    match self.dispatch(item).await? {
                        Settled::Completed => report.completed += 1,
                        Settled::Failed => report.failed += 1,
                        Settled::Lost => {}
                    }
                }
                Claim::Busy => {
                    tracing::debug!("Another worker has an item of this import in flight");
                    return Ok(report);
                }
                Claim::Drained => {
                    let import = self.store.mark_completed(import_id).await?;
                    report.import_completed = true;
                    tracing::info!(
                        completed_at = ?import.completed_at,
                        dispatched = report.dispatched,
                        completed = report.completed,
                        failed = report.failed,
                        "Import drained"
                    );
                    return Ok(report);
                }
            }
        }
    }

    /// Run the search for one claimed item and record the outcome
    #[tracing::instrument(
        skip(self, item),
        fields(item_id = %item.id, venue_name = %item.venue_name, attempt = item.attempts)
    )]
    async fn dispatch(&self, item: Item) -> Result<Settled, StoreError> {
        let heartbeat = self.start_heartbeat(item.id);

        let result = tokio::time::timeout(
            self.settings.search_timeout,
            self.invoker.invoke(&item.venue_name, item.search_type),
        )
        .await
        .unwrap_or_else(|_| {
            Err(SearchFailure::timeout(
                &item.venue_name,
                self.settings.search_timeout.as_secs(),
            ))
        });

        heartbeat.abort();

        let settled = match result {
            Ok(outcome) => self
                .store
                .settle(
                    item.id,
                    &self.owner,
                    ItemStatus::Completed,
                    None,
                    Some(outcome.search_id),
                )
                .await
                .map(|_| {
                    tracing::info!(search_id = %outcome.search_id, "Venue search completed");
                    Settled::Completed
                }),
            Err(failure) => self
                .store
                .settle(item.id, &self.owner, ItemStatus::Error, Some(&failure.message), None)
                .await
                .map(|_| {
                    tracing::warn!(kind = ?failure.kind, error = %failure.message, "Venue search failed");
                    Settled::Failed
                }),
        };

        match settled {
            Err(StoreError::LeaseLost(_)) => {
                tracing::warn!("Item was reclaimed before it could be settled");
                Ok(Settled::Lost)
            }
            other => other,
        }
    }

    /// Keep the item's lease alive while its search runs
    fn start_heartbeat(&self, item_id: Uuid) -> JoinHandle<()> {
        let store = self.store.clone();
        let owner = self.owner.clone();
        let lease = self.settings.lease;
        let period = self.settings.heartbeat_interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The claim itself set the first lease.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = store.renew_lease(item_id, &owner, lease).await {
                    tracing::warn!(%item_id, error = %e, "Lease renewal failed");
                    if matches!(e, StoreError::LeaseLost(_) | StoreError::ItemNotFound(_)) {
                        break;
                    }
                }
            }
        })
    }
}
