//! Storage seams for imports and their items
//!
//! The sequencer, the reaper and ingestion only talk to these traits. The
//! production implementation is [`super::postgres::PgBatchStore`]; tests use
//! [`super::memory::InMemoryBatchStore`].

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;
use venue_common::SearchType;

use super::types::{Claim, Import, ItemCounts, Item, ItemStatus, ReclaimedItem};

/// Errors raised by import and item stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Import not found: {0}")]
    ImportNotFound(Uuid),

    #[error("Item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Invalid status transition for item {item_id}: {from} -> {to}")]
    InvalidTransition {
        item_id: Uuid,
        from: ItemStatus,
        to: ItemStatus,
    },

    #[error("Import {0} still has unsettled items")]
    NotDrained(Uuid),

    #[error("Item {0} is not leased to this worker")]
    LeaseLost(Uuid),

    #[error("Invalid status update: {0}")]
    InvalidUpdate(String),

    #[error("Stored data is invalid: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Internal(String),
}

/// Import records and their aggregate status
#[async_trait]
pub trait ImportStore: Send + Sync {
    /// Create a `pending` import
    async fn create_import(
        &self,
        filename: &str,
        search_type: SearchType,
    ) -> Result<Import, StoreError>;

    /// Create a `pending` import together with one `pending` item per name
    ///
    /// Either both are stored or neither is.
    async fn create_import_with_items(
        &self,
        filename: &str,
        search_type: SearchType,
        names: &[String],
    ) -> Result<(Import, Vec<Item>), StoreError>;

    /// Mark an import `completed`; completing it again is a no-op
    ///
    /// Fails with [`StoreError::NotDrained`] while any item is still
    /// `pending` or `processing`.
    async fn mark_completed(&self, import_id: Uuid) -> Result<Import, StoreError>;

    async fn get_import(&self, import_id: Uuid) -> Result<Import, StoreError>;

    /// Newest first
    async fn list_recent_imports(&self, limit: i64) -> Result<Vec<Import>, StoreError>;

    /// Ids of all imports that still need draining, oldest first
    async fn pending_imports(&self) -> Result<Vec<Uuid>, StoreError>;
}

/// Item records and their status transitions
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Create one `pending` item per name, in order
    ///
    /// Items inherit the import's search type. `created_at` and `position`
    /// are strictly increasing in input order.
    async fn create_items(&self, import_id: Uuid, names: &[String])
        -> Result<Vec<Item>, StoreError>;

    /// Apply one forward transition to a single item
    ///
    /// `completed` requires a `search_id`, `error` requires a message. Any
    /// transition other than `pending -> processing` or
    /// `processing -> completed | error` fails with
    /// [`StoreError::InvalidTransition`].
    async fn set_status(
        &self,
        item_id: Uuid,
        status: ItemStatus,
        error_message: Option<&str>,
        search_id: Option<Uuid>,
    ) -> Result<Item, StoreError>;

    /// Settle an in-flight item as `completed` or `error` for its lease owner
    ///
    /// Fails with [`StoreError::LeaseLost`] unless the item is still
    /// `processing` under `owner`'s lease, so a worker whose item was
    /// reclaimed and handed to another worker cannot settle it.
    async fn settle(
        &self,
        item_id: Uuid,
        owner: &str,
        status: ItemStatus,
        error_message: Option<&str>,
        search_id: Option<Uuid>,
    ) -> Result<Item, StoreError>;

    /// Oldest `pending` item of the import
    async fn next_pending(&self, import_id: Uuid) -> Result<Option<Item>, StoreError>;

    /// Atomically pick the oldest `pending` item and lease it to `owner`
    async fn claim_next(
        &self,
        import_id: Uuid,
        owner: &str,
        lease: Duration,
    ) -> Result<Claim, StoreError>;

    /// Push the lease of an in-flight item forward
    async fn renew_lease(
        &self,
        item_id: Uuid,
        owner: &str,
        lease: Duration,
    ) -> Result<(), StoreError>;

    /// Recover `processing` items whose lease has expired
    ///
    /// Items that have been dispatched fewer than `max_attempts` times go
    /// back to `pending`; the rest are settled as `error`.
    async fn reclaim_expired(&self, max_attempts: i32) -> Result<Vec<ReclaimedItem>, StoreError>;

    /// Newest first, across all imports
    async fn list_recent_items(&self, limit: i64) -> Result<Vec<Item>, StoreError>;

    /// Items of one import in dispatch order
    async fn list_items(&self, import_id: Uuid) -> Result<Vec<Item>, StoreError>;

    async fn item_counts(&self, import_id: Uuid) -> Result<ItemCounts, StoreError>;
}

/// Everything the batch machinery needs from storage
pub trait BatchStore: ImportStore + ItemStore {}

impl<T: ImportStore + ItemStore> BatchStore for T {}

/// Check the payload that goes with a terminal status
pub(crate) fn check_settlement(
    status: ItemStatus,
    error_message: Option<&str>,
    search_id: Option<Uuid>,
) -> Result<(), StoreError> {
    match status {
        ItemStatus::Completed if search_id.is_none() => Err(StoreError::InvalidUpdate(
            "completed items need a search id".to_string(),
        )),
        ItemStatus::Error if error_message.map_or(true, |m| m.trim().is_empty()) => Err(
            StoreError::InvalidUpdate("errored items need a message".to_string()),
        ),
        _ => Ok(()),
    }
}

/// Settling only ever moves an item to a terminal status
pub(crate) fn check_terminal(status: ItemStatus) -> Result<(), StoreError> {
    if status.is_terminal() {
        Ok(())
    } else {
        Err(StoreError::InvalidUpdate(format!(
            "cannot settle an item as {}",
            status
        )))
    }
}

/// Convert a lease duration into a chrono offset
pub(crate) fn lease_delta(lease: Duration) -> Result<chrono::Duration, StoreError> {
    chrono::Duration::from_std(lease)
        .map_err(|e| StoreError::Internal(format!("lease out of range: {}", e)))
}
