//! Batch import domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use venue_common::SearchType;

use super::store::StoreError;

/// Aggregate status of an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Pending,
    Completed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Pending => "pending",
            ImportStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for ImportStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ImportStatus::Pending),
            "completed" => Ok(ImportStatus::Completed),
            other => Err(StoreError::Corrupt(format!("unknown import status '{}'", other))),
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-item lifecycle status
///
/// ```text
/// pending -> processing -> completed
///                      \-> error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Processing => "processing",
            ItemStatus::Completed => "completed",
            ItemStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Error)
    }

    /// Whether `self -> next` is a legal forward transition
    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (ItemStatus::Pending, ItemStatus::Processing)
                | (ItemStatus::Processing, ItemStatus::Completed)
                | (ItemStatus::Processing, ItemStatus::Error)
        )
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ItemStatus::Pending),
            "processing" => Ok(ItemStatus::Processing),
            "completed" => Ok(ItemStatus::Completed),
            "error" => Ok(ItemStatus::Error),
            other => Err(StoreError::Corrupt(format!("unknown item status '{}'", other))),
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One batch submission of venue names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub id: Uuid,
    pub filename: String,
    pub search_type: SearchType,
    pub status: ImportStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// One venue's unit of work within an import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub import_id: Uuid,
    pub venue_name: String,
    pub search_type: SearchType,
    pub status: ItemStatus,
    pub error_message: Option<String>,
    /// Search produced by a successful dispatch
    pub search_id: Option<Uuid>,
    pub position: i32,
    pub attempts: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of an attempt to claim the next item of an import
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// The item is now `processing` and leased to the caller
    Claimed(Item),
    /// Another item of the import is already in flight
    Busy,
    /// Nothing is pending or in flight
    Drained,
}

/// Per-status item totals for one import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCounts {
    pub total: i64,
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub error: i64,
}

impl ItemCounts {
    pub fn add(&mut self, status: ItemStatus) {
        self.total += 1;
        match status {
            ItemStatus::Pending => self.pending += 1,
            ItemStatus::Processing => self.processing += 1,
            ItemStatus::Completed => self.completed += 1,
            ItemStatus::Error => self.error += 1,
        }
    }

    pub fn is_drained(&self) -> bool {
        self.pending == 0 && self.processing == 0
    }
}

/// An item whose lease ran out, as handled by the reaper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReclaimedItem {
    pub item_id: Uuid,
    pub import_id: Uuid,
    /// `true` when returned to `pending`, `false` when given up on as `error`
    pub requeued: bool,
}

/// Message stored on items abandoned after too many expired leases
pub fn abandoned_message(attempts: i32) -> String {
    format!("Search did not finish after {} attempts", attempts)
}
