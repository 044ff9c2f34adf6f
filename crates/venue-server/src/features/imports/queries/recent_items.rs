//! Recently created items across all imports
//!
//! This is what a client polls to follow batch progress.

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::batch::{BatchStore, Item, StoreError};
use crate::features::shared::LimitParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentItemsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum RecentItemsError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Request<Result<Vec<Item>, RecentItemsError>> for RecentItemsQuery {}

#[tracing::instrument(skip(store))]
pub async fn handle(
    store: Arc<dyn BatchStore>,
    query: RecentItemsQuery,
) -> Result<Vec<Item>, RecentItemsError> {
    let limit = LimitParams::new(query.limit).limit();
    Ok(store.list_recent_items(limit).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{ImportStore, InMemoryBatchStore, ItemStore};
    use venue_common::SearchType;

    #[tokio::test]
    async fn test_recent_items_newest_first_and_limited() {
        let store = Arc::new(InMemoryBatchStore::new());
        let import = store.create_import("a.csv", SearchType::Venue).await.unwrap();
        let names: Vec<String> = ["One", "Two", "Three"].iter().map(|s| s.to_string()).collect();
        store.create_items(import.id, &names).await.unwrap();

        let items = handle(store, RecentItemsQuery { limit: Some(2) }).await.unwrap();
        let names: Vec<_> = items.iter().map(|i| i.venue_name.as_str()).collect();
        assert_eq!(names, vec!["Three", "Two"]);
    }
}
