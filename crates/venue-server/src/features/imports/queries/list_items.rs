use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::batch::{BatchStore, Item, StoreError};

/// Items of one import in dispatch order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListImportItemsQuery {
    pub import_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum ListImportItemsError {
    #[error("Import '{0}' not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ListImportItemsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ImportNotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

impl Request<Result<Vec<Item>, ListImportItemsError>> for ListImportItemsQuery {}

#[tracing::instrument(skip(store), fields(import_id = %query.import_id))]
pub async fn handle(
    store: Arc<dyn BatchStore>,
    query: ListImportItemsQuery,
) -> Result<Vec<Item>, ListImportItemsError> {
    // Tell an unknown import apart from one without items
    store.get_import(query.import_id).await?;
    Ok(store.list_items(query.import_id).await?)
}
