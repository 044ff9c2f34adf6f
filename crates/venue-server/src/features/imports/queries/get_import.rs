//! One import with per-status item counts

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::batch::{BatchStore, Import, ItemCounts, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetImportQuery {
    pub import_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportDetail {
    #[serde(flatten)]
    pub import: Import,
    pub counts: ItemCounts,
}

#[derive(Debug, thiserror::Error)]
pub enum GetImportError {
    #[error("Import '{0}' not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for GetImportError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ImportNotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

impl Request<Result<ImportDetail, GetImportError>> for GetImportQuery {}

#[tracing::instrument(skip(store), fields(import_id = %query.import_id))]
pub async fn handle(
    store: Arc<dyn BatchStore>,
    query: GetImportQuery,
) -> Result<ImportDetail, GetImportError> {
    let import = store.get_import(query.import_id).await?;
    let counts = store.item_counts(import.id).await?;

    Ok(ImportDetail { import, counts })
}
