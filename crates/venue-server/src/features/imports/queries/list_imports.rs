use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::batch::{BatchStore, Import, StoreError};
use crate::features::shared::LimitParams;

/// Most recent imports, newest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListImportsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListImportsError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Request<Result<Vec<Import>, ListImportsError>> for ListImportsQuery {}

#[tracing::instrument(skip(store))]
pub async fn handle(
    store: Arc<dyn BatchStore>,
    query: ListImportsQuery,
) -> Result<Vec<Import>, ListImportsError> {
    let limit = LimitParams::new(query.limit).limit();
    Ok(store.list_recent_imports(limit).await?)
}
