use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::shared::LimitParams;
use crate::search::{SearchRecord, SearchStore};

/// Past searches, newest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListSearchesQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListSearchesError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Vec<SearchRecord>, ListSearchesError>> for ListSearchesQuery {}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: ListSearchesQuery,
) -> Result<Vec<SearchRecord>, ListSearchesError> {
    let limit = LimitParams::new(query.limit).limit();
    let searches = SearchStore::new(pool).list_searches(limit).await?;
    Ok(searches)
}
