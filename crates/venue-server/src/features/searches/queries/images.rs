//! One past search together with its images

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::search::{ImageRecord, SearchRecord, SearchStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSearchImagesQuery {
    pub search_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchImagesResponse {
    pub search: SearchRecord,
    /// In result order
    pub images: Vec<ImageRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum GetSearchImagesError {
    #[error("Search '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<SearchImagesResponse, GetSearchImagesError>> for GetSearchImagesQuery {}

#[tracing::instrument(skip(pool), fields(search_id = %query.search_id))]
pub async fn handle(
    pool: PgPool,
    query: GetSearchImagesQuery,
) -> Result<SearchImagesResponse, GetSearchImagesError> {
    let store = SearchStore::new(pool);

    let search = store
        .get_search(query.search_id)
        .await?
        .ok_or(GetSearchImagesError::NotFound(query.search_id))?;
    let images = store.images_for(search.id).await?;

    Ok(SearchImagesResponse { search, images })
}
