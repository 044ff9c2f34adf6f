//! Count a download of a search's images

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::search::SearchStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDownloadCommand {
    pub search_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDownloadResponse {
    pub search_id: Uuid,
    pub download_count: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordDownloadError {
    #[error("Search '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<RecordDownloadResponse, RecordDownloadError>> for RecordDownloadCommand {}

/// Increment `download_count` and return the new value
#[tracing::instrument(skip(pool), fields(search_id = %command.search_id))]
pub async fn handle(
    pool: PgPool,
    command: RecordDownloadCommand,
) -> Result<RecordDownloadResponse, RecordDownloadError> {
    let download_count = SearchStore::new(pool)
        .record_download(command.search_id)
        .await?
        .ok_or(RecordDownloadError::NotFound(command.search_id))?;

    tracing::debug!(download_count, "Download recorded");

    Ok(RecordDownloadResponse {
        search_id: command.search_id,
        download_count,
    })
}
