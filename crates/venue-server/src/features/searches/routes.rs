//! Search API routes
//!
//! # Route Structure
//!
//! - `POST /api/v1/searches` - Search images for one venue
//! - `GET /api/v1/searches` - Past searches, newest first
//! - `GET /api/v1/searches/:id/images` - One search with its images
//! - `POST /api/v1/searches/:id/downloads` - Count a download

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::FeatureState;
use crate::search::FailureKind;

use super::{
    commands::{RecordDownloadCommand, RecordDownloadError, RunSearchCommand, RunSearchError},
    queries::{GetSearchImagesError, GetSearchImagesQuery, ListSearchesError, ListSearchesQuery},
};

// ============================================================================
// Router Configuration
// ============================================================================

pub fn searches_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", post(run_search))
        .route("/", get(list_searches))
        .route("/:id/images", get(get_search_images))
        .route("/:id/downloads", post(record_download))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Search images for one venue
///
/// # Request Body
///
/// ```json
/// { "venue_name": "The Old Barn", "search_type": "venue" }
/// ```
///
/// # Response
///
/// - `200 OK` - Search stored, images returned
/// - `400 Bad Request` - Empty name or unknown search type
/// - `404 Not Found` - No usable images
/// - `502 Bad Gateway` - Search API failed or timed out
#[tracing::instrument(skip(state, command), fields(venue_name = %command.venue_name))]
async fn run_search(
    State(state): State<FeatureState>,
    Json(command): Json<RunSearchCommand>,
) -> Result<Response, SearchesApiError> {
    let outcome = super::commands::run::handle(state.invoker.clone(), command).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(outcome))).into_response())
}

/// `POST /api/v1/searches/:id/downloads`
#[tracing::instrument(skip(state))]
async fn record_download(
    State(state): State<FeatureState>,
    Path(search_id): Path<Uuid>,
) -> Result<Response, SearchesApiError> {
    let command = RecordDownloadCommand { search_id };
    let response = super::commands::record_download::handle(state.db.clone(), command).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// `GET /api/v1/searches?limit=50`
#[tracing::instrument(skip(state))]
async fn list_searches(
    State(state): State<FeatureState>,
    Query(query): Query<ListSearchesQuery>,
) -> Result<Response, SearchesApiError> {
    let searches = super::queries::list::handle(state.db.clone(), query).await?;

    tracing::debug!(count = searches.len(), "Searches listed via API");

    let meta = json!({ "count": searches.len() });
    Ok((StatusCode::OK, Json(ApiResponse::success_with_meta(searches, meta))).into_response())
}

/// `GET /api/v1/searches/:id/images`
#[tracing::instrument(skip(state))]
async fn get_search_images(
    State(state): State<FeatureState>,
    Path(search_id): Path<Uuid>,
) -> Result<Response, SearchesApiError> {
    let query = GetSearchImagesQuery { search_id };
    let response = super::queries::images::handle(state.db.clone(), query).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
enum SearchesApiError {
    Run(RunSearchError),
    Download(RecordDownloadError),
    Images(GetSearchImagesError),
    List(ListSearchesError),
}

impl From<RunSearchError> for SearchesApiError {
    fn from(err: RunSearchError) -> Self {
        Self::Run(err)
    }
}

impl From<RecordDownloadError> for SearchesApiError {
    fn from(err: RecordDownloadError) -> Self {
        Self::Download(err)
    }
}

impl From<GetSearchImagesError> for SearchesApiError {
    fn from(err: GetSearchImagesError) -> Self {
        Self::Images(err)
    }
}

impl From<ListSearchesError> for SearchesApiError {
    fn from(err: ListSearchesError) -> Self {
        Self::List(err)
    }
}

fn database_error(err: &sqlx::Error) -> Response {
    tracing::error!(error = %err, "Database error in searches API");
    let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
}

impl IntoResponse for SearchesApiError {
    fn into_response(self) -> Response {
        match self {
            SearchesApiError::Run(RunSearchError::NameValidation(err)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", err.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            SearchesApiError::Run(RunSearchError::SearchType(err)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", err.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            SearchesApiError::Run(RunSearchError::Failed(failure)) => {
                let (status, code) = match failure.kind {
                    FailureKind::InvalidInput => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                    FailureKind::NoResults => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    FailureKind::Upstream | FailureKind::Timeout => {
                        (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
                    },
                    FailureKind::Storage => {
                        tracing::error!(message = %failure.message, "Search result not stored");
                        let error =
                            ErrorResponse::new("INTERNAL_ERROR", "The search result could not be saved");
                        return (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response();
                    },
                };
                (status, Json(ErrorResponse::new(code, failure.message))).into_response()
            },

            SearchesApiError::Download(RecordDownloadError::NotFound(id))
            | SearchesApiError::Images(GetSearchImagesError::NotFound(id)) => {
                let error = ErrorResponse::new("NOT_FOUND", format!("Search '{}' not found", id));
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },

            SearchesApiError::Download(RecordDownloadError::Database(err))
            | SearchesApiError::Images(GetSearchImagesError::Database(err))
            | SearchesApiError::List(ListSearchesError::Database(err)) => database_error(&err),
        }
    }
}
