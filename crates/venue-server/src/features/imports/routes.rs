//! Import API routes
//!
//! # Route Structure
//!
//! - `POST /api/v1/imports` - Multipart CSV upload (`file`, optional `search_type`)
//! - `POST /api/v1/imports/names` - JSON list of names
//! - `GET /api/v1/imports` - Recent imports
//! - `GET /api/v1/imports/items` - Recent items across imports
//! - `GET /api/v1/imports/export` - CSV of completed items and their image URLs
//! - `GET /api/v1/imports/:id` - One import with item counts
//! - `GET /api/v1/imports/:id/items` - Items of one import in dispatch order

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::error::AppError;
use crate::features::FeatureState;

use super::{
    commands::{StartImportError, SubmitNamesCommand, UploadCsvCommand},
    queries::{
        ExportImportsError, ExportImportsQuery, GetImportError, GetImportQuery,
        ListImportItemsError, ListImportItemsQuery, ListImportsError, ListImportsQuery,
        RecentItemsError, RecentItemsQuery,
    },
};

/// Largest accepted upload body
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Filename recorded when the upload does not name its file
const DEFAULT_UPLOAD_FILENAME: &str = "upload.csv";

// ============================================================================
// Router Configuration
// ============================================================================

pub fn imports_routes() -> Router<FeatureState> {
    Router::new()
        .route(
            "/",
            post(upload_csv).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/", get(list_imports))
        .route("/names", post(submit_names))
        .route("/items", get(recent_items))
        .route("/export", get(export_csv))
        .route("/:id", get(get_import))
        .route("/:id/items", get(list_import_items))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Upload a CSV of venue names
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "message": "CSV processing started",
///     "import_id": "…",
///     "total_venues": 42
///   }
/// }
/// ```
///
/// - `400 Bad Request` - Missing file, not UTF-8, no names, too many names
/// - `503 Service Unavailable` - Batch workers are shut down
#[tracing::instrument(skip(state, multipart))]
async fn upload_csv(
    State(state): State<FeatureState>,
    mut multipart: Multipart,
) -> Result<Response, ImportsApiError> {
    let mut file: Option<(String, String)> = None;
    let mut search_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|f| !f.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_UPLOAD_FILENAME.to_string());
                let bytes = field.bytes().await?;
                let content = String::from_utf8(bytes.to_vec()).map_err(|_| {
                    ImportsApiError::BadUpload("Uploaded file is not valid UTF-8 text".to_string())
                })?;
                file = Some((filename, content));
            },
            Some("search_type") => search_type = Some(field.text().await?),
            _ => {},
        }
    }

    let (filename, content) = file.ok_or_else(|| {
        ImportsApiError::BadUpload("Multipart field 'file' is required".to_string())
    })?;

    let command = UploadCsvCommand {
        filename,
        search_type,
        content: content.trim_start_matches('\u{feff}').to_string(),
    };
    let response = super::commands::upload_csv::handle(state.import_context(), command).await?;

    tracing::info!(
        import_id = %response.import_id,
        total_venues = response.total_venues,
        "CSV import started via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// `POST /api/v1/imports/names`
#[tracing::instrument(skip(state, command), fields(names = command.names.len()))]
async fn submit_names(
    State(state): State<FeatureState>,
    Json(command): Json<SubmitNamesCommand>,
) -> Result<Response, ImportsApiError> {
    let response = super::commands::submit_names::handle(state.import_context(), command).await?;

    tracing::info!(
        import_id = %response.import_id,
        total_venues = response.total_venues,
        "Name import started via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// `GET /api/v1/imports?limit=50`
#[tracing::instrument(skip(state))]
async fn list_imports(
    State(state): State<FeatureState>,
    Query(query): Query<ListImportsQuery>,
) -> Result<Response, ImportsApiError> {
    let imports = super::queries::list_imports::handle(state.store.clone(), query).await?;
    let meta = json!({ "count": imports.len() });
    Ok((StatusCode::OK, Json(ApiResponse::success_with_meta(imports, meta))).into_response())
}

/// `GET /api/v1/imports/:id`
#[tracing::instrument(skip(state))]
async fn get_import(
    State(state): State<FeatureState>,
    Path(import_id): Path<Uuid>,
) -> Result<Response, ImportsApiError> {
    let query = GetImportQuery { import_id };
    let detail = super::queries::get_import::handle(state.store.clone(), query).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(detail))).into_response())
}

/// `GET /api/v1/imports/:id/items`
#[tracing::instrument(skip(state))]
async fn list_import_items(
    State(state): State<FeatureState>,
    Path(import_id): Path<Uuid>,
) -> Result<Response, ImportsApiError> {
    let query = ListImportItemsQuery { import_id };
    let items = super::queries::list_items::handle(state.store.clone(), query).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(items))).into_response())
}

/// `GET /api/v1/imports/items?limit=50`
#[tracing::instrument(skip(state))]
async fn recent_items(
    State(state): State<FeatureState>,
    Query(query): Query<RecentItemsQuery>,
) -> Result<Response, ImportsApiError> {
    let items = super::queries::recent_items::handle(state.store.clone(), query).await?;
    let meta = json!({ "count": items.len() });
    Ok((StatusCode::OK, Json(ApiResponse::success_with_meta(items, meta))).into_response())
}

/// `GET /api/v1/imports/export`
///
/// Served as an attachment named `venue_images_YYYY-MM-DD.csv`.
#[tracing::instrument(skip(state))]
async fn export_csv(State(state): State<FeatureState>) -> Result<Response, ImportsApiError> {
    let export =
        super::queries::export::handle(state.db.clone(), ExportImportsQuery::default()).await?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.filename),
        ),
    ];

    Ok((StatusCode::OK, headers, export.content).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
enum ImportsApiError {
    BadUpload(String),
    Start(StartImportError),
    List(ListImportsError),
    Get(GetImportError),
    Items(ListImportItemsError),
    Recent(RecentItemsError),
    Export(ExportImportsError),
}

impl From<MultipartError> for ImportsApiError {
    fn from(err: MultipartError) -> Self {
        Self::BadUpload(err.body_text())
    }
}

impl From<StartImportError> for ImportsApiError {
    fn from(err: StartImportError) -> Self {
        Self::Start(err)
    }
}

impl From<ListImportsError> for ImportsApiError {
    fn from(err: ListImportsError) -> Self {
        Self::List(err)
    }
}

impl From<GetImportError> for ImportsApiError {
    fn from(err: GetImportError) -> Self {
        Self::Get(err)
    }
}

impl From<ListImportItemsError> for ImportsApiError {
    fn from(err: ListImportItemsError) -> Self {
        Self::Items(err)
    }
}

impl From<RecentItemsError> for ImportsApiError {
    fn from(err: RecentItemsError) -> Self {
        Self::Recent(err)
    }
}

impl From<ExportImportsError> for ImportsApiError {
    fn from(err: ExportImportsError) -> Self {
        Self::Export(err)
    }
}

fn not_found(import_id: Uuid) -> Response {
    let error = ErrorResponse::new("NOT_FOUND", format!("Import '{}' not found", import_id));
    (StatusCode::NOT_FOUND, Json(error)).into_response()
}

impl IntoResponse for ImportsApiError {
    fn into_response(self) -> Response {
        match self {
            ImportsApiError::BadUpload(message) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", message);
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            ImportsApiError::Start(StartImportError::SearchType(err)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", err.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            ImportsApiError::Start(StartImportError::Ingest(err)) => {
                AppError::from(err).into_response()
            },

            ImportsApiError::Get(GetImportError::NotFound(id))
            | ImportsApiError::Items(ListImportItemsError::NotFound(id)) => not_found(id),

            ImportsApiError::List(ListImportsError::Store(err))
            | ImportsApiError::Get(GetImportError::Store(err))
            | ImportsApiError::Items(ListImportItemsError::Store(err))
            | ImportsApiError::Recent(RecentItemsError::Store(err)) => {
                AppError::from(err).into_response()
            },

            ImportsApiError::Export(ExportImportsError::Database(err)) => {
                AppError::Database(err).into_response()
            },
            ImportsApiError::Export(err) => AppError::Internal(err.to_string()).into_response(),
        }
    }
}
