//! Server-wide API error type

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ErrorResponse;
use crate::batch::{IngestError, StoreError};

/// Errors returned from HTTP handlers
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Database(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match self {
            AppError::Database(ref e) => {
                tracing::error!(error = ?e, "Database error");
                "A database error occurred".to_string()
            }
            AppError::Internal(ref message) => {
                tracing::error!(%message, "Internal error");
                "An internal error occurred".to_string()
            }
            AppError::NotFound(message)
            | AppError::Validation(message)
            | AppError::Unavailable(message) => message,
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ImportNotFound(id) => AppError::NotFound(format!("Import '{}' not found", id)),
            StoreError::ItemNotFound(id) => AppError::NotFound(format!("Item '{}' not found", id)),
            StoreError::Database(e) => AppError::Database(e),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Store(e) => e.into(),
            IngestError::Queue(e) => AppError::Unavailable(e.to_string()),
            validation => AppError::Validation(validation.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_ingest_errors_map_to_validation() {
        let err: AppError = IngestError::Empty.into();
        assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"));

        let err: AppError = IngestError::BlankName(3).into();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("#3")));
    }

    #[test]
    fn test_store_not_found_maps_to_404() {
        let err: AppError = StoreError::ImportNotFound(Uuid::nil()).into();
        assert_eq!(err.status_and_code().0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let response = AppError::Internal("secret detail".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
