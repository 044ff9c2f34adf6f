//! HTTP surface: top-level routes and the middleware stack

pub mod response;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use tower_http::compression::CompressionLayer;

use crate::config::CorsConfig;
use crate::db;
use crate::features::{self, FeatureState};
use crate::middleware;
use response::ErrorResponse;

/// Build the application router with all routes and middleware
///
/// Feature routes are mounted under `/api/v1`; `/` and `/health` sit at
/// the root.
pub fn create_router(state: FeatureState, cors: &CorsConfig) -> Router {
    let db = state.db.clone();

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .with_state(db)
        .nest("/api/v1", features::router(state))
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(cors))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Venue Search Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Health check handler
async fn health_check(State(db): State<PgPool>) -> Response {
    match db::health_check(&db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            let error = ErrorResponse::new("UNAVAILABLE", "Database is not reachable");
            (StatusCode::SERVICE_UNAVAILABLE, Json(error)).into_response()
        },
    }
}
