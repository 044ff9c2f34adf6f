//! Feature modules implementing the venue search API
//!
//! Each feature is a vertical slice following the CQRS (Command Query
//! Responsibility Segregation) pattern:
//! - `commands/` - Write operations (run a search, start an import)
//! - `queries/` - Read operations (list, get, export)
//! - `routes.rs` - HTTP route definitions
//!
//! # Features
//!
//! - **searches**: single venue searches, past searches and their images
//! - **imports**: batch imports from CSV or name lists, progress and export
//!
//! Commands and queries implement `mediator::Request`; see
//! [`crate::cqrs::build_mediator`].

pub mod imports;
pub mod searches;
pub mod shared;

use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;

use crate::batch::{BatchQueue, BatchStore};
use crate::search::SearchInvoker;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool for read models
    pub db: PgPool,
    /// Import and item persistence
    pub store: Arc<dyn BatchStore>,
    /// Runs one venue search and stores the result
    pub invoker: Arc<dyn SearchInvoker>,
    /// Hands new imports to the batch workers
    pub queue: BatchQueue,
    /// Largest number of names accepted in one import
    pub max_names: usize,
}

impl FeatureState {
    /// The parts of the state the import commands need
    pub fn import_context(&self) -> imports::ImportContext {
        imports::ImportContext {
            store: self.store.clone(),
            queue: self.queue.clone(),
            max_names: self.max_names,
        }
    }
}

/// Creates the API router with all feature routes mounted
///
/// - `/searches` - single searches and search history
/// - `/imports` - batch imports
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/searches", searches::searches_routes().with_state(state.clone()))
        .nest("/imports", imports::imports_routes().with_state(state))
}
