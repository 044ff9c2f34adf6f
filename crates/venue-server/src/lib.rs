//! Venue Search Server Library
//!
//! HTTP service that finds images for wedding venues and vendors through
//! SerpAPI, stores them, and works through batch imports of venue names.
//!
//! # Overview
//!
//! - **Search** ([`search`]): one venue name in, a stored search with images out
//! - **Batch imports** ([`batch`]): CSV or name lists turned into items that are
//!   searched strictly one at a time per import, with leases, a reaper and
//!   resume after restart
//! - **API** ([`api`], [`features`]): axum routes under `/api/v1`
//! - **Configuration** ([`config`]): environment variables with defaults
//!
//! # Architecture
//!
//! The HTTP layer follows a **CQRS** layout: every feature has `commands/`
//! (writes) and `queries/` (reads) handled by standalone `handle` functions,
//! registered with a mediator in [`cqrs`].
//!
//! ```text
//! POST /imports -> ingestion -> BatchQueue -> workers -> Sequencer -> SearchInvoker
//!                                   ^                                     |
//!                                   +-------- Reaper (resume, leases)     v
//!                                                               venue_searches/images
//! ```

pub mod api;
pub mod batch;
pub mod config;
pub mod cqrs;
pub mod db;
pub mod error;
pub mod features;
pub mod middleware;
pub mod search;

// Re-export commonly used types
pub use error::AppError;
