//! Venue Search Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging setup, and error handling for the venue search workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`VenueError`] and the [`Result`] alias
//! - **Logging**: centralized `tracing` subscriber setup driven by `LOG_*` variables
//! - **Types**: domain types shared between crates, such as [`types::SearchType`]
//!
//! # Example
//!
//! ```no_run
//! use venue_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     tracing::info!("logging ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

pub use error::{Result, VenueError};
pub use types::SearchType;
