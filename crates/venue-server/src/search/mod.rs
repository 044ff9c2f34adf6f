//! Venue image search
//!
//! - [`client`]: SerpAPI HTTP client
//! - [`invoker`]: one search for one venue name, persisted
//! - [`store`]: `venue_searches` and `venue_images` persistence
//! - [`types`]: wire and domain types

pub mod client;
pub mod invoker;
pub mod store;
pub mod types;

pub use client::{SearchError, SerpApiClient};
pub use invoker::{FailureKind, SearchFailure, SearchInvoker, SerpApiInvoker};
pub use store::SearchStore;
pub use types::{FoundImage, HotelDetails, ImageRecord, SearchOutcome, SearchRecord};
