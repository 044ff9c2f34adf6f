//! The search operation run once per venue
//!
//! Both the single-search endpoint and the batch sequencer go through
//! [`SearchInvoker`], so a batch item and an interactive search produce the
//! same rows.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use venue_common::SearchType;

use super::client::{SearchError, SerpApiClient};
use super::store::SearchStore;
use super::types::{pick_images, FoundImage, HotelDetails, SearchOutcome};

/// Why an invocation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The venue name was empty
    InvalidInput,
    /// The search ran but nothing usable came back
    NoResults,
    /// Transport error, bad status or an API error payload
    Upstream,
    Timeout,
    /// The result could not be saved
    Storage,
}

/// A failed invocation; the message ends up on the item
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SearchFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SearchFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(venue_name: &str, secs: u64) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("Search for '{}' timed out after {}s", venue_name, secs),
        )
    }
}

impl From<SearchError> for SearchFailure {
    fn from(err: SearchError) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else {
            FailureKind::Upstream
        };
        Self::new(kind, err.to_string())
    }
}

/// Performs one search for one venue name
#[async_trait]
pub trait SearchInvoker: Send + Sync {
    async fn invoke(
        &self,
        venue_name: &str,
        search_type: SearchType,
    ) -> Result<SearchOutcome, SearchFailure>;
}

/// SerpAPI-backed invoker that persists every successful search
pub struct SerpApiInvoker {
    client: SerpApiClient,
    store: SearchStore,
    hotel_details: bool,
}

impl SerpApiInvoker {
    pub fn new(client: SerpApiClient, store: SearchStore, hotel_details: bool) -> Self {
        Self {
            client,
            store,
            hotel_details,
        }
    }

    /// Fetch images (and optionally hotel details) without saving anything
    pub async fn lookup(
        &self,
        venue_name: &str,
        search_type: SearchType,
    ) -> Result<(Vec<FoundImage>, Option<HotelDetails>), SearchFailure> {
        let venue_name = venue_name.trim();
        if venue_name.is_empty() {
            return Err(SearchFailure::new(
                FailureKind::InvalidInput,
                "Venue name cannot be empty",
            ));
        }

        let raw = self
            .client
            .search_images(&search_type.query_for(venue_name))
            .await?;
        let images = pick_images(&raw, venue_name, self.client.result_limit());
        if images.is_empty() {
            return Err(SearchFailure::new(
                FailureKind::NoResults,
                format!("No images found for '{}'", venue_name),
            ));
        }

        let hotel = if self.hotel_details && search_type == SearchType::Venue {
            match self.client.search_hotel(venue_name).await {
                Ok(hotel) => hotel,
                Err(e) => {
                    tracing::warn!(venue_name, error = %e, "Hotel details lookup failed");
                    None
                }
            }
        } else {
            None
        };

        Ok((images, hotel))
    }
}

#[async_trait]
impl SearchInvoker for SerpApiInvoker {
    #[tracing::instrument(skip(self, search_type), fields(search_type = %search_type))]
    async fn invoke(
        &self,
        venue_name: &str,
        search_type: SearchType,
    ) -> Result<SearchOutcome, SearchFailure> {
        let (images, hotel) = self.lookup(venue_name, search_type).await?;
        let venue_name = venue_name.trim();

        let search_id = self
            .store
            .save_search(venue_name, search_type, &images, hotel.as_ref())
            .await
            .map_err(|e| {
                tracing::error!(venue_name, error = %e, "Failed to save search");
                SearchFailure::new(FailureKind::Storage, "Failed to save search results")
            })?;

        tracing::info!(%search_id, images = images.len(), "Venue search saved");

        Ok(SearchOutcome {
            search_id,
            venue_name: venue_name.to_string(),
            search_type,
            images,
            hotel,
        })
    }
}
