//! SerpAPI HTTP client
//!
//! Thin wrapper around the `search.json` endpoint for the two engines we
//! use: `google_images` for venue photos and `google_hotels` for venue
//! details.

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use super::types::{HotelDetails, HotelsResponse, ImagesResponse, RawImage};
use crate::config::SearchConfig;

/// Errors from talking to SerpAPI
#[derive(Debug, Error)]
pub enum SearchError {
    /// Never carries the request URL, which holds the API key
    #[error("Search request failed: {0}")]
    Http(reqwest::Error),

    #[error("Search API returned HTTP {0}")]
    Status(u16),

    #[error("Search API error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Http(err.without_url())
    }
}

impl SearchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SearchError::Http(e) if e.is_timeout())
    }
}

/// SerpAPI client
#[derive(Clone)]
pub struct SerpApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    result_limit: usize,
}

impl SerpApiClient {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("venue-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            result_limit: config.result_limit,
        })
    }

    pub fn result_limit(&self) -> usize {
        self.result_limit
    }

    fn search_url(&self) -> String {
        format!("{}/search.json", self.base_url)
    }

    /// Run a Google Images search and return the raw results
    #[tracing::instrument(skip(self))]
    pub async fn search_images(&self, query: &str) -> Result<Vec<RawImage>, SearchError> {
        let num = self.result_limit.to_string();
        let response = self
            .client
            .get(self.search_url())
            .query(&[
                ("engine", "google_images"),
                ("q", query),
                ("num", num.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Status(response.status().as_u16()));
        }

        let body: ImagesResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(SearchError::Api(error));
        }

        tracing::debug!(results = body.images_results.len(), "Image search returned");
        Ok(body.images_results)
    }

    /// Look a venue up on Google Hotels; `None` when nothing matches
    #[tracing::instrument(skip(self))]
    pub async fn search_hotel(&self, venue_name: &str) -> Result<Option<HotelDetails>, SearchError> {
        let response = self
            .client
            .get(self.search_url())
            .query(&[
                ("engine", "google_hotels"),
                ("q", venue_name),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Status(response.status().as_u16()));
        }

        let body: HotelsResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(SearchError::Api(error));
        }

        Ok(body.properties.first().map(HotelDetails::from_property))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SerpApiClient {
        let config = SearchConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            ..SearchConfig::default()
        };
        SerpApiClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_search_images_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("engine", "google_images"))
            .and(query_param("q", "The Barn wedding venue"))
            .and(query_param("num", "15"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images_results": [
                    { "original": "https://img/1.jpg", "title": "Barn" },
                    { "thumbnail": "https://img/2.jpg" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results = client_for(&server)
            .search_images("The Barn wedding venue")
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].thumbnail.as_deref(), Some("https://img/2.jpg"));
    }

    #[tokio::test]
    async fn test_search_images_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).search_images("x").await.unwrap_err();
        assert!(matches!(err, SearchError::Status(503)));
    }

    #[tokio::test]
    async fn test_search_images_api_error_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "error": "Invalid API key." })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).search_images("x").await.unwrap_err();
        assert!(matches!(err, SearchError::Api(ref m) if m == "Invalid API key."));
    }

    #[tokio::test]
    async fn test_search_hotel_takes_first_property() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("engine", "google_hotels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": [
                    { "property_token": "first", "link": "https://first.example" },
                    { "property_token": "second" }
                ]
            })))
            .mount(&server)
            .await;

        let hotel = client_for(&server).search_hotel("Grand Hotel").await.unwrap().unwrap();
        assert_eq!(hotel.hotel_id.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_search_hotel_without_properties() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        assert!(client_for(&server).search_hotel("Nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connect_error_hides_api_key() {
        let config = SearchConfig {
            api_key: "SECRET-KEY-123".to_string(),
            // Nothing listens on port 1.
            base_url: "http://127.0.0.1:1".to_string(),
            ..SearchConfig::default()
        };
        let client = SerpApiClient::new(&config).unwrap();

        let err = client.search_images("The Barn wedding venue").await.unwrap_err();
        assert!(matches!(err, SearchError::Http(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
        assert!(!err.to_string().contains("api_key"));
    }

    #[tokio::test]
    async fn test_decode_error_hides_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).search_images("x").await.unwrap_err();
        assert!(matches!(err, SearchError::Http(_)));
        assert!(!err.to_string().contains("test-key"));
    }
}
