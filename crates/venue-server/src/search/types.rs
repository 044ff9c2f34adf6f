//! Search result types and the SerpAPI wire format

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use venue_common::SearchType;

// ============================================================================
// SerpAPI responses
// ============================================================================

/// `engine=google_images` response; only the fields we read
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImagesResponse {
    #[serde(default)]
    pub images_results: Vec<RawImage>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImage {
    pub original: Option<String>,
    pub thumbnail: Option<String>,
    pub title: Option<String>,
}

/// `engine=google_hotels` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HotelsResponse {
    #[serde(default)]
    pub properties: Vec<serde_json::Value>,
    pub error: Option<String>,
}

// ============================================================================
// Domain
// ============================================================================

/// One usable image picked from a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundImage {
    pub image_url: String,
    pub alt_text: String,
}

/// Turn raw results into at most `limit` usable images
///
/// The URL is the original image, falling back to the thumbnail; results
/// with neither are skipped. Missing titles become "Wedding venue {name}".
pub fn pick_images(raw: &[RawImage], venue_name: &str, limit: usize) -> Vec<FoundImage> {
    raw.iter()
        .take(limit)
        .filter_map(|img| {
            let url = img
                .original
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .or_else(|| img.thumbnail.as_deref().filter(|u| !u.trim().is_empty()))?;
            let alt_text = img
                .title
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Wedding venue {}", venue_name));
            Some(FoundImage {
                image_url: url.to_string(),
                alt_text,
            })
        })
        .collect()
}

/// Details of a venue taken from Google Hotels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotelDetails {
    pub hotel_id: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub amenities: Vec<String>,
    pub room_count: Option<i32>,
    pub contact_details: Option<serde_json::Value>,
    /// The full property record as returned
    pub raw: serde_json::Value,
}

impl HotelDetails {
    pub fn from_property(property: &serde_json::Value) -> Self {
        let text = |key: &str| {
            property
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        let amenities = property
            .get("amenities")
            .and_then(|v| v.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|a| a.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let contact_details = text("phone").map(|phone| serde_json::json!({ "phone": phone }));

        Self {
            hotel_id: text("property_token"),
            address: text("address"),
            description: text("description"),
            website: text("link"),
            amenities,
            room_count: property
                .get("rooms")
                .and_then(|v| v.as_i64())
                .and_then(|n| i32::try_from(n).ok()),
            contact_details,
            raw: property.clone(),
        }
    }
}

/// A persisted search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SearchRecord {
    pub id: Uuid,
    pub venue_name: String,
    pub search_type: String,
    pub download_count: i32,
    pub hotel_id: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub room_count: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// A persisted image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImageRecord {
    pub id: Uuid,
    pub search_id: Uuid,
    pub venue_name: String,
    pub image_url: String,
    pub alt_text: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// Result of one successful invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub search_id: Uuid,
    pub venue_name: String,
    pub search_type: SearchType,
    pub images: Vec<FoundImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel: Option<HotelDetails>,
}
