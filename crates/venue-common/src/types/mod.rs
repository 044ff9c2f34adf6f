//! Domain types shared across the workspace

use serde::{Deserialize, Serialize};

use crate::error::VenueError;

/// What kind of business a search is looking for.
///
/// The search type decides the suffix appended to the user's query, so
/// "Grand Hotel" becomes "Grand Hotel wedding venue" or "Grand Hotel logo".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Wedding venues; the default
    #[default]
    Venue,
    /// Wedding vendors, searched by logo
    Vendor,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Venue => "venue",
            SearchType::Vendor => "vendor",
        }
    }

    /// Query suffix sent to the image search engine
    pub fn query_suffix(&self) -> &'static str {
        match self {
            SearchType::Venue => "wedding venue",
            SearchType::Vendor => "logo",
        }
    }

    /// Build the full search query for a name
    pub fn query_for(&self, name: &str) -> String {
        format!("{} {}", name.trim(), self.query_suffix())
    }
}

impl std::str::FromStr for SearchType {
    type Err = VenueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "venue" => Ok(SearchType::Venue),
            "vendor" => Ok(SearchType::Vendor),
            other => Err(VenueError::UnknownSearchType(other.to_string())),
        }
    }
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_search_type_from_str() {
        assert_eq!("venue".parse::<SearchType>().unwrap(), SearchType::Venue);
        assert_eq!(" Vendor ".parse::<SearchType>().unwrap(), SearchType::Vendor);
        assert!("hotel".parse::<SearchType>().is_err());
    }

    #[test]
    fn test_query_for() {
        assert_eq!(SearchType::Venue.query_for("The Barn "), "The Barn wedding venue");
        assert_eq!(SearchType::Vendor.query_for("Bloom Florals"), "Bloom Florals logo");
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&SearchType::Vendor).unwrap();
        assert_eq!(json, "\"vendor\"");
        let parsed: SearchType = serde_json::from_str("\"venue\"").unwrap();
        assert_eq!(parsed, SearchType::Venue);
    }
}
