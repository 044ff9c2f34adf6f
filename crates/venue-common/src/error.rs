//! Error types shared across the venue search crates

use thiserror::Error;

/// Result type alias for shared operations
pub type Result<T> = std::result::Result<T, VenueError>;

/// Errors raised by shared helpers and domain type parsing
#[derive(Error, Debug)]
pub enum VenueError {
    #[error("Unknown search type: '{0}' (expected 'venue' or 'vendor')")]
    UnknownSearchType(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VenueError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_search_type_message() {
        let err = VenueError::UnknownSearchType("hotel".to_string());
        assert!(err.to_string().contains("'hotel'"));
        assert!(err.to_string().contains("venue"));
    }

    #[test]
    fn test_config_helper() {
        let err = VenueError::config("SERPAPI_API_KEY is required");
        assert!(matches!(err, VenueError::Config(_)));
    }
}
