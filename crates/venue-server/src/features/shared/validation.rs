//! Shared validation utilities
//!
//! ```rust,ignore
//! use venue_server::features::shared::validation::{validate_venue_name, parse_search_type};
//!
//! let name = validate_venue_name("  The Old Barn ")?;
//! let search_type = parse_search_type(Some("vendor"))?;
//! ```

use thiserror::Error;
use venue_common::{SearchType, VenueError};

use crate::batch::ingestion::MAX_VENUE_NAME_LENGTH;

/// Errors that can occur during venue name validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameValidationError {
    #[error("Venue name is required and cannot be empty")]
    Required,

    #[error("Venue name must be between 1 and {max_length} characters")]
    TooLong { max_length: usize },
}

/// Validate a single venue name and return it trimmed
pub fn validate_venue_name(name: &str) -> Result<String, NameValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(NameValidationError::Required);
    }

    if name.chars().count() > MAX_VENUE_NAME_LENGTH {
        return Err(NameValidationError::TooLong {
            max_length: MAX_VENUE_NAME_LENGTH,
        });
    }

    Ok(name.to_string())
}

/// Parse an optional search type, defaulting to `venue`
///
/// Blank values count as missing, which is what an empty multipart field
/// produces.
pub fn parse_search_type(value: Option<&str>) -> Result<SearchType, VenueError> {
    match value.map(str::trim) {
        None | Some("") => Ok(SearchType::default()),
        Some(value) => value.parse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_venue_name() {
        assert_eq!(validate_venue_name("  The Old Barn ").unwrap(), "The Old Barn");
        assert_eq!(validate_venue_name("   "), Err(NameValidationError::Required));

        let long = "x".repeat(MAX_VENUE_NAME_LENGTH + 1);
        assert_eq!(
            validate_venue_name(&long),
            Err(NameValidationError::TooLong {
                max_length: MAX_VENUE_NAME_LENGTH
            })
        );
    }

    #[test]
    fn test_parse_search_type() {
        assert_eq!(parse_search_type(None).unwrap(), SearchType::Venue);
        assert_eq!(parse_search_type(Some("")).unwrap(), SearchType::Venue);
        assert_eq!(parse_search_type(Some("Vendor")).unwrap(), SearchType::Vendor);
        assert!(parse_search_type(Some("florist")).is_err());
    }
}
