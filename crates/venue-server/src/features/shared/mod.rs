//! Shared utilities and types for feature modules
//!
//! - **limit**: the `?limit=` parameter of list endpoints
//! - **validation**: input checks shared by commands

pub mod limit;
pub mod validation;

pub use limit::LimitParams;
pub use validation::{parse_search_type, validate_venue_name, NameValidationError};
