//! Result limits for "most recent N" listings
//!
//! List endpoints take an optional `?limit=` query parameter. Missing values
//! fall back to [`DEFAULT_LIST_LIMIT`]; out-of-range values are clamped rather
//! than rejected.

use serde::{Deserialize, Serialize};

/// Rows returned when the caller does not ask for a limit
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Largest limit honoured
pub const MAX_LIST_LIMIT: i64 = 500;

/// Common `?limit=` request parameter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LimitParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

impl LimitParams {
    pub fn new(limit: Option<i64>) -> Self {
        Self { limit }
    }

    /// Effective limit, clamped to 1..=MAX_LIST_LIMIT
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limit() {
        assert_eq!(LimitParams::default().limit(), DEFAULT_LIST_LIMIT);
    }

    #[test]
    fn test_limit_clamping() {
        assert_eq!(LimitParams::new(Some(0)).limit(), 1);
        assert_eq!(LimitParams::new(Some(-5)).limit(), 1);
        assert_eq!(LimitParams::new(Some(10_000)).limit(), MAX_LIST_LIMIT);
        assert_eq!(LimitParams::new(Some(20)).limit(), 20);
    }
}
