//! Run a single venue search
//!
//! The interactive counterpart of a batch item: the same [`SearchInvoker`]
//! runs the search and stores the images, the caller just waits for it.

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use venue_common::VenueError;

use crate::features::shared::validation::{
    parse_search_type, validate_venue_name, NameValidationError,
};
use crate::search::{SearchFailure, SearchInvoker, SearchOutcome};

/// Command to search images for one venue
///
/// ```rust,ignore
/// let command = RunSearchCommand {
///     venue_name: "The Old Barn".to_string(),
///     search_type: Some("venue".to_string()),
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSearchCommand {
    pub venue_name: String,

    /// `venue` (default) or `vendor`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_type: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RunSearchError {
    #[error("{0}")]
    NameValidation(#[from] NameValidationError),

    #[error("{0}")]
    SearchType(#[from] VenueError),

    #[error("{0}")]
    Failed(#[from] SearchFailure),
}

impl Request<Result<SearchOutcome, RunSearchError>> for RunSearchCommand {}

#[tracing::instrument(skip(invoker, command), fields(venue_name = %command.venue_name))]
pub async fn handle(
    invoker: Arc<dyn SearchInvoker>,
    command: RunSearchCommand,
) -> Result<SearchOutcome, RunSearchError> {
    let venue_name = validate_venue_name(&command.venue_name)?;
    let search_type = parse_search_type(command.search_type.as_deref())?;

    let outcome = invoker.invoke(&venue_name, search_type).await?;

    tracing::info!(
        search_id = %outcome.search_id,
        images = outcome.images.len(),
        "Search completed"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{FailureKind, FoundImage};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;
    use venue_common::SearchType;

    #[derive(Default)]
    struct RecordingInvoker {
        calls: Mutex<Vec<(String, SearchType)>>,
    }

    #[async_trait]
    impl SearchInvoker for RecordingInvoker {
        async fn invoke(
            &self,
            venue_name: &str,
            search_type: SearchType,
        ) -> Result<SearchOutcome, SearchFailure> {
            self.calls
                .lock()
                .unwrap()
                .push((venue_name.to_string(), search_type));

            if venue_name == "Nowhere" {
                return Err(SearchFailure::new(
                    FailureKind::NoResults,
                    "No images found for 'Nowhere'",
                ));
            }

            Ok(SearchOutcome {
                search_id: Uuid::new_v4(),
                venue_name: venue_name.to_string(),
                search_type,
                images: vec![FoundImage {
                    image_url: "https://img.example.com/1.jpg".to_string(),
                    alt_text: venue_name.to_string(),
                }],
                hotel: None,
            })
        }
    }

    #[tokio::test]
    async fn test_run_search_trims_name_and_parses_type() {
        let invoker = Arc::new(RecordingInvoker::default());
        let command = RunSearchCommand {
            venue_name: "  Bloom Florals ".to_string(),
            search_type: Some("vendor".to_string()),
        };

        let outcome = handle(invoker.clone(), command).await.unwrap();
        assert_eq!(outcome.venue_name, "Bloom Florals");
        assert_eq!(
            invoker.calls.lock().unwrap().as_slice(),
            &[("Bloom Florals".to_string(), SearchType::Vendor)]
        );
    }

    #[tokio::test]
    async fn test_blank_name_never_reaches_invoker() {
        let invoker = Arc::new(RecordingInvoker::default());
        let command = RunSearchCommand {
            venue_name: "   ".to_string(),
            search_type: None,
        };

        let err = handle(invoker.clone(), command).await.unwrap_err();
        assert!(matches!(err, RunSearchError::NameValidation(NameValidationError::Required)));
        assert!(invoker.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_search_type_is_rejected() {
        let invoker = Arc::new(RecordingInvoker::default());
        let command = RunSearchCommand {
            venue_name: "The Old Barn".to_string(),
            search_type: Some("caterer".to_string()),
        };

        let err = handle(invoker, command).await.unwrap_err();
        assert!(matches!(err, RunSearchError::SearchType(_)));
    }

    #[tokio::test]
    async fn test_invoker_failure_is_returned() {
        let invoker = Arc::new(RecordingInvoker::default());
        let command = RunSearchCommand {
            venue_name: "Nowhere".to_string(),
            search_type: None,
        };

        let err = handle(invoker, command).await.unwrap_err();
        match err {
            RunSearchError::Failed(failure) => assert_eq!(failure.kind, FailureKind::NoResults),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
