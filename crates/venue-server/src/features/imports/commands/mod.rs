pub mod submit_names;
pub mod upload_csv;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use venue_common::{SearchType, VenueError};

use crate::batch::{IngestError, StartedImport};

pub use submit_names::SubmitNamesCommand;
pub use upload_csv::UploadCsvCommand;

/// Returned when an import has been accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartImportResponse {
    pub message: String,
    pub import_id: Uuid,
    pub filename: String,
    pub search_type: SearchType,
    pub total_venues: usize,
    /// False when the queue was full; the import then starts on the next sweep
    pub queued: bool,
}

impl StartImportResponse {
    fn new(message: &str, started: StartedImport) -> Self {
        Self {
            message: message.to_string(),
            import_id: started.import.id,
            filename: started.import.filename,
            search_type: started.import.search_type,
            total_venues: started.total_venues,
            queued: started.queued,
        }
    }
}

/// Errors shared by both ways of starting an import
#[derive(Debug, thiserror::Error)]
pub enum StartImportError {
    #[error("{0}")]
    SearchType(#[from] VenueError),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}
