//! Turning uploaded input into an import
//!
//! Input is either CSV text or a list of names. Both end up in
//! [`start_import`], which validates the names, creates the import and its
//! items, and queues the import for draining. Invalid input is rejected
//! before any row is written.

use thiserror::Error;
use venue_common::SearchType;

use super::store::{BatchStore, StoreError};
use super::types::Import;
use super::worker::{BatchQueue, Enqueued, QueueError};

/// Longest venue name accepted
pub const MAX_VENUE_NAME_LENGTH: usize = 256;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("No venue names found")]
    Empty,

    #[error("Too many venue names: {count} (maximum {max})")]
    TooMany { count: usize, max: usize },

    #[error("Venue name #{0} is empty")]
    BlankName(usize),

    #[error("Venue name #{position} is longer than {max} characters")]
    NameTooLong { position: usize, max: usize },

    #[error("Could not read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Extract venue names from CSV text
///
/// Empty lines are skipped. The first record is treated as a header when it
/// mentions "venue" or "name". The venue name is the first column with
/// double quotes removed and surrounding whitespace trimmed; records whose
/// name ends up empty are dropped.
pub fn parse_venue_csv(text: &str) -> Result<Vec<String>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut names = Vec::new();
    let mut first = true;

    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        if first {
            first = false;
            let line = record.iter().collect::<Vec<_>>().join(",").to_lowercase();
            if line.contains("venue") || line.contains("name") {
                continue;
            }
        }

        let name = record.get(0).unwrap_or_default().replace('"', "");
        let name = name.trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }

    Ok(names)
}

/// Trim and check a submitted list of names
pub fn validate_names(names: &[String], max_names: usize) -> Result<Vec<String>, IngestError> {
    if names.is_empty() {
        return Err(IngestError::Empty);
    }
    if names.len() > max_names {
        return Err(IngestError::TooMany {
            count: names.len(),
            max: max_names,
        });
    }

    names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let name = name.trim();
            if name.is_empty() {
                Err(IngestError::BlankName(index + 1))
            } else if name.chars().count() > MAX_VENUE_NAME_LENGTH {
                Err(IngestError::NameTooLong {
                    position: index + 1,
                    max: MAX_VENUE_NAME_LENGTH,
                })
            } else {
                Ok(name.to_string())
            }
        })
        .collect()
}

/// A freshly created import
#[derive(Debug, Clone)]
pub struct StartedImport {
    pub import: Import,
    pub total_venues: usize,
    pub queued: bool,
}

/// Create an import for `names` and queue it for draining
#[tracing::instrument(skip(store, queue, names), fields(names = names.len()))]
pub async fn start_import(
    store: &dyn BatchStore,
    queue: &BatchQueue,
    filename: &str,
    search_type: SearchType,
    names: &[String],
    max_names: usize,
) -> Result<StartedImport, IngestError> {
    let names = validate_names(names, max_names)?;

    let (import, items) = store
        .create_import_with_items(filename, search_type, &names)
        .await?;

    let queued = match queue.enqueue(import.id)? {
        Enqueued::Queued | Enqueued::AlreadyQueued => true,
        Enqueued::Deferred => false,
    };

    tracing::info!(import_id = %import.id, items = items.len(), queued, "Import created");

    Ok(StartedImport {
        import,
        total_venues: items.len(),
        queued,
    })
}
