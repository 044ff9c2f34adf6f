//! Batch import processing
//!
//! An import is a list of venue names. Each name becomes an item, and the
//! items of one import are searched strictly one after another:
//!
//! ```text
//! ingestion -> BatchQueue -> worker -> Sequencer::drain
//!                                        claim -> invoke -> settle -> claim ...
//!                                        nothing left -> mark_completed
//! ```
//!
//! Imports run concurrently with each other, one worker each. The
//! [`reaper::Reaper`] recovers items whose worker went away and re-queues
//! imports that are still pending, including after a restart.

pub mod ingestion;
pub mod memory;
pub mod postgres;
pub mod reaper;
pub mod sequencer;
pub mod store;
pub mod types;
pub mod worker;

pub use ingestion::{parse_venue_csv, start_import, IngestError, StartedImport};
pub use memory::InMemoryBatchStore;
pub use postgres::PgBatchStore;
pub use reaper::Reaper;
pub use sequencer::{DrainReport, Sequencer, SequencerSettings};
pub use store::{BatchStore, ImportStore, ItemStore, StoreError};
pub use types::{Claim, Import, ImportStatus, Item, ItemCounts, ItemStatus};
pub use worker::{spawn_workers, BatchQueue, QueueReceiver};
