pub mod record_download;
pub mod run;

pub use record_download::{RecordDownloadCommand, RecordDownloadError, RecordDownloadResponse};
pub use run::{RunSearchCommand, RunSearchError};
