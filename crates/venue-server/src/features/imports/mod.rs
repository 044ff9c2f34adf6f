pub mod commands;
pub mod queries;
pub mod routes;

use std::sync::Arc;

use crate::batch::{BatchQueue, BatchStore};

pub use commands::{
    StartImportError, StartImportResponse, SubmitNamesCommand, UploadCsvCommand,
};

pub use queries::{
    ExportCsv, ExportImportsError, ExportImportsQuery, GetImportError, GetImportQuery,
    ImportDetail, ListImportItemsError, ListImportItemsQuery, ListImportsError,
    ListImportsQuery, RecentItemsError, RecentItemsQuery,
};

pub use routes::imports_routes;

/// What the import commands and queries run against
#[derive(Clone)]
pub struct ImportContext {
    pub store: Arc<dyn BatchStore>,
    pub queue: BatchQueue,
    pub max_names: usize,
}
