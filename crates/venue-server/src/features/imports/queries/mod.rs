pub mod export;
pub mod get_import;
pub mod list_imports;
pub mod list_items;
pub mod recent_items;

pub use export::{ExportCsv, ExportImportsError, ExportImportsQuery};
pub use get_import::{GetImportError, GetImportQuery, ImportDetail};
pub use list_imports::{ListImportsError, ListImportsQuery};
pub use list_items::{ListImportItemsError, ListImportItemsQuery};
pub use recent_items::{RecentItemsError, RecentItemsQuery};
