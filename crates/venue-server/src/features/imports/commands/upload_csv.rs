//! Start an import from an uploaded CSV file

use mediator::Request;

use super::{StartImportError, StartImportResponse};
use crate::batch::{parse_venue_csv, start_import};
use crate::features::imports::ImportContext;
use crate::features::shared::parse_search_type;

/// Command built from a multipart upload
#[derive(Debug, Clone)]
pub struct UploadCsvCommand {
    pub filename: String,
    pub search_type: Option<String>,
    /// File contents, decoded as UTF-8
    pub content: String,
}

impl Request<Result<StartImportResponse, StartImportError>> for UploadCsvCommand {}

#[tracing::instrument(skip(ctx, command), fields(filename = %command.filename, bytes = command.content.len()))]
pub async fn handle(
    ctx: ImportContext,
    command: UploadCsvCommand,
) -> Result<StartImportResponse, StartImportError> {
    let search_type = parse_search_type(command.search_type.as_deref())?;
    let names = parse_venue_csv(&command.content)?;

    let started = start_import(
        ctx.store.as_ref(),
        &ctx.queue,
        &command.filename,
        search_type,
        &names,
        ctx.max_names,
    )
    .await?;

    Ok(StartImportResponse::new("CSV processing started", started))
}
