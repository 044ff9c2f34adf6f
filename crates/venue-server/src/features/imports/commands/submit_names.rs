//! Start an import from a JSON list of names

use mediator::Request;
use serde::{Deserialize, Serialize};

use super::{StartImportError, StartImportResponse};
use crate::batch::start_import;
use crate::features::imports::ImportContext;
use crate::features::shared::parse_search_type;

/// Filename recorded for imports that did not come from a file
pub const DEFAULT_IMPORT_FILENAME: &str = "api";

/// ```json
/// { "names": ["The Old Barn", "Bloom Florals"], "search_type": "venue" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitNamesCommand {
    pub names: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl Request<Result<StartImportResponse, StartImportError>> for SubmitNamesCommand {}

#[tracing::instrument(skip(ctx, command), fields(names = command.names.len()))]
pub async fn handle(
    ctx: ImportContext,
    command: SubmitNamesCommand,
) -> Result<StartImportResponse, StartImportError> {
    let search_type = parse_search_type(command.search_type.as_deref())?;
    let filename = command
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_IMPORT_FILENAME);

    let started = start_import(
        ctx.store.as_ref(),
        &ctx.queue,
        filename,
        search_type,
        &command.names,
        ctx.max_names,
    )
    .await?;

    Ok(StartImportResponse::new("Import started", started))
}
