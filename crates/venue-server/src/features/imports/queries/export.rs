//! CSV export of completed items and their image URLs
//!
//! One row per completed item whose search found at least one image:
//!
//! ```text
//! "Venue Name","Image URLs"
//! "The Old Barn","https://a.example/1.jpg, https://a.example/2.jpg"
//! ```

use chrono::{NaiveDate, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Separator between URLs inside the second column
const URL_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportImportsQuery {}

/// A rendered export file
#[derive(Debug, Clone)]
pub struct ExportCsv {
    pub filename: String,
    pub content: Vec<u8>,
}

/// One exported venue
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ExportRow {
    pub venue_name: String,
    pub image_urls: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportImportsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Could not finish CSV: {0}")]
    Flush(String),
}

impl Request<Result<ExportCsv, ExportImportsError>> for ExportImportsQuery {}

/// `venue_images_YYYY-MM-DD.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("venue_images_{}.csv", date.format("%Y-%m-%d"))
}

/// Render rows with every cell quoted; rows without URLs are skipped
pub fn render_export_csv(rows: &[ExportRow]) -> Result<Vec<u8>, ExportImportsError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    writer.write_record(["Venue Name", "Image URLs"])?;
    for row in rows.iter().filter(|row| !row.image_urls.is_empty()) {
        let urls = row.image_urls.join(URL_SEPARATOR);
        writer.write_record([row.venue_name.as_str(), urls.as_str()])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportImportsError::Flush(e.to_string()))
}

#[tracing::instrument(skip(pool, _query))]
pub async fn handle(
    pool: PgPool,
    _query: ExportImportsQuery,
) -> Result<ExportCsv, ExportImportsError> {
    let rows = sqlx::query_as::<_, ExportRow>(
        r#"
        SELECT i.venue_name,
               ARRAY_AGG(img.image_url ORDER BY img.position) AS image_urls
        FROM venue_import_items i
        JOIN venue_images img ON img.search_id = i.search_id
        WHERE i.status = 'completed'
          AND i.search_id IS NOT NULL
        GROUP BY i.id, i.venue_name, i.created_at
        ORDER BY i.created_at, i.id
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let content = render_export_csv(&rows)?;

    tracing::info!(rows = rows.len(), bytes = content.len(), "Export rendered");

    Ok(ExportCsv {
        filename: export_filename(Utc::now().date_naive()),
        content,
    })
}
