//! PostgreSQL batch store
//!
//! `claim_next` holds a row lock on the import while it checks for an
//! in-flight item and picks the next pending one, so two workers draining
//! the same import can never both hold an item.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use std::time::Duration;
use uuid::Uuid;
use venue_common::SearchType;

use super::store::{check_settlement, check_terminal, ImportStore, ItemStore, StoreError};
use super::types::{
    abandoned_message, Claim, Import, ImportStatus, Item, ItemCounts, ItemStatus, ReclaimedItem,
};

const IMPORT_COLUMNS: &str = "id, filename, search_type, status, created_at, completed_at";

const ITEM_COLUMNS: &str = "id, import_id, venue_name, search_type, status, error_message, \
     search_id, position, attempts, lease_owner, lease_expires_at, started_at, finished_at, \
     created_at";

#[derive(Debug, FromRow)]
struct ImportRow {
    id: Uuid,
    filename: String,
    search_type: String,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ImportRow> for Import {
    type Error = StoreError;

    fn try_from(row: ImportRow) -> Result<Self, Self::Error> {
        Ok(Import {
            id: row.id,
            filename: row.filename,
            search_type: parse_search_type(&row.search_type)?,
            status: row.status.parse()?,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    import_id: Uuid,
    venue_name: String,
    search_type: String,
    status: String,
    error_message: Option<String>,
    search_id: Option<Uuid>,
    position: i32,
    attempts: i32,
    lease_owner: Option<String>,
    lease_expires_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for Item {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Item {
            id: row.id,
            import_id: row.import_id,
            venue_name: row.venue_name,
            search_type: parse_search_type(&row.search_type)?,
            status: row.status.parse()?,
            error_message: row.error_message,
            search_id: row.search_id,
            position: row.position,
            attempts: row.attempts,
            lease_owner: row.lease_owner,
            lease_expires_at: row.lease_expires_at,
            started_at: row.started_at,
            finished_at: row.finished_at,
            created_at: row.created_at,
        })
    }
}

fn parse_search_type(value: &str) -> Result<SearchType, StoreError> {
    value
        .parse()
        .map_err(|e: venue_common::VenueError| StoreError::Corrupt(e.to_string()))
}

fn to_items(rows: Vec<ItemRow>) -> Result<Vec<Item>, StoreError> {
    rows.into_iter().map(Item::try_from).collect()
}

fn lease_secs(lease: Duration) -> f64 {
    lease.as_secs_f64()
}

async fn insert_import(
    conn: &mut PgConnection,
    filename: &str,
    search_type: SearchType,
) -> Result<Import, StoreError> {
    let row = sqlx::query_as::<_, ImportRow>(&format!(
        "INSERT INTO venue_csv_imports (filename, search_type) VALUES ($1, $2) RETURNING {}",
        IMPORT_COLUMNS
    ))
    .bind(filename)
    .bind(search_type.as_str())
    .fetch_one(&mut *conn)
    .await?;

    row.try_into()
}

async fn insert_items(
    conn: &mut PgConnection,
    import_id: Uuid,
    search_type: SearchType,
    names: &[String],
) -> Result<Vec<Item>, StoreError> {
    // One statement, one base timestamp; the ordinal offset keeps
    // created_at strictly increasing in input order.
    let rows = sqlx::query_as::<_, ItemRow>(&format!(
        r#"
        INSERT INTO venue_import_items (import_id, venue_name, search_type, position, created_at)
        SELECT $1, t.name, $2, (t.ord - 1)::int, NOW() + (t.ord - 1)::double precision * INTERVAL '1 microsecond'
        FROM UNNEST($3::text[]) WITH ORDINALITY AS t(name, ord)
        RETURNING {}
        "#,
        ITEM_COLUMNS
    ))
    .bind(import_id)
    .bind(search_type.as_str())
    .bind(names)
    .fetch_all(&mut *conn)
    .await?;

    let mut items = to_items(rows)?;
    items.sort_by_key(|item| item.position);
    Ok(items)
}

/// Batch store backed by `venue_csv_imports` and `venue_import_items`
#[derive(Clone)]
pub struct PgBatchStore {
    pool: PgPool,
}

impl PgBatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ImportStore for PgBatchStore {
    #[tracing::instrument(skip(self))]
    async fn create_import(
        &self,
        filename: &str,
        search_type: SearchType,
    ) -> Result<Import, StoreError> {
        let mut conn = self.pool.acquire().await?;
        insert_import(&mut conn, filename, search_type).await
    }

    #[tracing::instrument(skip(self, names), fields(count = names.len()))]
    async fn create_import_with_items(
        &self,
        filename: &str,
        search_type: SearchType,
        names: &[String],
    ) -> Result<(Import, Vec<Item>), StoreError> {
        let mut tx = self.pool.begin().await?;
        let import = insert_import(&mut tx, filename, search_type).await?;
        let items = insert_items(&mut tx, import.id, search_type, names).await?;
        tx.commit().await?;

        Ok((import, items))
    }

    #[tracing::instrument(skip(self))]
    async fn mark_completed(&self, import_id: Uuid) -> Result<Import, StoreError> {
        let updated = sqlx::query_as::<_, ImportRow>(&format!(
            r#"
            UPDATE venue_csv_imports
            SET status = 'completed', completed_at = NOW()
            WHERE id = $1
              AND status <> 'completed'
              AND NOT EXISTS (
                  SELECT 1 FROM venue_import_items
                  WHERE import_id = $1 AND status IN ('pending', 'processing')
              )
            RETURNING {}
            "#,
            IMPORT_COLUMNS
        ))
        .bind(import_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return row.try_into();
        }

        let import = self.get_import(import_id).await?;
        match import.status {
            ImportStatus::Completed => Ok(import),
            ImportStatus::Pending => Err(StoreError::NotDrained(import_id)),
        }
    }

    async fn get_import(&self, import_id: Uuid) -> Result<Import, StoreError> {
        sqlx::query_as::<_, ImportRow>(&format!(
            "SELECT {} FROM venue_csv_imports WHERE id = $1",
            IMPORT_COLUMNS
        ))
        .bind(import_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::ImportNotFound(import_id))?
        .try_into()
    }

    async fn list_recent_imports(&self, limit: i64) -> Result<Vec<Import>, StoreError> {
        let rows = sqlx::query_as::<_, ImportRow>(&format!(
            "SELECT {} FROM venue_csv_imports ORDER BY created_at DESC LIMIT $1",
            IMPORT_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Import::try_from).collect()
    }

    async fn pending_imports(&self) -> Result<Vec<Uuid>, StoreError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM venue_csv_imports WHERE status = 'pending' ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

#[async_trait]
impl ItemStore for PgBatchStore {
    #[tracing::instrument(skip(self, names), fields(count = names.len()))]
    async fn create_items(
        &self,
        import_id: Uuid,
        names: &[String],
    ) -> Result<Vec<Item>, StoreError> {
        let import = self.get_import(import_id).await?;
        let mut conn = self.pool.acquire().await?;
        insert_items(&mut conn, import_id, import.search_type, names).await
    }

    #[tracing::instrument(skip(self, error_message))]
    async fn set_status(
        &self,
        item_id: Uuid,
        status: ItemStatus,
        error_message: Option<&str>,
        search_id: Option<Uuid>,
    ) -> Result<Item, StoreError> {
        check_settlement(status, error_message, search_id)?;

        let mut tx = self.pool.begin().await?;

        let current: String =
            sqlx::query_scalar("SELECT status FROM venue_import_items WHERE id = $1 FOR UPDATE")
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StoreError::ItemNotFound(item_id))?;
        let current: ItemStatus = current.parse()?;

        if !current.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                item_id,
                from: current,
                to: status,
            });
        }

        let sql = match status {
            ItemStatus::Processing => format!(
                r#"
                UPDATE venue_import_items
                SET status = 'processing', attempts = attempts + 1, started_at = NOW()
                WHERE id = $1
                RETURNING {}
                "#,
                ITEM_COLUMNS
            ),
            ItemStatus::Completed => format!(
                r#"
                UPDATE venue_import_items
                SET status = 'completed', search_id = $2, error_message = NULL,
                    finished_at = NOW(), lease_owner = NULL, lease_expires_at = NULL
                WHERE id = $1
                RETURNING {}
                "#,
                ITEM_COLUMNS
            ),
            ItemStatus::Error => format!(
                r#"
                UPDATE venue_import_items
                SET status = 'error', error_message = $2,
                    finished_at = NOW(), lease_owner = NULL, lease_expires_at = NULL
                WHERE id = $1
                RETURNING {}
                "#,
                ITEM_COLUMNS
            ),
            ItemStatus::Pending => {
                return Err(StoreError::InvalidTransition {
                    item_id,
                    from: current,
                    to: status,
                })
            }
        };

        let mut query = sqlx::query_as::<_, ItemRow>(&sql).bind(item_id);
        match status {
            ItemStatus::Completed => query = query.bind(search_id),
            ItemStatus::Error => query = query.bind(error_message),
            _ => {}
        }
        let row = query.fetch_one(&mut *tx).await?;

        tx.commit().await?;
        row.try_into()
    }

    #[tracing::instrument(skip(self, error_message))]
    async fn settle(
        &self,
        item_id: Uuid,
        owner: &str,
        status: ItemStatus,
        error_message: Option<&str>,
        search_id: Option<Uuid>,
    ) -> Result<Item, StoreError> {
        check_terminal(status)?;
        check_settlement(status, error_message, search_id)?;

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE venue_import_items
            SET status = $3,
                search_id = $4,
                error_message = $5,
                finished_at = NOW(),
                lease_owner = NULL,
                lease_expires_at = NULL
            WHERE id = $1 AND status = 'processing' AND lease_owner = $2
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(item_id)
        .bind(owner)
        .bind(status.as_str())
        .bind(if status == ItemStatus::Completed { search_id } else { None })
        .bind(if status == ItemStatus::Error { error_message } else { None })
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return row.try_into();
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM venue_import_items WHERE id = $1)")
                .bind(item_id)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            Err(StoreError::LeaseLost(item_id))
        } else {
            Err(StoreError::ItemNotFound(item_id))
        }
    }

    async fn next_pending(&self, import_id: Uuid) -> Result<Option<Item>, StoreError> {
        sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            SELECT {} FROM venue_import_items
            WHERE import_id = $1 AND status = 'pending'
            ORDER BY created_at, position
            LIMIT 1
            "#,
            ITEM_COLUMNS
        ))
        .bind(import_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Item::try_from)
        .transpose()
    }

    #[tracing::instrument(skip(self, lease))]
    async fn claim_next(
        &self,
        import_id: Uuid,
        owner: &str,
        lease: Duration,
    ) -> Result<Claim, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serialises claims for this import.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM venue_csv_imports WHERE id = $1 FOR UPDATE")
                .bind(import_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(StoreError::ImportNotFound(import_id));
        }

        let busy: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM venue_import_items
                WHERE import_id = $1 AND status = 'processing'
            )
            "#,
        )
        .bind(import_id)
        .fetch_one(&mut *tx)
        .await?;
        if busy {
            tx.commit().await?;
            return Ok(Claim::Busy);
        }

        let claimed = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE venue_import_items
            SET status = 'processing',
                attempts = attempts + 1,
                lease_owner = $2,
                lease_expires_at = NOW() + make_interval(secs => $3),
                started_at = NOW()
            WHERE id = (
                SELECT id FROM venue_import_items
                WHERE import_id = $1 AND status = 'pending'
                ORDER BY created_at, position
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(import_id)
        .bind(owner)
        .bind(lease_secs(lease))
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        match claimed {
            Some(row) => Ok(Claim::Claimed(row.try_into()?)),
            None => Ok(Claim::Drained),
        }
    }

    async fn renew_lease(
        &self,
        item_id: Uuid,
        owner: &str,
        lease: Duration,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE venue_import_items
            SET lease_expires_at = NOW() + make_interval(secs => $3)
            WHERE id = $1 AND status = 'processing' AND lease_owner = $2
            "#,
        )
        .bind(item_id)
        .bind(owner)
        .bind(lease_secs(lease))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::LeaseLost(item_id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn reclaim_expired(&self, max_attempts: i32) -> Result<Vec<ReclaimedItem>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let expired: Vec<(Uuid, Uuid, i32)> = sqlx::query_as(
            r#"
            SELECT id, import_id, attempts FROM venue_import_items
            WHERE status = 'processing' AND lease_expires_at < NOW()
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut reclaimed = Vec::with_capacity(expired.len());
        for (item_id, import_id, attempts) in expired {
            let requeued = attempts < max_attempts;
            if requeued {
                sqlx::query(
                    r#"
                    UPDATE venue_import_items
                    SET status = 'pending', started_at = NULL,
                        lease_owner = NULL, lease_expires_at = NULL
                    WHERE id = $1
                    "#,
                )
                .bind(item_id)
                .execute(&mut *tx)
                .await?;
            } else {
                sqlx::query(
                    r#"
                    UPDATE venue_import_items
                    SET status = 'error', error_message = $2, finished_at = NOW(),
                        lease_owner = NULL, lease_expires_at = NULL
                    WHERE id = $1
                    "#,
                )
                .bind(item_id)
                .bind(abandoned_message(attempts))
                .execute(&mut *tx)
                .await?;
            }

            reclaimed.push(ReclaimedItem {
                item_id,
                import_id,
                requeued,
            });
        }

        tx.commit().await?;
        Ok(reclaimed)
    }

    async fn list_recent_items(&self, limit: i64) -> Result<Vec<Item>, StoreError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM venue_import_items ORDER BY created_at DESC LIMIT $1",
            ITEM_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        to_items(rows)
    }

    async fn list_items(&self, import_id: Uuid) -> Result<Vec<Item>, StoreError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM venue_import_items WHERE import_id = $1 ORDER BY created_at, position",
            ITEM_COLUMNS
        ))
        .bind(import_id)
        .fetch_all(&self.pool)
        .await?;

        to_items(rows)
    }

    async fn item_counts(&self, import_id: Uuid) -> Result<ItemCounts, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)
            FROM venue_import_items
            WHERE import_id = $1
            GROUP BY status
            "#,
        )
        .bind(import_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = ItemCounts::default();
        for (status, count) in rows {
            let status: ItemStatus = status.parse()?;
            counts.total += count;
            match status {
                ItemStatus::Pending => counts.pending = count,
                ItemStatus::Processing => counts.processing = count,
                ItemStatus::Completed => counts.completed = count,
                ItemStatus::Error => counts.error = count,
            }
        }
        Ok(counts)
    }
}
