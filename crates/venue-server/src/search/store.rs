//! Persistence for searches and their images

use sqlx::PgPool;
use uuid::Uuid;
use venue_common::SearchType;

use super::types::{FoundImage, HotelDetails, ImageRecord, SearchRecord};

/// Reads and writes `venue_searches` / `venue_images`
#[derive(Clone)]
pub struct SearchStore {
    pool: PgPool,
}

impl SearchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert one search row and its images in a single transaction
    #[tracing::instrument(skip(self, images, hotel), fields(images = images.len()))]
    pub async fn save_search(
        &self,
        venue_name: &str,
        search_type: SearchType,
        images: &[FoundImage],
        hotel: Option<&HotelDetails>,
    ) -> Result<Uuid, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let search_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO venue_searches
                (venue_name, search_type, hotel_id, hotel_details, address, description,
                 website, amenities, room_count, contact_details)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(venue_name)
        .bind(search_type.as_str())
        .bind(hotel.and_then(|h| h.hotel_id.clone()))
        .bind(hotel.map(|h| h.raw.clone()))
        .bind(hotel.and_then(|h| h.address.clone()))
        .bind(hotel.and_then(|h| h.description.clone()))
        .bind(hotel.and_then(|h| h.website.clone()))
        .bind(hotel.map(|h| h.amenities.clone()))
        .bind(hotel.and_then(|h| h.room_count))
        .bind(hotel.and_then(|h| h.contact_details.clone()))
        .fetch_one(&mut *tx)
        .await?;

        for (position, image) in images.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO venue_images (search_id, venue_name, image_url, alt_text, position)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(search_id)
            .bind(venue_name)
            .bind(&image.image_url)
            .bind(&image.alt_text)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(search_id)
    }

    /// Past searches, newest first
    pub async fn list_searches(&self, limit: i64) -> Result<Vec<SearchRecord>, sqlx::Error> {
        sqlx::query_as::<_, SearchRecord>(
            r#"
            SELECT id, venue_name, search_type, download_count, hotel_id, address,
                   description, website, amenities, room_count, created_at
            FROM venue_searches
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_search(&self, search_id: Uuid) -> Result<Option<SearchRecord>, sqlx::Error> {
        sqlx::query_as::<_, SearchRecord>(
            r#"
            SELECT id, venue_name, search_type, download_count, hotel_id, address,
                   description, website, amenities, room_count, created_at
            FROM venue_searches
            WHERE id = $1
            "#,
        )
        .bind(search_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Images of one search in result order
    pub async fn images_for(&self, search_id: Uuid) -> Result<Vec<ImageRecord>, sqlx::Error> {
        sqlx::query_as::<_, ImageRecord>(
            r#"
            SELECT id, search_id, venue_name, image_url, alt_text, position, created_at
            FROM venue_images
            WHERE search_id = $1
            ORDER BY position
            "#,
        )
        .bind(search_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Bump the download counter; returns the new value, `None` if the search is unknown
    pub async fn record_download(&self, search_id: Uuid) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            UPDATE venue_searches
            SET download_count = download_count + 1
            WHERE id = $1
            RETURNING download_count
            "#,
        )
        .bind(search_id)
        .fetch_optional(&self.pool)
        .await
    }
}
