//! Database operations for artists.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use maple_spruce_core::{ArtistId, Email, RecordStatus};

use super::RepositoryError;
use crate::models::{Artist, ArtistFilter, CreateArtistInput, UpdateArtistInput};

const COLUMNS: &str = "id, name, email, phone, bio, commission_rate, status, webflow_item_id, \
                       created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ArtistRow {
    id: i32,
    name: String,
    email: String,
    phone: Option<String>,
    bio: Option<String>,
    commission_rate: Decimal,
    status: RecordStatus,
    webflow_item_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ArtistRow> for Artist {
    type Error = RepositoryError;

    fn try_from(row: ArtistRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email for artist {}: {e}", row.id))
        })?;

        Ok(Self {
            id: ArtistId::new(row.id),
            name: row.name,
            email,
            phone: row.phone,
            bio: row.bio,
            commission_rate: row.commission_rate,
            status: row.status,
            webflow_item_id: row.webflow_item_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for artist database operations.
pub struct ArtistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ArtistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a validated artist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, input: &CreateArtistInput) -> Result<Artist, RepositoryError> {
        let row = sqlx::query_as::<_, ArtistRow>(&format!(
            "INSERT INTO artists (name, email, phone, bio, commission_rate, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.email)
        .bind(input.phone.is_some())
        .bind(input.phone.as_deref())
        .bind(input.bio.is_some())
        .bind(input.bio.as_deref())
        .bind(input.commission_rate)
        .bind(input.status)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ArtistId) -> Result<Option<Artist>, RepositoryError> {
        let row = sqlx::query_as::<_, ArtistRow>(&format!(
            "SELECT {COLUMNS} FROM artists WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ArtistFilter) -> Result<Vec<Artist>, RepositoryError> {
        let rows = sqlx::query_as::<_, ArtistRow>(&format!(
            "SELECT {COLUMNS} FROM artists \
             WHERE ($1::record_status IS NULL OR status = $1) \
             ORDER BY name"
        ))
        .bind(filter.status)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Merge a partial update into the stored artist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the artist does not exist.
    pub async fn update(
        &self,
        id: ArtistId,
        input: &UpdateArtistInput,
    ) -> Result<Artist, RepositoryError> {
        let row = sqlx::query_as::<_, ArtistRow>(&format!(
            "UPDATE artists SET \
                name = COALESCE($2, name), \
                email = COALESCE($3, email), \
                phone = CASE WHEN $4 THEN $5 ELSE phone END, \
                bio = CASE WHEN $6 THEN $7 ELSE bio END, \
                commission_rate = COALESCE($8, commission_rate), \
                status = COALESCE($9, status) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(&input.name)
        .bind(&input.email)
        .bind(input.phone.is_some())
        .bind(input.phone.as_ref().and_then(Option::as_ref))
        .bind(input.bio.is_some())
        .bind(input.bio.as_ref().and_then(Option::as_ref))
        .bind(input.commission_rate)
        .bind(input.status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Record (or clear) the Webflow CMS item for the artist's profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the artist does not exist.
    pub async fn set_webflow_item(
        &self,
        id: ArtistId,
        item_id: Option<&str>,
    ) -> Result<Artist, RepositoryError> {
        let row = sqlx::query_as::<_, ArtistRow>(&format!(
            "UPDATE artists SET webflow_item_id = $2 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(item_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the artist does not exist.
    pub async fn delete(&self, id: ArtistId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM artists WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Number of products attributed to the artist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_count(&self, id: ArtistId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE artist_id = $1")
            .bind(id.as_i32())
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: ArtistId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM artists WHERE id = $1)")
            .bind(id.as_i32())
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }
}
