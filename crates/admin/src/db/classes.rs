//! Database operations for classes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use maple_spruce_core::{CategoryId, ClassId, ClassStatus, InstructorId};

use super::RepositoryError;
use crate::models::{Class, ClassDetail, ClassFilter, CreateClassInput, UpdateClassInput};

const COLUMNS: &str = "c.id, c.title, c.description, c.category_id, c.instructor_id, \
                       c.starts_at, c.ends_at, c.capacity, c.price, c.location, c.status, \
                       c.webflow_item_id, c.created_at, c.updated_at";

/// Seats held by pending and confirmed registrations for class `c`.
const SEATS_TAKEN: &str = "(SELECT COALESCE(SUM(r.seats), 0)::bigint FROM registrations r \
                           WHERE r.class_id = c.id AND r.status IN ('pending', 'confirmed')) \
                           AS seats_taken";

#[derive(Debug, sqlx::FromRow)]
struct ClassRow {
    id: i32,
    title: String,
    description: Option<String>,
    category_id: Option<i32>,
    instructor_id: Option<i32>,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    capacity: i32,
    price: Decimal,
    location: Option<String>,
    status: ClassStatus,
    webflow_item_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ClassRow> for Class {
    fn from(row: ClassRow) -> Self {
        Self {
            id: ClassId::new(row.id),
            title: row.title,
            description: row.description,
            category_id: row.category_id.map(CategoryId::new),
            instructor_id: row.instructor_id.map(InstructorId::new),
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            capacity: row.capacity,
            price: row.price,
            location: row.location,
            status: row.status,
            webflow_item_id: row.webflow_item_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ClassDetailRow {
    #[sqlx(flatten)]
    class: ClassRow,
    seats_taken: i64,
}

impl From<ClassDetailRow> for ClassDetail {
    fn from(row: ClassDetailRow) -> Self {
        Self::new(row.class.into(), row.seats_taken)
    }
}

/// Repository for class database operations.
pub struct ClassRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ClassRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a validated class as a draft.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, input: &CreateClassInput) -> Result<Class, RepositoryError> {
        let row = sqlx::query_as::<_, ClassRow>(&format!(
            "INSERT INTO classes AS c \
                (title, description, category_id, instructor_id, starts_at, ends_at, \
                 capacity, price, location) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        ))
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.category_id.map(|id| id.as_i32()))
        .bind(input.instructor_id.map(|id| id.as_i32()))
        .bind(input.starts_at)
        .bind(input.ends_at)
        .bind(input.capacity)
        .bind(input.price)
        .bind(&input.location)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ClassId) -> Result<Option<Class>, RepositoryError> {
        let row = sqlx::query_as::<_, ClassRow>(&format!(
            "SELECT {COLUMNS} FROM classes c WHERE c.id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get a class with its seat usage.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_detail(&self, id: ClassId) -> Result<Option<ClassDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, ClassDetailRow>(&format!(
            "SELECT {COLUMNS}, {SEATS_TAKEN} FROM classes c WHERE c.id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ClassFilter) -> Result<Vec<ClassDetail>, RepositoryError> {
        let rows = sqlx::query_as::<_, ClassDetailRow>(&format!(
            "SELECT {COLUMNS}, {SEATS_TAKEN} FROM classes c \
             WHERE ($1::class_status IS NULL OR c.status = $1) \
               AND ($2::int IS NULL OR c.instructor_id = $2) \
               AND ($3::int IS NULL OR c.category_id = $3) \
               AND (NOT $4 OR c.starts_at > NOW()) \
             ORDER BY c.starts_at, c.id"
        ))
        .bind(filter.status)
        .bind(filter.instructor_id.map(|id| id.as_i32()))
        .bind(filter.category_id.map(|id| id.as_i32()))
        .bind(filter.upcoming_only)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Merge a partial update into the stored class.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the class does not exist.
    pub async fn update(
        &self,
        id: ClassId,
        input: &UpdateClassInput,
    ) -> Result<Class, RepositoryError> {
        Self::update_with(self.pool, id, input).await
    }

    /// [`Self::update`] on a caller-supplied connection, so a capacity change
    /// can be checked and written under the lock from [`Self::lock_detail`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the class does not exist.
    pub async fn update_with<'e, E>(
        executor: E,
        id: ClassId,
        input: &UpdateClassInput,
    ) -> Result<Class, RepositoryError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, ClassRow>(&format!(
            "UPDATE classes AS c SET \
                title = COALESCE($2, title), \
                description = CASE WHEN $3 THEN $4 ELSE description END, \
                category_id = CASE WHEN $5 THEN $6 ELSE category_id END, \
                instructor_id = CASE WHEN $7 THEN $8 ELSE instructor_id END, \
                starts_at = COALESCE($9, starts_at), \
                ends_at = COALESCE($10, ends_at), \
                capacity = COALESCE($11, capacity), \
                price = COALESCE($12, price), \
                location = CASE WHEN $13 THEN $14 ELSE location END, \
                status = COALESCE($15, status) \
             WHERE c.id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(&input.title)
        .bind(input.description.is_some())
        .bind(input.description.as_ref().and_then(Option::as_ref))
        .bind(input.category_id.is_some())
        .bind(input.category_id.flatten().map(|id| id.as_i32()))
        .bind(input.instructor_id.is_some())
        .bind(input.instructor_id.flatten().map(|id| id.as_i32()))
        .bind(input.starts_at)
        .bind(input.ends_at)
        .bind(input.capacity)
        .bind(input.price)
        .bind(input.location.is_some())
        .bind(input.location.as_ref().and_then(Option::as_ref))
        .bind(input.status)
        .fetch_optional(executor)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Set the status and Webflow item together after a publish/unpublish.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the class does not exist.
    pub async fn set_publication(
        &self,
        id: ClassId,
        status: ClassStatus,
        webflow_item_id: Option<&str>,
    ) -> Result<Class, RepositoryError> {
        let row = sqlx::query_as::<_, ClassRow>(&format!(
            "UPDATE classes AS c SET status = $2, webflow_item_id = $3 \
             WHERE c.id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(status)
        .bind(webflow_item_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the class does not exist.
    pub async fn delete(&self, id: ClassId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Number of registrations for the class that are not cancelled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_registration_count(&self, id: ClassId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM registrations WHERE class_id = $1 AND status <> 'cancelled'",
        )
        .bind(id.as_i32())
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Seats held by pending and confirmed registrations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn seats_taken(&self, id: ClassId) -> Result<i64, RepositoryError> {
        let taken: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(seats), 0)::bigint FROM registrations \
             WHERE class_id = $1 AND status IN ('pending', 'confirmed')",
        )
        .bind(id.as_i32())
        .fetch_one(self.pool)
        .await?;
        Ok(taken)
    }

    /// Lock the class row for the rest of `tx` and return it with its seat
    /// usage, so concurrent registrations cannot oversell it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_detail(
        tx: &mut Transaction<'_, Postgres>,
        id: ClassId,
    ) -> Result<Option<ClassDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, ClassRow>(&format!(
            "SELECT {COLUMNS} FROM classes c WHERE c.id = $1 FOR UPDATE"
        ))
        .bind(id.as_i32())
        .fetch_optional(&mut **tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let taken: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(seats), 0)::bigint FROM registrations \
             WHERE class_id = $1 AND status IN ('pending', 'confirmed')",
        )
        .bind(id.as_i32())
        .fetch_one(&mut **tx)
        .await?;

        Ok(Some(ClassDetail::new(row.into(), taken)))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: ClassId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM classes WHERE id = $1)")
            .bind(id.as_i32())
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }
}
