//! Database operations for instructors.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use maple_spruce_core::{Email, InstructorId, RecordStatus};

use super::RepositoryError;
use crate::models::{CreateInstructorInput, Instructor, InstructorFilter, UpdateInstructorInput};

const COLUMNS: &str = "id, name, email, phone, bio, specialties, status, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct InstructorRow {
    id: i32,
    name: String,
    email: String,
    phone: Option<String>,
    bio: Option<String>,
    specialties: Vec<String>,
    status: RecordStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InstructorRow> for Instructor {
    type Error = RepositoryError;

    fn try_from(row: InstructorRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "invalid email for instructor {}: {e}",
                row.id
            ))
        })?;

        Ok(Self {
            id: InstructorId::new(row.id),
            name: row.name,
            email,
            phone: row.phone,
            bio: row.bio,
            specialties: row.specialties,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for instructor database operations.
pub struct InstructorRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InstructorRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        input: &CreateInstructorInput,
    ) -> Result<Instructor, RepositoryError> {
        let row = sqlx::query_as::<_, InstructorRow>(&format!(
            "INSERT INTO instructors (name, email, phone, bio, specialties, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.email)
        .bind(input.phone.is_some())
        .bind(input.phone.as_deref())
        .bind(input.bio.is_some())
        .bind(input.bio.as_deref())
        .bind(&input.specialties)
        .bind(input.status)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: InstructorId) -> Result<Option<Instructor>, RepositoryError> {
        let row = sqlx::query_as::<_, InstructorRow>(&format!(
            "SELECT {COLUMNS} FROM instructors WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &InstructorFilter,
    ) -> Result<Vec<Instructor>, RepositoryError> {
        let rows = sqlx::query_as::<_, InstructorRow>(&format!(
            "SELECT {COLUMNS} FROM instructors \
             WHERE ($1::record_status IS NULL OR status = $1) \
             ORDER BY name"
        ))
        .bind(filter.status)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the instructor does not exist.
    pub async fn update(
        &self,
        id: InstructorId,
        input: &UpdateInstructorInput,
    ) -> Result<Instructor, RepositoryError> {
        let row = sqlx::query_as::<_, InstructorRow>(&format!(
            "UPDATE instructors SET \
                name = COALESCE($2, name), \
                email = COALESCE($3, email), \
                phone = CASE WHEN $4 THEN $5 ELSE phone END, \
                bio = CASE WHEN $6 THEN $7 ELSE bio END, \
                specialties = COALESCE($8, specialties), \
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
        .bind(&input.specialties)
        .bind(input.status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the instructor does not exist.
    pub async fn delete(&self, id: InstructorId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM instructors WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Number of classes taught by the instructor.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn class_count(&self, id: InstructorId) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM classes WHERE instructor_id = $1")
                .bind(id.as_i32())
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: InstructorId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM instructors WHERE id = $1)")
                .bind(id.as_i32())
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }
}
