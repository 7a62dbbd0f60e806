//! Database operations for class registrations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use maple_spruce_core::{
    ClassId, DiscountId, Email, PaymentStatus, RegistrationId, RegistrationStatus,
};

use super::RepositoryError;
use crate::models::{Registration, RegistrationFilter, UpdateRegistrationInput};

const COLUMNS: &str = "id, class_id, student_name, student_email, student_phone, seats, \
                       discount_id, subtotal, discount_amount, total_cost, status, \
                       payment_status, square_payment_id, notes, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct RegistrationRow {
    id: i32,
    class_id: i32,
    student_name: String,
    student_email: String,
    student_phone: Option<String>,
    seats: i32,
    discount_id: Option<i32>,
    subtotal: Decimal,
    discount_amount: Decimal,
    total_cost: Decimal,
    status: RegistrationStatus,
    payment_status: PaymentStatus,
    square_payment_id: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = RepositoryError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        let student_email = Email::parse(&row.student_email).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "invalid email for registration {}: {e}",
                row.id
            ))
        })?;

        Ok(Self {
            id: RegistrationId::new(row.id),
            class_id: ClassId::new(row.class_id),
            student_name: row.student_name,
            student_email,
            student_phone: row.student_phone,
            seats: row.seats,
            discount_id: row.discount_id.map(DiscountId::new),
            subtotal: row.subtotal,
            discount_amount: row.discount_amount,
            total_cost: row.total_cost,
            status: row.status,
            payment_status: row.payment_status,
            square_payment_id: row.square_payment_id,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A registration ready to insert, with its cost already computed.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub class_id: ClassId,
    pub student_name: String,
    pub student_email: String,
    pub student_phone: Option<String>,
    pub seats: i32,
    pub discount_id: Option<DiscountId>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total_cost: Decimal,
    pub status: RegistrationStatus,
    pub notes: Option<String>,
}

/// Repository for registration database operations.
pub struct RegistrationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RegistrationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a registration inside the transaction holding the class lock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        new: &NewRegistration,
    ) -> Result<Registration, RepositoryError> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "INSERT INTO registrations \
                (class_id, student_name, student_email, student_phone, seats, discount_id, \
                 subtotal, discount_amount, total_cost, status, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        ))
        .bind(new.class_id.as_i32())
        .bind(&new.student_name)
        .bind(&new.student_email)
        .bind(&new.student_phone)
        .bind(new.seats)
        .bind(new.discount_id.map(|id| id.as_i32()))
        .bind(new.subtotal)
        .bind(new.discount_amount)
        .bind(new.total_cost)
        .bind(new.status)
        .bind(&new.notes)
        .fetch_one(&mut **tx)
        .await?;

        row.try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: RegistrationId) -> Result<Option<Registration>, RepositoryError> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {COLUMNS} FROM registrations WHERE id = $1"
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
        filter: &RegistrationFilter,
    ) -> Result<Vec<Registration>, RepositoryError> {
        let rows = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {COLUMNS} FROM registrations \
             WHERE ($1::int IS NULL OR class_id = $1) \
               AND ($2::registration_status IS NULL OR status = $2) \
               AND ($3::payment_status IS NULL OR payment_status = $3) \
             ORDER BY created_at, id"
        ))
        .bind(filter.class_id.map(|id| id.as_i32()))
        .bind(filter.status)
        .bind(filter.payment_status)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Merge a partial update. Cost fields are never touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the registration does not exist.
    pub async fn update(
        &self,
        id: RegistrationId,
        input: &UpdateRegistrationInput,
    ) -> Result<Registration, RepositoryError> {
        Self::update_with(self.pool, id, input).await
    }

    /// [`Self::update`] on a caller-supplied connection, so it can share a
    /// transaction with a class lock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the registration does not exist.
    pub async fn update_with<'e, E>(
        executor: E,
        id: RegistrationId,
        input: &UpdateRegistrationInput,
    ) -> Result<Registration, RepositoryError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "UPDATE registrations SET \
                student_name = COALESCE($2, student_name), \
                student_email = COALESCE($3, student_email), \
                student_phone = CASE WHEN $4 THEN $5 ELSE student_phone END, \
                status = COALESCE($6, status), \
                payment_status = COALESCE($7, payment_status), \
                square_payment_id = COALESCE($8, square_payment_id), \
                notes = CASE WHEN $9 THEN $10 ELSE notes END \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(&input.student_name)
        .bind(&input.student_email)
        .bind(input.student_phone.is_some())
        .bind(input.student_phone.as_ref().and_then(Option::as_ref))
        .bind(input.status)
        .bind(input.payment_status)
        .bind(&input.square_payment_id)
        .bind(input.notes.is_some())
        .bind(input.notes.as_ref().and_then(Option::as_ref))
        .fetch_optional(executor)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the registration does not exist.
    pub async fn delete(&self, id: RegistrationId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM registrations WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
