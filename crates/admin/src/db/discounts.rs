//! Database operations for discount codes.
//!
//! A [`DiscountRule`] is stored as three columns (`kind`, `value`,
//! `valid_before`) and rebuilt on read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use maple_spruce_core::{ClassId, DiscountId, DiscountKind, DiscountRule, RecordStatus};

use super::{RepositoryError, unique_violation};
use crate::models::{CreateDiscountInput, Discount, DiscountFilter, UpdateDiscountInput};

const COLUMNS: &str = "id, name, code, description, kind, value, valid_before, status, \
                       class_id, created_at, updated_at";
const CODE_INDEX: &str = "idx_discounts_code";
const DUPLICATE_CODE: &str = "a discount with this code already exists";

#[derive(Debug, sqlx::FromRow)]
struct DiscountRow {
    id: i32,
    name: String,
    code: String,
    description: Option<String>,
    kind: DiscountKind,
    value: Decimal,
    valid_before: Option<DateTime<Utc>>,
    status: RecordStatus,
    class_id: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DiscountRow> for Discount {
    type Error = RepositoryError;

    fn try_from(row: DiscountRow) -> Result<Self, Self::Error> {
        let rule = DiscountRule::from_parts(row.kind, row.value, row.valid_before).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid rule for discount {}: {e}", row.id))
        })?;

        Ok(Self {
            id: DiscountId::new(row.id),
            name: row.name,
            code: row.code,
            description: row.description,
            rule,
            status: row.status,
            class_id: row.class_id.map(ClassId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for discount database operations.
pub struct DiscountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DiscountRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is already used.
    pub async fn create(&self, input: &CreateDiscountInput) -> Result<Discount, RepositoryError> {
        let (kind, value, valid_before) = input.rule.to_parts();

        let row = sqlx::query_as::<_, DiscountRow>(&format!(
            "INSERT INTO discounts \
                (name, code, description, kind, value, valid_before, status, class_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.code)
        .bind(&input.description)
        .bind(kind)
        .bind(value)
        .bind(valid_before)
        .bind(input.status)
        .bind(input.class_id.map(|id| id.as_i32()))
        .fetch_one(self.pool)
        .await
        .map_err(|e| unique_violation(e, CODE_INDEX, DUPLICATE_CODE))?;

        row.try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: DiscountId) -> Result<Option<Discount>, RepositoryError> {
        let row = sqlx::query_as::<_, DiscountRow>(&format!(
            "SELECT {COLUMNS} FROM discounts WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Look up a discount by its (already normalized) code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Discount>, RepositoryError> {
        let row = sqlx::query_as::<_, DiscountRow>(&format!(
            "SELECT {COLUMNS} FROM discounts WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &DiscountFilter) -> Result<Vec<Discount>, RepositoryError> {
        let rows = sqlx::query_as::<_, DiscountRow>(&format!(
            "SELECT {COLUMNS} FROM discounts \
             WHERE ($1::record_status IS NULL OR status = $1) \
               AND ($2::int IS NULL OR class_id = $2) \
             ORDER BY code"
        ))
        .bind(filter.status)
        .bind(filter.class_id.map(|id| id.as_i32()))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Merge a partial update. A new rule replaces all three rule columns.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the discount does not exist, or
    /// `RepositoryError::Conflict` if the new code is taken.
    pub async fn update(
        &self,
        id: DiscountId,
        input: &UpdateDiscountInput,
    ) -> Result<Discount, RepositoryError> {
        let parts = input.rule.as_ref().map(DiscountRule::to_parts);

        let row = sqlx::query_as::<_, DiscountRow>(&format!(
            "UPDATE discounts SET \
                name = COALESCE($2, name), \
                code = COALESCE($3, code), \
                description = CASE WHEN $4 THEN $5 ELSE description END, \
                kind = COALESCE($6, kind), \
                value = COALESCE($7, value), \
                valid_before = CASE WHEN $6::discount_kind IS NULL THEN valid_before ELSE $8 END, \
                status = COALESCE($9, status), \
                class_id = CASE WHEN $10 THEN $11 ELSE class_id END \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(&input.name)
        .bind(&input.code)
        .bind(input.description.is_some())
        .bind(input.description.as_ref().and_then(Option::as_ref))
        .bind(parts.map(|(kind, _, _)| kind))
        .bind(parts.map(|(_, value, _)| value))
        .bind(parts.and_then(|(_, _, before)| before))
        .bind(input.status)
        .bind(input.class_id.is_some())
        .bind(input.class_id.flatten().map(|id| id.as_i32()))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| unique_violation(e, CODE_INDEX, DUPLICATE_CODE))?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the discount does not exist.
    pub async fn delete(&self, id: DiscountId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM discounts WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Number of registrations that used the discount.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn registration_count(&self, id: DiscountId) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM registrations WHERE discount_id = $1")
                .bind(id.as_i32())
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }
}
