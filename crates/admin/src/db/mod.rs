//! Database operations for the Maple & Spruce `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `artists` - Artists whose work is sold through the collective
//! - `categories` - Product and class categories
//! - `products` - Inventory, with a cached snapshot of the Square catalog entry
//! - `instructors` - Class instructors
//! - `classes` - Scheduled classes
//! - `registrations` - Student registrations for classes
//! - `discounts` - Discount codes
//! - `sync_conflicts` - Discrepancies found between products and Square
//!
//! Records reference each other by ID only. Repositories expose the counts
//! callers need to refuse deletes that would leave dangling references.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p maple-spruce-cli -- migrate
//! ```

pub mod artists;
pub mod categories;
pub mod classes;
pub mod discounts;
pub mod instructors;
pub mod products;
pub mod registrations;
pub mod sync_conflicts;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use artists::ArtistRepository;
pub use categories::CategoryRepository;
pub use classes::ClassRepository;
pub use discounts::DiscountRepository;
pub use instructors::InstructorRepository;
pub use products::ProductRepository;
pub use registrations::RegistrationRepository;
pub use sync_conflicts::SyncConflictRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate discount code).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-index violation on `constraint` to `RepositoryError::Conflict`.
pub(crate) fn unique_violation(
    err: sqlx::Error,
    constraint: &str,
    message: &str,
) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.constraint() == Some(constraint)
    {
        return RepositoryError::Conflict(message.to_string());
    }
    RepositoryError::Database(err)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run all pending migrations from `crates/admin/migrations/`.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the history is inconsistent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
