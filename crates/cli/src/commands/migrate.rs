//! Database migration command.
//!
//! Migrations live in `crates/admin/migrations/` and are embedded into the
//! admin crate at compile time.

use maple_spruce_admin::db;

use super::{CliError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    db::run_migrations(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
