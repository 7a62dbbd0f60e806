//! Square sync commands.

use tracing::{info, warn};

use maple_spruce_admin::config::{SquareConfig, sync_concurrency_from_env};
use maple_spruce_admin::db::SyncConflictRepository;
use maple_spruce_admin::models::ConflictFilter;
use maple_spruce_admin::services::SyncService;
use maple_spruce_admin::square::SquareClient;
use maple_spruce_core::{ProductId, SyncConflictStatus};

use super::{CliError, connect};

/// Run conflict detection for one product, or every linked product.
///
/// # Errors
///
/// Returns an error if configuration is missing or the check cannot run.
pub async fn check(product: Option<i32>) -> Result<(), CliError> {
    let pool = connect().await?;
    let square = SquareClient::new(&SquareConfig::from_env()?);
    let sync = SyncService::new(pool, square, sync_concurrency_from_env()?);

    if let Some(id) = product {
        let check = sync.check_product(ProductId::new(id)).await?;
        info!(
            product_id = id,
            conflicts = check.conflicts.len(),
            auto_resolved = check.auto_resolved,
            "Product checked"
        );
        for conflict in &check.conflicts {
            info!(
                "  {}: local {} / square {}",
                conflict.conflict_type, conflict.local_value, conflict.external_value
            );
        }
        return Ok(());
    }

    let summary = sync.check_all_products().await?;
    info!("Sync check complete!");
    info!("  Products checked: {}", summary.checked);
    info!("  Conflicts recorded: {}", summary.conflicts_recorded);
    info!("  Auto-resolved: {}", summary.auto_resolved);
    if summary.failures > 0 {
        warn!("  Failures: {} (see log above)", summary.failures);
    }
    Ok(())
}

/// List recorded conflicts, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn conflicts(status: Option<SyncConflictStatus>) -> Result<(), CliError> {
    let pool = connect().await?;
    let filter = ConflictFilter {
        status,
        product_id: None,
    };
    let conflicts = SyncConflictRepository::new(&pool).list(&filter).await?;

    info!("{} conflict(s)", conflicts.len());
    for c in &conflicts {
        info!(
            "  #{} product {} {} [{}] local {} / square {} (detected {})",
            c.id,
            c.product_id,
            c.conflict_type,
            c.status,
            c.local_value,
            c.external_value,
            c.detected_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
