//! Maple & Spruce CLI - migrations, seeding and Square sync checks.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! ms-cli migrate
//!
//! # Create categories, artists and instructors from a YAML file
//! ms-cli seed data/seed.yaml
//!
//! # Compare every linked product with Square and record conflicts
//! ms-cli sync check
//!
//! # Check a single product
//! ms-cli sync check --product 42
//!
//! # List pending conflicts
//! ms-cli sync conflicts --status pending
//! ```
//!
//! # Environment Variables
//!
//! - `MAPLE_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `SQUARE_ACCESS_TOKEN`, `SQUARE_LOCATION_ID`, `SQUARE_ENVIRONMENT` - for `sync check`

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use maple_spruce_core::SyncConflictStatus;

mod commands;

#[derive(Parser)]
#[command(name = "ms-cli")]
#[command(author, version, about = "Maple & Spruce CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Create categories, artists and instructors from a YAML file
    Seed {
        /// Path to the YAML seed file
        file: String,
    },
    /// Square inventory sync
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },
}

#[derive(Subcommand)]
enum SyncAction {
    /// Compare products with Square and record conflicts
    Check {
        /// Only check this product ID
        #[arg(short, long)]
        product: Option<i32>,
    },
    /// List recorded conflicts
    Conflicts {
        /// Filter by status (`pending`, `resolved`, `ignored`)
        #[arg(short, long)]
        status: Option<SyncConflictStatus>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::Sync { action } => match action {
            SyncAction::Check { product } => commands::sync::check(product).await?,
            SyncAction::Conflicts { status } => commands::sync::conflicts(status).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_conflicts_status() {
        let cli = Cli::try_parse_from(["ms-cli", "sync", "conflicts", "--status", "pending"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Sync {
                action: SyncAction::Conflicts {
                    status: Some(SyncConflictStatus::Pending)
                }
            }
        ));

        assert!(
            Cli::try_parse_from(["ms-cli", "sync", "conflicts", "--status", "open"]).is_err()
        );
    }
}
