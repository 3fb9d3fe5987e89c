//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! cl-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `COPPERLEAF_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL`
//!   connection string
//!
//! Migration files live in `crates/storefront/migrations/` and are
//! embedded into the binary at compile time.

use thiserror::Error;

use super::ConnectError;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending storefront migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = super::connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
