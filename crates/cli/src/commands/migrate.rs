//! Database migration commands.
//!
//! Migrations are embedded at compile time from each server crate:
//!
//! ```text
//! crates/storefront/migrations/   shop data
//! crates/admin/migrations/        staff accounts, sessions, notes, activity
//! ```
//!
//! Servers never migrate on startup; run these before deploying.

use sqlx::migrate::MigrateError;
use thiserror::Error;

use super::{CommandError, connect};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Migration failed: {0}")]
    Migrate(#[from] MigrateError),
}

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn storefront() -> Result<(), MigrationError> {
    let pool = connect("STOREFRONT_DATABASE_URL").await?;
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;
    tracing::info!("Storefront migrations applied");
    Ok(())
}

/// Run admin database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn admin() -> Result<(), MigrationError> {
    let pool = connect("ADMIN_DATABASE_URL").await?;
    sqlx::migrate!("../admin/migrations").run(&pool).await?;
    tracing::info!("Admin migrations applied");
    Ok(())
}
