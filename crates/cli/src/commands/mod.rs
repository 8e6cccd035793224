//! Subcommand implementations.

pub mod admin;
pub mod carts;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by every command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the database named by `var`, loading `.env` first.
///
/// The storefront URL falls back to `DATABASE_URL` the same way the server
/// does.
pub(crate) async fn connect(var: &'static str) -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let url = std::env::var(var)
        .or_else(|_| {
            if var == "STOREFRONT_DATABASE_URL" {
                std::env::var("DATABASE_URL")
            } else {
                Err(std::env::VarError::NotPresent)
            }
        })
        .map_err(|_| CommandError::MissingEnvVar(var))?;

    tracing::info!("Connecting to {var}...");
    let pool = raze_storefront::db::create_pool(&SecretString::from(url)).await?;
    Ok(pool)
}
