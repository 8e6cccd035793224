//! Database operations for storefront `PostgreSQL`.
//!
//! # Database: `raze_storefront`
//!
//! Holds everything the public API reads and writes:
//!
//! ## Tables
//!
//! - `users`, `user_sessions` - Customer accounts and opaque session tokens
//! - `email_subscriptions` - Giveaway, early-access and notify-me signups
//! - `waitlist` - Drop waitlist, unique per (email, product, variant)
//! - `products`, `inventory` - Catalog and per-variant stock
//! - `promo_codes` - Discount codes
//! - `orders`, `pending_orders`, `payment_transactions` - Orders and checkout
//! - `visitor_sessions`, `page_views`, `analytics_events` - Visitor analytics
//! - `abandoned_carts` - Reminder sequence state
//! - `failed_webhooks` - Notifications that exhausted their retries
//! - `email_logs` - Every notification outcome
//! - `wishlist_items` - Saved products per account
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p raze-cli -- migrate storefront
//! ```

pub mod abandoned_carts;
pub mod checkout;
pub mod contacts;
pub mod email_logs;
pub mod failed_webhooks;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod promo;
pub mod sessions;
pub mod stats;
pub mod subscriptions;
pub mod users;
pub mod visitors;
pub mod waitlist;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

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

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict` with `message`, anything else to `Database`.
    #[must_use]
    pub fn on_unique(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
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

/// Decode a JSONB column into `T`, reporting bad data as corruption.
pub(crate) fn from_json<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    what: &str,
) -> Result<T, RepositoryError> {
    serde_json::from_value(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {what} in database: {e}")))
}

/// Encode `T` for a JSONB column.
pub(crate) fn to_json<T: serde::Serialize>(
    value: &T,
    what: &str,
) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("cannot encode {what}: {e}")))
}
