//! Abandoned cart commands.
//!
//! Meant to run from a scheduler (cron, Fly machines) every hour or so; the
//! admin panel can trigger the same pass on demand.

use chrono::Utc;
use raze_storefront::config::{ConfigError, WebhookConfig};
use raze_storefront::db::RepositoryError;
use raze_storefront::services::abandoned_carts::process_abandoned_carts;
use raze_storefront::services::webhooks::{WebhookDispatcher, WebhookError};
use thiserror::Error;

use super::{CommandError, connect};

/// Errors that can occur while processing carts.
#[derive(Debug, Error)]
pub enum CartsError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Send every reminder that is due now.
///
/// # Errors
///
/// Returns an error if configuration is invalid or carts cannot be read.
pub async fn process() -> Result<(), CartsError> {
    let pool = connect("STOREFRONT_DATABASE_URL").await?;
    let asset_base = std::env::var("STOREFRONT_BASE_URL")
        .unwrap_or_else(|_| "https://razetraining.com".to_owned());
    let webhooks = WebhookDispatcher::new(WebhookConfig::from_env()?, pool.clone(), &asset_base)?;

    let summary = process_abandoned_carts(&pool, &webhooks, Utc::now()).await?;

    tracing::info!(
        email_1 = summary.email_1,
        email_2 = summary.email_2,
        email_3 = summary.email_3,
        failed = summary.failed,
        held = summary.held,
        "Abandoned cart pass complete"
    );
    Ok(())
}
