//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use raze_storefront::services::shipping::{ShippingError, ShippingProvider, ShippoClient};
use raze_storefront::services::webhooks::{WebhookDispatcher, WebhookError};

use crate::config::AdminConfig;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("webhook client: {0}")]
    Webhooks(#[from] WebhookError),
    #[error("shipping client: {0}")]
    Shipping(#[from] ShippingError),
}

/// Application state shared across all handlers.
///
/// Holds both databases: the admin pool for staff accounts, sessions, notes
/// and the activity log, and the storefront pool for shop data.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    shop_pool: PgPool,
    webhooks: WebhookDispatcher,
    shipping: Option<Arc<dyn ShippingProvider>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an outbound HTTP client cannot be built.
    pub fn new(config: AdminConfig, pool: PgPool, shop_pool: PgPool) -> Result<Self, StateError> {
        // Failed deliveries are stored next to the shop data they describe.
        let webhooks = WebhookDispatcher::new(
            config.webhooks.clone(),
            shop_pool.clone(),
            &config.storefront_base_url,
        )?;
        let shipping = match &config.shippo {
            Some(shippo) => Some(Arc::new(ShippoClient::new(shippo)?) as Arc<dyn ShippingProvider>),
            None => None,
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                shop_pool,
                webhooks,
                shipping,
            }),
        })
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Admin database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Storefront database pool.
    #[must_use]
    pub fn shop_pool(&self) -> &PgPool {
        &self.inner.shop_pool
    }

    /// Outbound notification webhooks.
    #[must_use]
    pub fn webhooks(&self) -> &WebhookDispatcher {
        &self.inner.webhooks
    }

    /// Shipping provider, if labels can be bought.
    #[must_use]
    pub fn shipping(&self) -> Option<&Arc<dyn ShippingProvider>> {
        self.inner.shipping.as_ref()
    }
}
