//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::catalog::CatalogService;
use crate::services::geo::{GeoError, GeoLocator};
use crate::services::live_visitors::LiveVisitors;
use crate::services::payments::{PaymentError, PaymentProvider, StripeClient};
use crate::services::shipping::{ShippingError, ShippingProvider, ShippoClient};
use crate::services::webhooks::{WebhookDispatcher, WebhookError};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("webhook client: {0}")]
    Webhooks(#[from] WebhookError),
    #[error("payment client: {0}")]
    Payments(#[from] PaymentError),
    #[error("shipping client: {0}")]
    Shipping(#[from] ShippingError),
    #[error("geolocation client: {0}")]
    Geo(#[from] GeoError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    webhooks: WebhookDispatcher,
    payments: Option<Arc<dyn PaymentProvider>>,
    shipping: Option<Arc<dyn ShippingProvider>>,
    geo: GeoLocator,
    live_visitors: LiveVisitors,
    catalog: CatalogService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Checkout is only enabled when Stripe is configured, shipping rates and
    /// labels only when Shippo is.
    ///
    /// # Errors
    ///
    /// Returns an error if an outbound HTTP client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let webhooks = WebhookDispatcher::new(config.webhooks.clone(), pool.clone(), &config.base_url)?;
        let payments = match &config.stripe {
            Some(stripe) => Some(Arc::new(StripeClient::new(stripe)?) as Arc<dyn PaymentProvider>),
            None => None,
        };
        let shipping = match &config.shippo {
            Some(shippo) => Some(Arc::new(ShippoClient::new(shippo)?) as Arc<dyn ShippingProvider>),
            None => None,
        };
        let geo = GeoLocator::new(config.geoip_enabled)?;

        Ok(Self::with_services(config, pool, webhooks, payments, shipping, geo))
    }

    /// Assemble state from already-built services.
    #[must_use]
    pub fn with_services(
        config: StorefrontConfig,
        pool: PgPool,
        webhooks: WebhookDispatcher,
        payments: Option<Arc<dyn PaymentProvider>>,
        shipping: Option<Arc<dyn ShippingProvider>>,
        geo: GeoLocator,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                webhooks,
                payments,
                shipping,
                geo,
                live_visitors: LiveVisitors::new(),
                catalog: CatalogService::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Outbound notification webhooks.
    #[must_use]
    pub fn webhooks(&self) -> &WebhookDispatcher {
        &self.inner.webhooks
    }

    /// Payment provider, if checkout is enabled.
    #[must_use]
    pub fn payments(&self) -> Option<&Arc<dyn PaymentProvider>> {
        self.inner.payments.as_ref()
    }

    /// Shipping provider, if rates and labels are enabled.
    #[must_use]
    pub fn shipping(&self) -> Option<&Arc<dyn ShippingProvider>> {
        self.inner.shipping.as_ref()
    }

    /// IP geolocation.
    #[must_use]
    pub fn geo(&self) -> &GeoLocator {
        &self.inner.geo
    }

    /// Visitors active in the last few minutes.
    #[must_use]
    pub fn live_visitors(&self) -> &LiveVisitors {
        &self.inner.live_visitors
    }

    /// Cached catalog.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }
}
