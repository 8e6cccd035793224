//! IP geolocation for visitor analytics.
//!
//! Lookups go to ipapi.co and are cached for a day per address.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::models::visitor::GeoLocation;

const LOOKUP_BASE: &str = "https://ipapi.co";

/// Lookup timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from the lookup service.
#[derive(Debug, Error)]
pub enum GeoError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with an error status.
    #[error("lookup returned status {0}")]
    Status(u16),
}

/// Response body from ipapi.co.
#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    error: bool,
    country_name: Option<String>,
    country_code: Option<String>,
    region: Option<String>,
    city: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    timezone: Option<String>,
}

impl From<LookupResponse> for GeoLocation {
    fn from(r: LookupResponse) -> Self {
        Self {
            country: r.country_name,
            country_code: r.country_code,
            region: r.region,
            city: r.city,
            latitude: r.latitude,
            longitude: r.longitude,
            timezone: r.timezone,
        }
    }
}

/// Cached IP geolocation client.
#[derive(Clone)]
pub struct GeoLocator {
    inner: Arc<GeoLocatorInner>,
}

struct GeoLocatorInner {
    client: reqwest::Client,
    enabled: bool,
    cache: Cache<IpAddr, GeoLocation>,
}

impl GeoLocator {
    /// Create a locator. When `enabled` is false every lookup is empty.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(enabled: bool) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(24 * 60 * 60))
            .build();

        Ok(Self {
            inner: Arc::new(GeoLocatorInner {
                client,
                enabled,
                cache,
            }),
        })
    }

    /// Locate an address. Failures are logged and give an empty location.
    #[instrument(skip(self))]
    pub async fn locate(&self, ip: IpAddr) -> GeoLocation {
        if !self.inner.enabled || !is_public(ip) {
            return GeoLocation::default();
        }

        if let Some(hit) = self.inner.cache.get(&ip).await {
            debug!("Cache hit for geolocation");
            return hit;
        }

        match self.fetch(ip).await {
            Ok(location) => {
                self.inner.cache.insert(ip, location.clone()).await;
                location
            }
            Err(e) => {
                tracing::warn!(error = %e, "IP geolocation failed");
                GeoLocation::default()
            }
        }
    }

    async fn fetch(&self, ip: IpAddr) -> Result<GeoLocation, GeoError> {
        let response = self
            .inner
            .client
            .get(format!("{LOOKUP_BASE}/{ip}/json/"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status(status.as_u16()));
        }

        let body: LookupResponse = response.json().await?;
        if body.error {
            return Ok(GeoLocation::default());
        }
        Ok(body.into())
    }
}

/// Private, loopback and link-local addresses have no location.
fn is_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => !(v6.is_loopback() || v6.is_unspecified()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_private_addresses_skipped() {
        assert!(!is_public("10.1.2.3".parse().unwrap()));
        assert!(!is_public("192.168.0.10".parse().unwrap()));
        assert!(!is_public("127.0.0.1".parse().unwrap()));
        assert!(!is_public("::1".parse().unwrap()));
        assert!(is_public("8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn test_lookup_response_mapping() {
        let body: LookupResponse = serde_json::from_str(
            r#"{"ip":"8.8.8.8","city":"Mountain View","region":"California",
                "country_name":"United States","country_code":"US",
                "latitude":37.42,"longitude":-122.08,"timezone":"America/Los_Angeles"}"#,
        )
        .unwrap();
        let location = GeoLocation::from(body);
        assert_eq!(location.country.as_deref(), Some("United States"));
        assert_eq!(location.country_code.as_deref(), Some("US"));
        assert_eq!(location.city.as_deref(), Some("Mountain View"));
    }

    #[tokio::test]
    async fn test_disabled_locator_returns_empty() {
        let locator = GeoLocator::new(false).unwrap();
        let location = locator.locate("8.8.8.8".parse().unwrap()).await;
        assert_eq!(location, GeoLocation::default());
    }
}
