//! Shipping carrier integration.
//!
//! [`ShippingProvider`] is the seam; [`ShippoClient`] talks to Shippo's JSON
//! API. Rates are quoted from the warehouse to a shopper's address, labels
//! are bought for a chosen rate, and tracking is looked up by carrier.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use raze_core::Money;
use raze_core::order::ShippingAddress;

use crate::config::ShippoConfig;

/// Carrier API timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Label format printed by the warehouse.
const LABEL_FILE_TYPE: &str = "PDF_4X6";

/// Errors from the shipping provider.
#[derive(Debug, Error)]
pub enum ShippingError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Provider refused to buy the label.
    #[error("label rejected: {0}")]
    LabelRejected(String),

    /// Failed to parse a provider payload.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Package size and weight, in inches and pounds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Parcel {
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_length")]
    pub length: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
}

const fn default_weight() -> f64 {
    0.5
}

const fn default_length() -> f64 {
    10.0
}

const fn default_width() -> f64 {
    8.0
}

const fn default_height() -> f64 {
    2.0
}

impl Default for Parcel {
    fn default() -> Self {
        Self {
            weight: default_weight(),
            length: default_length(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Parcel {
    fn to_json(self) -> Value {
        json!({
            "length": self.length.to_string(),
            "width": self.width.to_string(),
            "height": self.height.to_string(),
            "distance_unit": "in",
            "weight": self.weight.to_string(),
            "mass_unit": "lb",
        })
    }
}

/// One way to ship a parcel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rate {
    pub rate_id: String,
    pub provider: String,
    pub service_level: String,
    pub amount: Money,
    pub currency: String,
    pub estimated_days: Option<i32>,
    pub duration_terms: Option<String>,
}

/// A bought label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub tracking_number: String,
    pub label_url: String,
    pub carrier: Option<String>,
}

/// One tracking scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingEvent {
    pub status: String,
    pub status_details: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
}

/// Where a parcel is now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tracking {
    pub tracking_number: String,
    pub carrier: String,
    pub status: String,
    pub status_details: Option<String>,
    pub location: Option<String>,
    pub eta: Option<String>,
    pub history: Vec<TrackingEvent>,
}

/// A shipping carrier aggregator.
#[async_trait]
pub trait ShippingProvider: Send + Sync {
    /// Rates from the warehouse to `to`, cheapest first.
    async fn rates(&self, to: &ShippingAddress, parcel: Parcel) -> Result<Vec<Rate>, ShippingError>;

    /// Buy a label for a quoted rate.
    async fn buy_label(&self, rate_id: &str) -> Result<Label, ShippingError>;

    /// Tracking status for a shipment.
    async fn track(&self, carrier: &str, tracking_number: &str) -> Result<Tracking, ShippingError>;
}

/// The warehouse every parcel leaves from.
fn ship_from() -> Value {
    json!({
        "name": "RAZE Training",
        "street1": "965 Mission St",
        "city": "San Francisco",
        "state": "CA",
        "zip": "94103",
        "country": "US",
        "phone": "+14155551234",
        "email": "orders@razetraining.com",
    })
}

fn ship_to(address: &ShippingAddress) -> Value {
    json!({
        "name": format!("{} {}", address.first_name, address.last_name),
        "street1": address.address_line1,
        "street2": address.address_line2.as_deref().unwrap_or(""),
        "city": address.city,
        "state": address.state,
        "zip": address.postal_code,
        "country": address.country,
        "phone": address.phone.as_deref().unwrap_or(""),
        "email": address.email,
    })
}

#[derive(Debug, Deserialize)]
struct ShipmentResponse {
    #[serde(default)]
    rates: Vec<RateObject>,
}

#[derive(Debug, Deserialize)]
struct RateObject {
    object_id: String,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    servicelevel: Option<ServiceLevel>,
    #[serde(default)]
    amount: Option<Money>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    estimated_days: Option<i32>,
    #[serde(default)]
    duration_terms: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceLevel {
    #[serde(default)]
    name: Option<String>,
}

impl From<RateObject> for Rate {
    fn from(rate: RateObject) -> Self {
        Self {
            rate_id: rate.object_id,
            provider: rate.provider.unwrap_or_else(|| "Unknown".to_string()),
            service_level: rate
                .servicelevel
                .and_then(|s| s.name)
                .unwrap_or_else(|| "Standard".to_string()),
            amount: rate.amount.unwrap_or(Money::ZERO),
            currency: rate.currency.unwrap_or_else(|| "USD".to_string()),
            estimated_days: rate.estimated_days,
            duration_terms: rate.duration_terms,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    status: String,
    #[serde(default)]
    tracking_number: Option<String>,
    #[serde(default)]
    label_url: Option<String>,
    #[serde(default)]
    rate: Option<RateRef>,
    #[serde(default)]
    messages: Vec<ProviderMessage>,
}

/// A transaction's rate, as an id or expanded.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RateRef {
    Id(String),
    Expanded { provider: Option<String> },
}

#[derive(Debug, Deserialize)]
struct ProviderMessage {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct TrackResponse {
    #[serde(default)]
    tracking_number: Option<String>,
    #[serde(default)]
    carrier: Option<String>,
    #[serde(default)]
    eta: Option<String>,
    #[serde(default)]
    tracking_status: Option<TrackStatus>,
    #[serde(default)]
    tracking_history: Vec<TrackStatus>,
}

#[derive(Debug, Deserialize)]
struct TrackStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    status_details: Option<String>,
    #[serde(default)]
    status_date: Option<String>,
    #[serde(default)]
    location: Option<TrackLocation>,
}

#[derive(Debug, Deserialize)]
struct TrackLocation {
    #[serde(default)]
    city: Option<String>,
}

impl From<TrackStatus> for TrackingEvent {
    fn from(status: TrackStatus) -> Self {
        Self {
            status: status.status.unwrap_or_else(|| "UNKNOWN".to_string()),
            status_details: status.status_details,
            date: status.status_date,
            location: status.location.and_then(|l| l.city),
        }
    }
}

/// Sort rates cheapest first, keeping provider order for ties.
fn cheapest_first(mut rates: Vec<Rate>) -> Vec<Rate> {
    rates.sort_by_key(|rate| rate.amount);
    rates
}

/// Shippo API client.
#[derive(Clone)]
pub struct ShippoClient {
    client: reqwest::Client,
    api_key: SecretString,
    api_base: String,
}

impl ShippoClient {
    /// Create a new Shippo client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ShippoConfig) -> Result<Self, ShippingError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn authorization(&self) -> String {
        format!("ShippoToken {}", self.api_key.expose_secret())
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ShippingError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ShippingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ShippingError::Parse(e.to_string()))
    }

    async fn rate_provider(&self, rate_id: &str) -> Option<String> {
        let response = self
            .client
            .get(format!("{}/rates/{}", self.api_base, urlencoding::encode(rate_id)))
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .send()
            .await
            .ok()?;

        Self::parse::<RateObject>(response).await.ok()?.provider
    }
}

#[async_trait]
impl ShippingProvider for ShippoClient {
    #[tracing::instrument(skip(self, to), fields(country = %to.country))]
    async fn rates(&self, to: &ShippingAddress, parcel: Parcel) -> Result<Vec<Rate>, ShippingError> {
        let body = json!({
            "address_from": ship_from(),
            "address_to": ship_to(to),
            "parcels": [parcel.to_json()],
            "async": false,
        });

        let response = self
            .client
            .post(format!("{}/shipments/", self.api_base))
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .json(&body)
            .send()
            .await?;

        let shipment: ShipmentResponse = Self::parse(response).await?;
        Ok(cheapest_first(
            shipment.rates.into_iter().map(Rate::from).collect(),
        ))
    }

    #[tracing::instrument(skip(self))]
    async fn buy_label(&self, rate_id: &str) -> Result<Label, ShippingError> {
        let body = json!({
            "rate": rate_id,
            "label_file_type": LABEL_FILE_TYPE,
            "async": false,
        });

        let response = self
            .client
            .post(format!("{}/transactions/", self.api_base))
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .json(&body)
            .send()
            .await?;

        let transaction: TransactionResponse = Self::parse(response).await?;
        label_from(transaction, |id| async move { self.rate_provider(&id).await }).await
    }

    #[tracing::instrument(skip(self))]
    async fn track(&self, carrier: &str, tracking_number: &str) -> Result<Tracking, ShippingError> {
        let carrier = carrier.to_lowercase();
        let response = self
            .client
            .get(format!(
                "{}/tracks/{}/{}",
                self.api_base,
                urlencoding::encode(&carrier),
                urlencoding::encode(tracking_number)
            ))
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .send()
            .await?;

        let track: TrackResponse = Self::parse(response).await?;
        let current = track.tracking_status.map(TrackingEvent::from);

        Ok(Tracking {
            tracking_number: track
                .tracking_number
                .unwrap_or_else(|| tracking_number.to_string()),
            carrier: track.carrier.unwrap_or(carrier),
            status: current
                .as_ref()
                .map_or_else(|| "unknown".to_string(), |c| c.status.clone()),
            status_details: current.as_ref().and_then(|c| c.status_details.clone()),
            location: current.and_then(|c| c.location),
            eta: track.eta,
            history: track
                .tracking_history
                .into_iter()
                .map(TrackingEvent::from)
                .collect(),
        })
    }
}

/// Turn a transaction into a label, looking up the carrier when the rate
/// is not expanded.
async fn label_from<F, Fut>(
    transaction: TransactionResponse,
    provider_of: F,
) -> Result<Label, ShippingError>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Option<String>>,
{
    if transaction.status != "SUCCESS" {
        let reason = transaction
            .messages
            .iter()
            .map(|m| m.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ShippingError::LabelRejected(if reason.is_empty() {
            transaction.status
        } else {
            reason
        }));
    }

    let (Some(tracking_number), Some(label_url)) =
        (transaction.tracking_number, transaction.label_url)
    else {
        return Err(ShippingError::Parse(
            "label has no tracking number or url".to_string(),
        ));
    };

    let carrier = match transaction.rate {
        Some(RateRef::Expanded { provider }) => provider,
        Some(RateRef::Id(id)) => provider_of(id).await,
        None => None,
    };

    Ok(Label {
        tracking_number,
        label_url,
        carrier,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rate(id: &str, amount: i64) -> Rate {
        Rate {
            rate_id: id.to_string(),
            provider: "USPS".to_string(),
            service_level: "Ground".to_string(),
            amount: Money::from_cents(amount),
            currency: "USD".to_string(),
            estimated_days: None,
            duration_terms: None,
        }
    }

    #[test]
    fn test_rates_sorted_cheapest_first() {
        let sorted = cheapest_first(vec![rate("b", 1250), rate("a", 575), rate("c", 575)]);
        let ids: Vec<_> = sorted.iter().map(|r| r.rate_id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "b"]);
    }

    #[test]
    fn test_rate_defaults_fill_gaps() {
        let object: RateObject =
            serde_json::from_value(json!({ "object_id": "r1", "amount": "7.25" })).unwrap();
        let rate = Rate::from(object);
        assert_eq!(rate.provider, "Unknown");
        assert_eq!(rate.service_level, "Standard");
        assert_eq!(rate.amount, Money::from_cents(725));
        assert_eq!(rate.currency, "USD");
    }

    #[test]
    fn test_default_parcel() {
        let parcel: Parcel = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parcel, Parcel::default());
        assert_eq!(parcel.to_json()["mass_unit"], "lb");
        assert_eq!(parcel.to_json()["weight"], "0.5");
    }

    #[test]
    fn test_ship_to_joins_name() {
        let address: ShippingAddress = serde_json::from_value(json!({
            "first_name": "Dana",
            "last_name": "Reyes",
            "email": "dana@example.com",
            "address_line1": "1 Vault Way",
            "city": "Austin",
            "state": "TX",
            "postal_code": "78701",
        }))
        .unwrap();
        let to = ship_to(&address);
        assert_eq!(to["name"], "Dana Reyes");
        assert_eq!(to["zip"], "78701");
        assert_eq!(to["country"], "US");
        assert_eq!(to["street2"], "");
    }

    #[tokio::test]
    async fn test_label_from_success_looks_up_carrier() {
        let transaction: TransactionResponse = serde_json::from_value(json!({
            "status": "SUCCESS",
            "tracking_number": "9400100000000000000000",
            "label_url": "https://labels.example.net/l.pdf",
            "rate": "rate_123",
        }))
        .unwrap();

        let label = label_from(transaction, |id| async move {
            (id == "rate_123").then(|| "USPS".to_string())
        })
        .await
        .unwrap();

        assert_eq!(label.carrier.as_deref(), Some("USPS"));
        assert_eq!(label.tracking_number, "9400100000000000000000");
    }

    #[tokio::test]
    async fn test_label_from_error_reports_messages() {
        let transaction: TransactionResponse = serde_json::from_value(json!({
            "status": "ERROR",
            "messages": [{ "text": "Address not found" }],
        }))
        .unwrap();

        let err = label_from(transaction, |_| async { None }).await.unwrap_err();
        assert!(matches!(err, ShippingError::LabelRejected(msg) if msg == "Address not found"));
    }
}
