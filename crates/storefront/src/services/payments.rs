//! Payment provider integration.
//!
//! Checkout goes through a hosted payment page. [`PaymentProvider`] is the
//! seam; [`StripeClient`] talks to Stripe's form-encoded REST API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use raze_core::{Money, PaymentStatus};

use crate::config::StripeConfig;

/// Provider API timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Oldest webhook signature timestamp accepted, in seconds.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Errors from the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Webhook signature header missing or malformed.
    #[error("invalid signature header")]
    InvalidSignatureHeader,

    /// Webhook signature did not match.
    #[error("signature mismatch")]
    SignatureMismatch,

    /// Webhook timestamp outside the tolerance window.
    #[error("signature timestamp too old")]
    StaleSignature,

    /// Failed to parse a provider payload.
    #[error("parse error: {0}")]
    Parse(String),
}

/// What to charge for.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub amount: Money,
    pub currency: String,
    pub description: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: HashMap<String, String>,
}

/// A created hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

/// Payment state of a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutStatus {
    /// Provider session state (`open`, `complete`, `expired`).
    pub status: String,
    /// Provider payment state (`paid`, `unpaid`, `no_payment_required`).
    pub payment_status: String,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
}

impl CheckoutStatus {
    /// Map the provider state onto ours.
    #[must_use]
    pub fn payment_state(&self) -> PaymentStatus {
        match (self.status.as_str(), self.payment_status.as_str()) {
            (_, "paid" | "no_payment_required") => PaymentStatus::Paid,
            ("expired", _) => PaymentStatus::Expired,
            ("complete", _) => PaymentStatus::Unpaid,
            _ => PaymentStatus::Initiated,
        }
    }
}

/// A hosted-checkout payment provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a hosted checkout page for a single charge.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Current state of a checkout session.
    async fn checkout_status(&self, session_id: &str) -> Result<CheckoutStatus, PaymentError>;

    /// Verify a webhook body and return the event.
    ///
    /// # Errors
    ///
    /// Returns error if the signature is invalid or the body doesn't parse.
    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, PaymentError>;
}

/// A verified provider event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

/// Event payload wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: SessionObject,
}

/// Checkout session as it appears in API responses and events.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionObject {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl From<SessionObject> for CheckoutStatus {
    fn from(session: SessionObject) -> Self {
        Self {
            status: session.status.unwrap_or_else(|| "open".to_string()),
            payment_status: session
                .payment_status
                .unwrap_or_else(|| "unpaid".to_string()),
            amount_total: session.amount_total,
            currency: session.currency,
        }
    }
}

/// Stripe Checkout client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_key: SecretString,
    webhook_secret: Option<SecretString>,
    api_base: String,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn parse_session(response: reqwest::Response) -> Result<SessionObject, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[tracing::instrument(skip(self, request), fields(amount = %request.amount))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let form = checkout_form(request);

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(self.api_key.expose_secret())
            .form(&form)
            .send()
            .await?;

        let session = Self::parse_session(response).await?;
        let url = session
            .url
            .ok_or_else(|| PaymentError::Parse("checkout session has no url".to_string()))?;

        Ok(CheckoutSession {
            session_id: session.id,
            url,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn checkout_status(&self, session_id: &str) -> Result<CheckoutStatus, PaymentError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{}",
                self.api_base,
                urlencoding::encode(session_id)
            ))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await?;

        Ok(Self::parse_session(response).await?.into())
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, PaymentError> {
        let secret = self
            .webhook_secret
            .as_ref()
            .ok_or(PaymentError::InvalidSignatureHeader)?;

        verify_signature(
            payload,
            signature,
            secret.expose_secret(),
            chrono::Utc::now().timestamp(),
        )?;

        serde_json::from_slice(payload).map_err(|e| PaymentError::Parse(e.to_string()))
    }
}

/// Form fields for a single-line checkout session.
fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("customer_email".to_string(), request.customer_email.clone()),
        (
            "line_items[0][price_data][currency]".to_string(),
            request.currency.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            request.amount.to_cents().to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.description.clone(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
    ];

    let mut keys: Vec<_> = request.metadata.keys().collect();
    keys.sort();
    for key in keys {
        if let Some(value) = request.metadata.get(key) {
            form.push((format!("metadata[{key}]"), value.clone()));
        }
    }

    form
}

/// Check a `t=<unix>,v1=<hex>` signature header over `"{t}.{payload}"`.
///
/// # Errors
///
/// Returns error if the header is malformed, stale, or no `v1` entry matches.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), PaymentError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse::<i64>().ok();
            }
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(PaymentError::InvalidSignatureHeader)?;
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignatureHeader);
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(PaymentError::StaleSignature);
    }

    for signature in signatures {
        let Ok(expected) = hex::decode(signature) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| PaymentError::InvalidSignatureHeader)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(PaymentError::SignatureMismatch)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], secret: &str, t: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{t}.").as_bytes());
        mac.update(payload);
        format!("t={t},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_valid_signature() {
        let body = br#"{"id":"evt_1"}"#;
        let header = sign(body, "whsec_test", 1_700_000_000);
        assert!(verify_signature(body, &header, "whsec_test", 1_700_000_010).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let header = sign(br#"{"id":"evt_1"}"#, "whsec_test", 1_700_000_000);
        let result = verify_signature(br#"{"id":"evt_2"}"#, &header, "whsec_test", 1_700_000_000);
        assert!(matches!(result, Err(PaymentError::SignatureMismatch)));
    }

    #[test]
    fn test_stale_signature_rejected() {
        let body = b"{}";
        let header = sign(body, "whsec_test", 1_700_000_000);
        let result = verify_signature(body, &header, "whsec_test", 1_700_001_000);
        assert!(matches!(result, Err(PaymentError::StaleSignature)));
    }

    #[test]
    fn test_malformed_header() {
        let result = verify_signature(b"{}", "v1=abc", "whsec_test", 0);
        assert!(matches!(result, Err(PaymentError::InvalidSignatureHeader)));
    }

    #[test]
    fn test_payment_state_mapping() {
        let status = |s: &str, p: &str| CheckoutStatus {
            status: s.to_string(),
            payment_status: p.to_string(),
            amount_total: None,
            currency: None,
        };

        assert_eq!(status("complete", "paid").payment_state(), PaymentStatus::Paid);
        assert_eq!(status("open", "unpaid").payment_state(), PaymentStatus::Initiated);
        assert_eq!(status("expired", "unpaid").payment_state(), PaymentStatus::Expired);
        assert_eq!(status("complete", "unpaid").payment_state(), PaymentStatus::Unpaid);
    }

    #[test]
    fn test_checkout_form_amount_in_cents() {
        let request = CheckoutRequest {
            amount: Money::from_cents(10_450),
            currency: "usd".to_string(),
            description: "RAZE order".to_string(),
            customer_email: "a@b.co".to_string(),
            success_url: "https://razetraining.com/checkout/success".to_string(),
            cancel_url: "https://razetraining.com/cart".to_string(),
            metadata: HashMap::from([("source".to_string(), "raze_checkout".to_string())]),
        };

        let form = checkout_form(&request);
        assert!(form.contains(&(
            "line_items[0][price_data][unit_amount]".to_string(),
            "10450".to_string()
        )));
        assert!(form.contains(&("metadata[source]".to_string(), "raze_checkout".to_string())));
    }
}
