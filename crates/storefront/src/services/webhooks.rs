//! Outbound notification webhooks.
//!
//! Emails are rendered and sent by an automation service; this module only
//! POSTs JSON payloads to its hooks. Each delivery is one attempt plus up to
//! three retries with exponential backoff. Deliveries that never succeed are
//! stored in `failed_webhooks` for manual replay, and every outcome for a
//! recipient is written to `email_logs`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Value, json};
use sqlx::PgPool;
use thiserror::Error;
use url::Url;

use raze_core::abandoned_cart::ReminderStep;
use raze_core::order::ShippingAddress;
use raze_core::waitlist::SizeSelections;

use crate::config::WebhookConfig;
use crate::db::email_logs::{EmailLogRepository, EmailStatus};
use crate::db::failed_webhooks::{FailedWebhookRepository, NewFailure};
use crate::db::users::UserRepository;
use crate::models::abandoned_cart::AbandonedCart;
use crate::models::order::Order;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Retries after the first attempt.
const MAX_RETRIES: u32 = 3;

/// Delay before the first retry; doubles after each.
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Errors from a single delivery attempt.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Receiver answered with something other than 200.
    #[error("unexpected status {0}")]
    Status(u16),
}

/// The notification hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookKind {
    Signup,
    Giveaway,
    GiveawayWinner,
    Waitlist,
    OrderConfirmation,
    AbandonedCart(ReminderStep),
    BulkEmail,
}

impl WebhookKind {
    /// Name used in logs and `failed_webhooks`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Giveaway => "giveaway",
            Self::GiveawayWinner => "giveaway_winner",
            Self::Waitlist => "waitlist",
            Self::OrderConfirmation => "order_confirmation",
            Self::AbandonedCart(ReminderStep::First) => "abandoned_cart_1",
            Self::AbandonedCart(ReminderStep::Second) => "abandoned_cart_2",
            Self::AbandonedCart(ReminderStep::Third) => "abandoned_cart_3",
            Self::BulkEmail => "bulk_email",
        }
    }

    /// Marketing hooks are not sent to unsubscribed addresses.
    ///
    /// Bulk sends pick subscribed recipients before sending.
    #[must_use]
    pub const fn is_marketing(&self) -> bool {
        !matches!(
            self,
            Self::GiveawayWinner | Self::OrderConfirmation | Self::BulkEmail
        )
    }

    fn url<'c>(&self, config: &'c WebhookConfig) -> Option<&'c Url> {
        match self {
            Self::Signup => config.signup.as_ref(),
            Self::Giveaway => config.giveaway.as_ref(),
            Self::GiveawayWinner => config.giveaway_winner.as_ref(),
            Self::Waitlist => config.waitlist.as_ref(),
            Self::OrderConfirmation => config.order_confirmation.as_ref(),
            Self::AbandonedCart(step) => {
                let index = usize::from(step.sequence() - 1);
                config.abandoned_cart.get(index).and_then(Option::as_ref)
            }
            Self::BulkEmail => config.bulk_email.as_ref(),
        }
    }
}

/// What happened to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Receiver accepted it.
    Sent,
    /// Not attempted (no hook configured, or recipient unsubscribed).
    Skipped,
    /// All attempts failed; stored for replay.
    Failed,
}

/// Per-send options for [`WebhookDispatcher::send_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SendOptions<'a> {
    /// Stored with a failure; later failures under an open key update it.
    pub dedupe_key: Option<&'a str>,
    /// Sent again on an admin's request.
    pub resend: bool,
    /// Skip the `email_logs` entry (bulk sends log once per recipient).
    pub unlogged: bool,
}

/// Sends notification webhooks.
#[derive(Clone)]
pub struct WebhookDispatcher {
    client: reqwest::Client,
    config: Arc<WebhookConfig>,
    pool: PgPool,
    asset_base: Arc<str>,
    retry_delay: Duration,
}

impl WebhookDispatcher {
    /// Create a dispatcher.
    ///
    /// `asset_base` is the public site URL used for image links in payloads.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(
        config: WebhookConfig,
        pool: PgPool,
        asset_base: &str,
    ) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            config: Arc::new(config),
            pool,
            asset_base: Arc::from(asset_base.trim_end_matches('/')),
            retry_delay: INITIAL_RETRY_DELAY,
        })
    }

    /// Use `delay` before the first retry instead of one second.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Public site URL for payload image links.
    #[must_use]
    pub fn asset_base(&self) -> &str {
        &self.asset_base
    }

    /// Deliver in the background; the request does not wait on it.
    pub fn spawn(&self, kind: WebhookKind, email: String, payload: Value) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.send(kind, &email, &payload).await;
        });
    }

    /// Deliver a notification, retrying on failure.
    pub async fn send(&self, kind: WebhookKind, email: &str, payload: &Value) -> Delivery {
        self.send_with(kind, email, payload, SendOptions::default()).await
    }

    /// Deliver a notification with explicit options.
    #[tracing::instrument(skip(self, payload, options), fields(webhook = kind.name()))]
    pub async fn send_with(
        &self,
        kind: WebhookKind,
        email: &str,
        payload: &Value,
        options: SendOptions<'_>,
    ) -> Delivery {
        let Some(url) = kind.url(&self.config) else {
            tracing::debug!("Webhook URL not configured, skipping");
            return Delivery::Skipped;
        };

        if kind.is_marketing() {
            match UserRepository::new(&self.pool).is_unsubscribed(email).await {
                Ok(true) => {
                    tracing::info!(email, "Recipient unsubscribed, skipping webhook");
                    self.log(email, kind, EmailStatus::Skipped, options, Some("unsubscribed"))
                        .await;
                    return Delivery::Skipped;
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(error = %e, "Could not check subscription state"),
            }
        }

        let mut delay = self.retry_delay;
        let mut last_error = String::new();

        for attempt in 1..=MAX_RETRIES + 1 {
            match self.post(url, payload).await {
                Ok(()) => {
                    tracing::info!(attempt, "Webhook sent");
                    self.log(email, kind, EmailStatus::Sent, options, None).await;
                    return Delivery::Sent;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Webhook attempt failed");
                    last_error = e.to_string();
                }
            }

            if attempt <= MAX_RETRIES {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        tracing::error!(email, "Webhook failed after all retries");

        #[allow(clippy::cast_possible_wrap)] // MAX_RETRIES is tiny
        let attempts = (MAX_RETRIES + 1) as i32;
        let failure = NewFailure {
            webhook_name: kind.name(),
            url: url.as_str(),
            payload,
            error: &last_error,
            retry_count: attempts,
            dedupe_key: options.dedupe_key,
        };
        if let Err(e) = FailedWebhookRepository::new(&self.pool).record(&failure).await {
            tracing::error!(error = %e, "Could not store failed webhook");
        }
        self.log(email, kind, EmailStatus::Failed, options, Some(&last_error))
            .await;

        Delivery::Failed
    }

    async fn log(
        &self,
        email: &str,
        kind: WebhookKind,
        status: EmailStatus,
        options: SendOptions<'_>,
        error: Option<&str>,
    ) {
        if options.unlogged {
            return;
        }
        if let Err(e) = EmailLogRepository::new(&self.pool)
            .record(email, kind.name(), status, options.resend, error)
            .await
        {
            tracing::warn!(error = %e, "Could not log notification");
        }
    }

    async fn post(&self, url: &Url, payload: &Value) -> Result<(), WebhookError> {
        let response = self.client.post(url.clone()).json(payload).send().await?;
        let status = response.status();

        if status != reqwest::StatusCode::OK {
            return Err(WebhookError::Status(status.as_u16()));
        }

        Ok(())
    }
}

// =============================================================================
// Payloads
// =============================================================================

fn logo_url(base: &str) -> String {
    format!("{base}/images/logo/raze_logo.png")
}

fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Account created (or Google profile completed).
#[must_use]
pub fn signup_payload(
    base: &str,
    email: &str,
    name: &str,
    discount_code: &str,
    signup_method: &str,
    gymnastics_type: Option<&str>,
) -> Value {
    let athlete = match gymnastics_type {
        Some("wag") => "wag",
        _ => "mag",
    };

    json!({
        "event_type": "account_signup",
        "email": email,
        "name": name,
        "discount_code": discount_code,
        "signup_method": signup_method,
        "gymnastics_type": gymnastics_type,
        "athlete_image": format!("{base}/images/athletes/{athlete}_athlete.jpg"),
        "logo_url": logo_url(base),
        "timestamp": timestamp(),
    })
}

/// Giveaway entry confirmation.
#[must_use]
pub fn giveaway_payload(base: &str, email: &str, entry_id: &str) -> Value {
    json!({
        "event_type": "giveaway_entry",
        "email": email,
        "entry_id": entry_id,
        "logo_url": logo_url(base),
        "timestamp": timestamp(),
    })
}

/// Giveaway winner announcement.
#[must_use]
pub fn giveaway_winner_payload(
    base: &str,
    email: &str,
    entry_id: &str,
    prize: &str,
    winner_name: Option<&str>,
) -> Value {
    json!({
        "event_type": "giveaway_winner",
        "email": email,
        "entry_id": entry_id,
        "prize": prize,
        "winner_name": winner_name.unwrap_or("Winner"),
        "logo_url": logo_url(base),
        "timestamp": timestamp(),
    })
}

/// A waitlist entry as sent to the notification hook.
#[derive(Debug, Clone, Copy)]
pub struct WaitlistNotice<'a> {
    pub email: &'a str,
    pub product_name: &'a str,
    pub variant: &'a str,
    pub image: Option<&'a str>,
    pub sizes: &'a SizeSelections,
    pub access_code: &'a str,
    pub is_update: bool,
}

/// Waitlist join or size update.
#[must_use]
pub fn waitlist_payload(base: &str, notice: &WaitlistNotice<'_>) -> Value {
    let image = notice.image.map_or_else(String::new, |image| {
        if image.starts_with("http") {
            image.to_string()
        } else {
            format!("{base}/{}", image.trim_start_matches('/'))
        }
    });

    json!({
        "event_type": if notice.is_update { "waitlist_update" } else { "waitlist_join" },
        "is_update": notice.is_update,
        "email": notice.email,
        "product_name": notice.product_name,
        "product_variant": notice.variant,
        "product_image": image,
        "logo_url": logo_url(base),
        "sizes": notice.sizes,
        "sizes_display": notice.sizes.to_display(),
        "access_code": notice.access_code,
        "timestamp": timestamp(),
    })
}

/// Order confirmation receipt.
#[must_use]
pub fn order_confirmation_payload(order: &Order) -> Value {
    let ShippingAddress {
        first_name,
        last_name,
        address_line1,
        address_line2,
        city,
        state,
        postal_code,
        country,
        ..
    } = &order.shipping_address;

    let items: Vec<Value> = order
        .items
        .iter()
        .map(|line| {
            json!({
                "product_name": line.name,
                "color": line.color,
                "size": line.size,
                "quantity": line.quantity,
                "price": line.unit_price,
                "image": line.image.as_deref().unwrap_or_default(),
            })
        })
        .collect();

    json!({
        "event_type": "order_confirmation",
        "email": order.email,
        "customer_name": first_name,
        "order_number": order.order_number,
        "items": items,
        "subtotal": order.subtotal,
        "discount": order.discount,
        "discount_description": order.discount_description.as_deref().unwrap_or_default(),
        "shipping_cost": order.shipping_cost,
        "total": order.total,
        "shipping_address": {
            "first_name": first_name,
            "last_name": last_name,
            "address_line1": address_line1,
            "address_line2": address_line2.as_deref().unwrap_or_default(),
            "city": city,
            "state": state,
            "postal_code": postal_code,
            "country": country,
        },
        "timestamp": timestamp(),
    })
}

/// Abandoned-cart reminder.
#[must_use]
pub fn abandoned_cart_payload(cart: &AbandonedCart, step: ReminderStep) -> Value {
    json!({
        "email": cart.email,
        "cart_items": cart.cart_items,
        "cart_total": cart.cart_total,
        "email_sequence": step.sequence(),
        "timestamp": timestamp(),
    })
}

/// One admin-composed email to many recipients.
#[must_use]
pub fn bulk_email_payload(
    base: &str,
    target: &str,
    subject: &str,
    html_content: &str,
    recipients: &[String],
) -> Value {
    json!({
        "event_type": "bulk_email",
        "target": target,
        "subject": subject,
        "html_content": html_content,
        "recipients": recipients,
        "recipient_count": recipients.len(),
        "logo_url": logo_url(base),
        "timestamp": timestamp(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BASE: &str = "https://razetraining.com";

    #[test]
    fn test_marketing_kinds() {
        assert!(WebhookKind::Signup.is_marketing());
        assert!(WebhookKind::Waitlist.is_marketing());
        assert!(WebhookKind::AbandonedCart(ReminderStep::Second).is_marketing());
        assert!(!WebhookKind::OrderConfirmation.is_marketing());
        assert!(!WebhookKind::GiveawayWinner.is_marketing());
        assert!(!WebhookKind::BulkEmail.is_marketing());
    }

    #[test]
    fn test_bulk_email_payload_counts_recipients() {
        let recipients = vec!["a@b.co".to_string(), "c@d.co".to_string()];
        let payload = bulk_email_payload(BASE, "subscribers", "Drop day", "<p>Hi</p>", &recipients);
        assert_eq!(payload["event_type"], "bulk_email");
        assert_eq!(payload["recipient_count"], 2);
        assert_eq!(payload["recipients"][1], "c@d.co");
    }

    #[test]
    fn test_abandoned_cart_urls_by_step() {
        let config = WebhookConfig {
            abandoned_cart: [
                None,
                Some(Url::parse("https://hooks.example.net/cart-2").unwrap()),
                None,
            ],
            ..WebhookConfig::default()
        };

        assert!(WebhookKind::AbandonedCart(ReminderStep::First).url(&config).is_none());
        assert_eq!(
            WebhookKind::AbandonedCart(ReminderStep::Second)
                .url(&config)
                .unwrap()
                .path(),
            "/cart-2"
        );
        assert!(WebhookKind::Signup.url(&config).is_none());
    }

    #[test]
    fn test_signup_payload_athlete_image() {
        let payload = signup_payload(BASE, "a@b.co", "Ana", "WELCOME1A2B3C", "email", Some("wag"));
        assert_eq!(payload["event_type"], "account_signup");
        assert_eq!(
            payload["athlete_image"],
            "https://razetraining.com/images/athletes/wag_athlete.jpg"
        );

        let payload = signup_payload(BASE, "a@b.co", "Ana", "WELCOME1A2B3C", "google", None);
        assert_eq!(
            payload["athlete_image"],
            "https://razetraining.com/images/athletes/mag_athlete.jpg"
        );
    }

    #[test]
    fn test_waitlist_payload() {
        let sizes = SizeSelections::parse("M x1, L x2");
        let payload = waitlist_payload(
            BASE,
            &WaitlistNotice {
                email: "a@b.co",
                product_name: "Performance T-Shirt",
                variant: "Black / Cyan",
                image: Some("/images/shirt.png"),
                sizes: &sizes,
                access_code: "RAZE-0A1B2C3D",
                is_update: true,
            },
        );

        assert_eq!(payload["event_type"], "waitlist_update");
        assert_eq!(payload["sizes_display"], "M - 1 item, L - 2 items");
        assert_eq!(
            payload["product_image"],
            "https://razetraining.com/images/shirt.png"
        );
    }

    #[test]
    fn test_winner_name_defaults() {
        let payload = giveaway_winner_payload(BASE, "a@b.co", "RAZE-ABCDE", "Full kit", None);
        assert_eq!(payload["winner_name"], "Winner");
        assert_eq!(payload["logo_url"], "https://razetraining.com/images/logo/raze_logo.png");
    }
}
