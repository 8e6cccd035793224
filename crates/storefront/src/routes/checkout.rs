//! Hosted checkout.
//!
//! ```text
//! POST /api/checkout/session             - Price the cart, open a payment page
//! GET  /api/checkout/status/{session_id} - Poll payment, create the order once paid
//! POST /api/checkout/webhook             - Provider event callback
//! ```
//!
//! The order is created by whichever of the status poll or the webhook
//! first sees the session paid; the other finds it already done. The
//! confirmation notice is claimed separately, so a request that fails after
//! the order exists leaves it for the next poll or event to send.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use raze_core::cart::{self, CartLine, CartQuote};
use raze_core::order::{ShippingAddress, order_number};
use raze_core::{Money, PaymentStatus};

use super::cart::{apply_promo, price_cart};
use super::parse_email;
use crate::db::RepositoryError;
use crate::db::checkout::CheckoutRepository;
use crate::db::orders::OrderRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::models::checkout::NewPendingOrder;
use crate::models::order::Order;
use crate::services::payments::{CheckoutRequest, CheckoutStatus, PaymentProvider};
use crate::services::webhooks::{WebhookKind, order_confirmation_payload};
use crate::state::AppState;

/// Header carrying the provider's webhook signature.
const SIGNATURE_HEADER: &str = "stripe-signature";

fn provider(state: &AppState) -> Result<Arc<dyn PaymentProvider>> {
    state
        .payments()
        .cloned()
        .ok_or_else(|| AppError::ServiceUnavailable("Payments are not configured".to_string()))
}

/// Checkout form.
#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub items: Vec<CartLine>,
    #[serde(alias = "shipping_address")]
    pub shipping: ShippingAddress,
    pub email: Option<String>,
    pub promo_code: Option<String>,
    pub origin_url: String,
}

/// A created payment page.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub url: String,
    pub session_id: String,
    pub quote: CartQuote,
}

/// Price the cart and open a hosted payment page.
///
/// POST /api/checkout/session
///
/// The amount charged is computed from catalog prices; prices sent with
/// the items are ignored.
///
/// # Errors
///
/// Returns 400 for an invalid cart or code, 502 if the provider fails and
/// 503 when payments are not configured.
#[instrument(skip(state, user, req), fields(items = req.items.len()))]
pub async fn create_session(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(req): Json<SessionRequest>,
) -> Result<Json<SessionResponse>> {
    let payments = provider(&state)?;

    let email = parse_email(req.email.as_deref().unwrap_or(&req.shipping.email))?;
    let items = price_cart(&state, &req.items).await?;

    let subtotal = cart::subtotal(&items).round_cents();
    let promo = match req.promo_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => {
            Some(apply_promo(&state, code, subtotal, user.map(|u| u.id)).await?)
        }
        _ => None,
    };
    let quote = CartQuote::build(&items, promo.as_ref(), Money::ZERO);
    if quote.total <= Money::ZERO {
        return Err(AppError::BadRequest(
            "Order total must be greater than zero".to_string(),
        ));
    }

    let origin = req.origin_url.trim_end_matches('/');
    let customer_name = req.shipping.full_name();
    let metadata = HashMap::from([
        ("customer_email".to_string(), email.to_string()),
        ("customer_name".to_string(), customer_name.clone()),
        ("items_count".to_string(), quote.item_count.to_string()),
        ("discount".to_string(), quote.discount_total().amount().to_string()),
        ("source".to_string(), "raze_checkout".to_string()),
    ]);

    let session = payments
        .create_checkout_session(&CheckoutRequest {
            amount: quote.total,
            currency: "usd".to_string(),
            description: format!("RAZE Order ({} items)", quote.item_count),
            customer_email: email.to_string(),
            success_url: format!("{origin}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{origin}/cart"),
            metadata: metadata.clone(),
        })
        .await?;

    CheckoutRepository::new(state.pool())
        .begin(
            &NewPendingOrder {
                stripe_session_id: &session.session_id,
                email: email.as_str(),
                customer_name: &customer_name,
                items: &items,
                shipping_address: &req.shipping,
                subtotal: quote.subtotal,
                discount: quote.discount_total(),
                discount_description: quote.discount_display.as_deref(),
                promo_code: quote.promo_code.as_deref(),
                total: quote.total,
            },
            &json!(metadata),
        )
        .await?;

    tracing::info!(session_id = %session.session_id, total = %quote.total, "Checkout session created");
    add_breadcrumb("checkout", "Checkout session created", None);

    Ok(Json(SessionResponse {
        url: session.url,
        session_id: session.session_id,
        quote,
    }))
}

/// Payment state of a session.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: String,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<raze_core::OrderId>,
}

/// Poll a session and create the order once it is paid.
///
/// GET /api/checkout/status/{session_id}
///
/// # Errors
///
/// Returns 404 for an unknown session, 502 if the provider fails and 503
/// when payments are not configured.
#[instrument(skip(state))]
pub async fn status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>> {
    let payments = provider(&state)?;

    if CheckoutRepository::new(state.pool())
        .transaction(&session_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("Checkout session not found".to_string()));
    }

    let provider_status = payments.checkout_status(&session_id).await?;
    let payment_status = record_status(&state, &session_id, &provider_status).await?;

    let order = if payment_status == PaymentStatus::Paid {
        fulfil(&state, &session_id).await?
    } else {
        None
    };

    Ok(Json(StatusResponse {
        success: true,
        status: provider_status.status,
        payment_status,
        order_number: order.as_ref().map(|o| o.order_number.clone()),
        order_id: order.map(|o| o.id),
    }))
}

/// Receive a provider event.
///
/// POST /api/checkout/webhook
///
/// # Errors
///
/// Returns 400 if the signature doesn't verify and 503 when payments are
/// not configured.
#[instrument(skip(state, headers, body))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    let payments = provider(&state)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature".to_string()))?;

    let event = payments.verify_webhook(&body, signature).map_err(|e| {
        tracing::warn!(error = %e, "Rejected payment webhook");
        AppError::BadRequest("Invalid signature".to_string())
    })?;

    tracing::info!(event_id = %event.id, event_type = %event.event_type, "Payment webhook");

    if event.event_type.starts_with("checkout.session.") {
        let session_id = event.data.object.id.clone();
        let provider_status = CheckoutStatus::from(event.data.object);
        if record_status(&state, &session_id, &provider_status).await? == PaymentStatus::Paid {
            fulfil(&state, &session_id).await?;
        }
    }

    Ok(Json(json!({ "success": true, "event_type": event.event_type })))
}

async fn record_status(
    state: &AppState,
    session_id: &str,
    provider_status: &CheckoutStatus,
) -> Result<PaymentStatus> {
    let payment_status = provider_status.payment_state();
    CheckoutRepository::new(state.pool())
        .update_status(session_id, payment_status, &provider_status.payment_status)
        .await?;
    Ok(payment_status)
}

/// Create the order for a paid session, or return the one already created,
/// then send its confirmation if nobody has yet.
async fn fulfil(state: &AppState, session_id: &str) -> Result<Option<Order>> {
    let orders = OrderRepository::new(state.pool());
    let order = match orders.by_checkout_session(session_id).await? {
        Some(existing) => existing,
        None => match complete(state, session_id).await? {
            Some(order) => order,
            None => return Ok(None),
        },
    };

    if orders.claim_confirmation(order.id).await? {
        state.webhooks().spawn(
            WebhookKind::OrderConfirmation,
            order.email.clone(),
            order_confirmation_payload(&order),
        );
    }

    Ok(Some(order))
}

/// Turn the pending order into a paid one.
async fn complete(state: &AppState, session_id: &str) -> Result<Option<Order>> {
    let transaction = CheckoutRepository::new(state.pool())
        .transaction(session_id)
        .await?;
    let user_id = match transaction.as_ref().map(|t| parse_email(&t.email)) {
        Some(Ok(email)) => UserRepository::new(state.pool())
            .get_by_email(&email)
            .await?
            .map(|u| u.id),
        _ => None,
    };

    let completed = CheckoutRepository::new(state.pool())
        .complete(session_id, &order_number(), user_id)
        .await;

    match completed {
        Ok(Some(order)) => {
            tracing::info!(order_number = %order.order_number, total = %order.total, "Paid order created");
            add_breadcrumb("checkout", "Paid order created", None);
            state.catalog().invalidate();
            Ok(Some(order))
        }
        Ok(None) | Err(RepositoryError::Conflict(_)) => Ok(OrderRepository::new(state.pool())
            .by_checkout_session(session_id)
            .await?),
        Err(e) => Err(e.into()),
    }
}
