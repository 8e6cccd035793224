//! Order placement and tracking.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use raze_core::cart::{self, CartLine, CartQuote};
use raze_core::order::{ShippingAddress, TimelineStep, normalize_order_number, order_number};
use raze_core::{Money, OrderId, OrderStatus};

use super::cart::{apply_promo, price_cart};
use super::parse_email;
use crate::db::orders::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::models::order::{NewOrder, Order};
use crate::state::AppState;

/// Order form.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<CartLine>,
    #[serde(alias = "shipping")]
    pub shipping_address: ShippingAddress,
    pub promo_code: Option<String>,
    #[serde(default)]
    pub shipping_cost: Money,
}

/// A newly placed order.
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub success: bool,
    pub message: String,
    pub order_number: String,
    pub order: Order,
}

/// Place an order without online payment.
///
/// POST /api/orders
///
/// Lines are repriced from the catalog and totals recomputed; any promo
/// code is validated but its use is counted separately.
///
/// # Errors
///
/// Returns 400 for an invalid cart, email or promo code.
#[instrument(skip(state, user, req), fields(items = req.items.len()))]
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>> {
    let email = parse_email(&req.shipping_address.email)?;
    let items = price_cart(&state, &req.items).await?;
    let user_id = user.map(|u| u.id);

    let subtotal = cart::subtotal(&items).round_cents();
    let promo = match req.promo_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => Some(apply_promo(&state, code, subtotal, user_id).await?),
        _ => None,
    };
    let quote = CartQuote::build(&items, promo.as_ref(), Money::ZERO);
    let shipping_cost = req.shipping_cost.non_negative().round_cents();

    let number = order_number();
    let order = OrderRepository::new(state.pool())
        .create(&NewOrder {
            order_number: &number,
            user_id,
            email: email.as_str(),
            customer_name: &req.shipping_address.full_name(),
            items: &items,
            subtotal: quote.subtotal,
            discount: quote.discount_total(),
            discount_description: quote.discount_display.as_deref(),
            promo_code: quote.promo_code.as_deref(),
            shipping_cost,
            total: quote.total + shipping_cost,
            status: OrderStatus::Pending,
            shipping_address: &req.shipping_address,
            stripe_session_id: None,
        })
        .await?;

    tracing::info!(order_number = %order.order_number, total = %order.total, "Order created");
    add_breadcrumb("orders", "Order created", Some(&[("order_number", &order.order_number)]));

    Ok(Json(CreateOrderResponse {
        success: true,
        message: "Order created successfully!".to_string(),
        order_number: order.order_number.clone(),
        order,
    }))
}

/// Query for [`track`].
#[derive(Debug, Deserialize)]
pub struct TrackQuery {
    pub order_number: Option<String>,
    pub email: Option<String>,
}

/// Shipping summary shown on the tracking page.
#[derive(Debug, Serialize)]
pub struct TrackingAddress {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// Public view of an order for tracking.
#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub order_number: String,
    pub status: OrderStatus,
    pub items: Vec<CartLine>,
    pub subtotal: Money,
    pub discount: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub shipping_address: TrackingAddress,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub timeline: Vec<TimelineStep>,
    pub estimated_delivery: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for TrackResponse {
    fn from(order: Order) -> Self {
        let timeline = order.timeline();
        let ship = order.shipping_address;
        Self {
            order_number: order.order_number,
            status: order.status,
            items: order.items,
            subtotal: order.subtotal,
            discount: order.discount,
            shipping_cost: order.shipping_cost,
            total: order.total,
            shipping_address: TrackingAddress {
                name: ship.full_name(),
                address: ship.address_line1,
                city: ship.city,
                state: ship.state,
                postal_code: ship.postal_code,
                country: ship.country,
            },
            tracking_number: order.tracking_number,
            carrier: order.carrier,
            timeline,
            estimated_delivery: order.estimated_delivery,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Track an order by number.
///
/// GET /api/orders/track?order_number=&email=
///
/// When an email is given it must match the shipping email.
///
/// # Errors
///
/// Returns 404 if the order doesn't exist or the email doesn't match.
#[instrument(skip(state, query))]
pub async fn track(
    State(state): State<AppState>,
    Query(query): Query<TrackQuery>,
) -> Result<Json<TrackResponse>> {
    let number = query
        .order_number
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("order_number is required".to_string()))?;
    track_order(&state, number, query.email.as_deref()).await
}

/// Track an order by number in the path.
///
/// GET /api/orders/track/{order_number}?email=
///
/// # Errors
///
/// Returns 404 if the order doesn't exist or the email doesn't match.
#[instrument(skip(state, query))]
pub async fn track_by_path(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Query(query): Query<TrackQuery>,
) -> Result<Json<TrackResponse>> {
    track_order(&state, &number, query.email.as_deref()).await
}

async fn track_order(
    state: &AppState,
    number: &str,
    email: Option<&str>,
) -> Result<Json<TrackResponse>> {
    let not_found = || AppError::NotFound("Order not found".to_string());

    let order = OrderRepository::new(state.pool())
        .by_number(&normalize_order_number(number))
        .await?
        .ok_or_else(not_found)?;

    if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty())
        && !order.shipping_address.email.eq_ignore_ascii_case(email)
    {
        return Err(not_found());
    }

    Ok(Json(order.into()))
}

/// An order by numeric id or order number.
///
/// GET /api/orders/{order_ref}
///
/// # Errors
///
/// Returns 404 if the order doesn't exist.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(order_ref): Path<String>,
) -> Result<Json<Order>> {
    let repo = OrderRepository::new(state.pool());
    let order = match order_ref.parse::<OrderId>() {
        Ok(id) => repo.get(id).await?,
        Err(_) => repo.by_number(&normalize_order_number(&order_ref)).await?,
    };

    order
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}
