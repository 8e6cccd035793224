//! Order management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use raze_core::{Money, OrderId, OrderStatus};
use raze_storefront::db::orders::{OrderChanges, OrderRepository};
use raze_storefront::models::order::{Order, OrderUpdate, StatusCount};

use super::{Pagination, record_activity};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::Action;
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(index))
        .route("/orders/stats", get(stats))
        .route("/orders/{id}", get(show).patch(update))
        .route("/orders/{id}/label", post(label))
}

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub skip: i64,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
    pub skip: i64,
    pub limit: i64,
}

/// Order counts with every status present.
#[derive(Debug, Serialize)]
pub struct OrderStats {
    pub total_orders: i64,
    pub by_status: Vec<StatusCount>,
    pub total_revenue: Money,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub order: Order,
    /// Credits given to the customer by this change, if any.
    pub credits_awarded: Option<i32>,
}

/// Parse an optional status, treating blank as absent.
///
/// # Errors
///
/// Returns 400 for an unknown status.
fn parse_status(input: Option<&str>) -> Result<Option<OrderStatus>> {
    match input.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e: raze_core::ParseStatusError| AppError::BadRequest(e.to_string())),
    }
}

/// Fill in zero counts for statuses with no orders, in lifecycle order.
fn zero_filled(counts: &[StatusCount]) -> Vec<StatusCount> {
    OrderStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: counts
                .iter()
                .find(|c| c.status == status)
                .map_or(0, |c| c.count),
        })
        .collect()
}

/// Orders, newest first.
///
/// GET /api/admin/orders?status=&email=&skip=&limit=
///
/// # Errors
///
/// Returns 400 for an unknown status.
#[instrument(skip(state, _admin, query))]
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<OrdersResponse>> {
    let status = parse_status(query.status.as_deref())?;
    let mut page = Pagination {
        skip: query.skip,
        ..Pagination::default()
    };
    if let Some(limit) = query.limit {
        page.limit = limit;
    }
    let email = query.email.as_deref().map(str::trim).filter(|e| !e.is_empty());

    let orders = OrderRepository::new(state.shop_pool())
        .list(status, email, page.offset(), page.limit())
        .await?;

    Ok(Json(OrdersResponse {
        orders,
        skip: page.offset(),
        limit: page.limit(),
    }))
}

/// Count per status and revenue (cancelled orders excluded).
///
/// GET /api/admin/orders/stats
///
/// # Errors
///
/// Returns 500 if a count fails.
#[instrument(skip(state, _admin))]
async fn stats(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<OrderStats>> {
    let repo = OrderRepository::new(state.shop_pool());
    let counts = repo.count_by_status().await?;
    let total_revenue = repo.revenue(None).await?;

    Ok(Json(OrderStats {
        total_orders: counts.iter().map(|c| c.count).sum(),
        by_status: zero_filled(&counts),
        total_revenue,
    }))
}

/// One order.
///
/// GET /api/admin/orders/{id}
///
/// # Errors
///
/// Returns 404 if the order doesn't exist.
#[instrument(skip(state, _admin))]
async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.shop_pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// Change status, tracking or notes.
///
/// PATCH /api/admin/orders/{id}
///
/// Moving an order to delivered awards the customer's credits once.
///
/// # Errors
///
/// Returns 400 for an unknown status, 404 if the order doesn't exist.
#[instrument(skip(state, admin, req))]
async fn update(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<OrderId>,
    Json(req): Json<OrderUpdate>,
) -> Result<Json<UpdateResponse>> {
    let changes = OrderChanges {
        status: parse_status(req.status.as_deref())?,
        tracking_number: req.tracking_number.as_deref(),
        carrier: req.carrier.as_deref(),
        notes: req.notes.as_deref(),
        estimated_delivery: req.estimated_delivery.as_deref(),
    };

    let applied = OrderRepository::new(state.shop_pool())
        .apply_changes(id, &changes)
        .await?;

    if let Some(credits) = applied.credits_awarded {
        tracing::info!(order_id = %id, credits, "Delivery credits awarded");
    }
    record_activity(
        &state,
        &admin,
        Action::OrderUpdated,
        Some(&applied.order.order_number),
        json!({
            "status": changes.status.map(|s| s.as_str()),
            "tracking_number": changes.tracking_number,
            "credits_awarded": applied.credits_awarded,
        }),
    )
    .await;

    Ok(Json(UpdateResponse {
        success: true,
        order: applied.order,
        credits_awarded: applied.credits_awarded,
    }))
}

/// A rate quoted by `/api/shipping/rates`.
#[derive(Debug, Deserialize)]
pub struct LabelRequest {
    pub rate_id: String,
}

#[derive(Debug, Serialize)]
pub struct LabelResponse {
    pub success: bool,
    pub order: Order,
    pub tracking_number: String,
    pub label_url: String,
    pub carrier: Option<String>,
}

/// Buy a shipping label and attach its tracking to the order.
///
/// POST /api/admin/orders/{id}/label
///
/// The order must exist before the label is bought.
///
/// # Errors
///
/// Returns 404 for an unknown order, 503 when shipping is not configured,
/// 400 if the carrier refuses the label.
#[instrument(skip(state, admin, req))]
async fn label(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<OrderId>,
    Json(req): Json<LabelRequest>,
) -> Result<Json<LabelResponse>> {
    let rate_id = req.rate_id.trim();
    if rate_id.is_empty() {
        return Err(AppError::BadRequest("rate_id is required".to_string()));
    }
    let shipping = state
        .shipping()
        .cloned()
        .ok_or_else(|| AppError::ServiceUnavailable("Shipping is not configured".to_string()))?;

    let orders = OrderRepository::new(state.shop_pool());
    orders
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    let label = shipping.buy_label(rate_id).await?;
    let order = orders
        .record_label(id, &label.tracking_number, label.carrier.as_deref(), &label.label_url)
        .await?;

    tracing::info!(order_id = %id, carrier = ?label.carrier, "Shipping label bought");
    record_activity(
        &state,
        &admin,
        Action::ShippingLabelCreated,
        Some(&order.order_number),
        json!({ "rate_id": rate_id, "tracking_number": label.tracking_number }),
    )
    .await;

    Ok(Json(LabelResponse {
        success: true,
        order,
        tracking_number: label.tracking_number,
        label_url: label.label_url,
        carrier: label.carrier,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status(None).ok(), Some(None));
        assert_eq!(parse_status(Some("  ")).ok(), Some(None));
        assert_eq!(
            parse_status(Some("Shipped")).ok(),
            Some(Some(OrderStatus::Shipped))
        );
        assert!(parse_status(Some("lost")).is_err());
    }

    #[test]
    fn test_zero_filled_covers_every_status() {
        let counts = [StatusCount {
            status: OrderStatus::Delivered,
            count: 4,
        }];
        let filled = zero_filled(&counts);
        assert_eq!(filled.len(), OrderStatus::ALL.len());
        assert_eq!(filled.iter().map(|c| c.count).sum::<i64>(), 4);
        assert!(
            filled
                .iter()
                .any(|c| c.status == OrderStatus::Delivered && c.count == 4)
        );
    }
}
