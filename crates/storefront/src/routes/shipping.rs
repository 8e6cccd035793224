//! Shipping rates and parcel tracking.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use raze_core::order::ShippingAddress;

use crate::error::{AppError, Result};
use crate::services::shipping::{Parcel, Rate, ShippingProvider, Tracking};
use crate::state::AppState;

fn provider(state: &AppState) -> Result<Arc<dyn ShippingProvider>> {
    state
        .shipping()
        .cloned()
        .ok_or_else(|| AppError::ServiceUnavailable("Shipping is not configured".to_string()))
}

/// Rate request: destination plus optional parcel size.
#[derive(Debug, Deserialize)]
pub struct RatesRequest {
    pub address_to: ShippingAddress,
    #[serde(flatten)]
    pub parcel: Parcel,
}

#[derive(Debug, Serialize)]
pub struct RatesResponse {
    pub success: bool,
    pub rates: Vec<Rate>,
    pub message: String,
}

/// Carrier options to an address, cheapest first.
///
/// POST /api/shipping/rates
///
/// # Errors
///
/// Returns 503 when shipping is not configured and 502 if the carrier
/// call fails.
#[instrument(skip(state, req), fields(country = %req.address_to.country))]
pub async fn rates(
    State(state): State<AppState>,
    Json(req): Json<RatesRequest>,
) -> Result<Json<RatesResponse>> {
    let shipping = provider(&state)?;
    let rates = shipping.rates(&req.address_to, req.parcel).await?;

    Ok(Json(RatesResponse {
        success: true,
        message: format!("Found {} shipping options", rates.len()),
        rates,
    }))
}

/// Where a parcel is.
///
/// GET /api/shipping/tracking/{carrier}/{tracking_number}
///
/// # Errors
///
/// Returns 503 when shipping is not configured and 502 if the carrier
/// call fails.
#[instrument(skip(state))]
pub async fn tracking(
    State(state): State<AppState>,
    Path((carrier, tracking_number)): Path<(String, String)>,
) -> Result<Json<Tracking>> {
    let shipping = provider(&state)?;
    Ok(Json(shipping.track(&carrier, &tracking_number).await?))
}
