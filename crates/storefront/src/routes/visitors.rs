//! Visitor analytics collection.
//!
//! ```text
//! POST /api/visitors/track     - Start or refresh a browser session
//! POST /api/visitors/heartbeat - Keep a session alive, note the page
//! POST /api/visitors/pageview  - Record a page view
//! POST /api/visitors/event     - Record a custom event
//! GET  /api/visitors/live      - Sessions active in the last few minutes
//! ```

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header::USER_AGENT},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use raze_core::UserType;
use raze_core::analytics::DeviceInfo;

use crate::db::visitors::VisitorRepository;
use crate::error::Result;
use crate::middleware::{OptionalAuth, visitor_ip};
use crate::models::visitor::{GeoLocation, NewEvent, NewPageView, NewVisit};
use crate::services::live_visitors::LiveVisitor;
use crate::state::AppState;

/// Session details sent by the browser.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TrackRequest {
    pub session_id: Option<String>,
    pub screen_resolution: Option<String>,
    pub language: Option<String>,
    pub timezone: Option<String>,
    pub referrer: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub landing_page: Option<String>,
}

/// Coarse location echoed back to the browser.
#[derive(Debug, Serialize)]
pub struct TrackLocation {
    pub country: Option<String>,
    pub city: Option<String>,
}

/// Track result.
#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub success: bool,
    pub session_id: String,
    pub location: TrackLocation,
}

/// Start or refresh a visitor session.
///
/// POST /api/visitors/track
///
/// # Errors
///
/// Returns 500 if the session cannot be stored.
#[instrument(skip_all)]
pub async fn track(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
    Json(req): Json<TrackRequest>,
) -> Result<Json<TrackResponse>> {
    let session_id = req
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let ip = visitor_ip(&headers);
    let geo = match ip {
        Some(ip) => state.geo().locate(ip).await,
        None => GeoLocation::default(),
    };
    let ip_text = ip.map(|ip| ip.to_string());

    let device = DeviceInfo::parse(
        headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default(),
    );

    let user_type = match &user {
        Some(u) if state.config().is_admin_email(u.email.as_str()) => UserType::Admin,
        Some(_) => UserType::Registered,
        None => UserType::Guest,
    };

    let session = VisitorRepository::new(state.pool())
        .upsert_session(&NewVisit {
            session_id: &session_id,
            user_id: user.as_ref().map(|u| u.id),
            user_email: user.as_ref().map(|u| u.email.as_str()),
            user_type,
            ip_address: ip_text.as_deref(),
            geo: &geo,
            device,
            screen_resolution: req.screen_resolution.as_deref(),
            language: req.language.as_deref(),
            timezone: req.timezone.as_deref(),
            referrer: req.referrer.as_deref().unwrap_or("direct"),
            utm_source: req.utm_source.as_deref(),
            utm_medium: req.utm_medium.as_deref(),
            utm_campaign: req.utm_campaign.as_deref(),
            landing_page: req.landing_page.as_deref(),
        })
        .await?;

    state
        .live_visitors()
        .touch(LiveVisitor {
            session_id: session.session_id.clone(),
            current_page: session.current_page.clone(),
            country: session.country.clone(),
        })
        .await;

    Ok(Json(TrackResponse {
        success: true,
        session_id: session.session_id,
        location: TrackLocation {
            country: session.country,
            city: session.city,
        },
    }))
}

/// Periodic ping from an open page.
#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    pub session_id: String,
    #[serde(alias = "current_page")]
    pub page: Option<String>,
}

/// Keep a session alive.
///
/// POST /api/visitors/heartbeat
///
/// # Errors
///
/// Returns 500 if the update fails.
#[instrument(skip_all)]
pub async fn heartbeat(
    State(state): State<AppState>,
    Json(req): Json<HeartbeatRequest>,
) -> Result<Json<serde_json::Value>> {
    let page = req.page.as_deref().filter(|p| !p.is_empty());
    let duration = VisitorRepository::new(state.pool())
        .heartbeat(&req.session_id, page)
        .await?;

    let Some(duration) = duration else {
        return Ok(Json(json!({ "success": false, "message": "Session not found" })));
    };

    if !state.live_visitors().heartbeat(&req.session_id, page).await {
        state
            .live_visitors()
            .touch(LiveVisitor {
                session_id: req.session_id.clone(),
                current_page: page.map(String::from),
                country: None,
            })
            .await;
    }

    Ok(Json(json!({ "success": true, "duration": duration })))
}

/// A page view.
#[derive(Debug, Deserialize)]
pub struct PageViewRequest {
    pub session_id: String,
    pub page_path: String,
    pub page_title: Option<String>,
    pub referrer: Option<String>,
    pub time_on_page: Option<i64>,
}

/// Record a page view.
///
/// POST /api/visitors/pageview
///
/// # Errors
///
/// Returns 500 if the insert fails.
#[instrument(skip_all)]
pub async fn pageview(
    State(state): State<AppState>,
    Json(req): Json<PageViewRequest>,
) -> Result<Json<serde_json::Value>> {
    VisitorRepository::new(state.pool())
        .record_page_view(&NewPageView {
            session_id: &req.session_id,
            page_path: &req.page_path,
            page_title: req.page_title.as_deref(),
            referrer: req.referrer.as_deref(),
            time_on_page: req.time_on_page,
        })
        .await?;

    Ok(Json(json!({ "success": true })))
}

/// A custom event such as `add_to_cart`.
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub session_id: String,
    pub event_type: String,
    pub event_category: Option<String>,
    pub event_label: Option<String>,
    pub event_value: Option<f64>,
    #[serde(default)]
    pub event_data: serde_json::Value,
}

/// Record a custom event.
///
/// POST /api/visitors/event
///
/// # Errors
///
/// Returns 500 if the insert fails.
#[instrument(skip_all, fields(event_type = %req.event_type))]
pub async fn event(
    State(state): State<AppState>,
    Json(req): Json<EventRequest>,
) -> Result<Json<serde_json::Value>> {
    let data = if req.event_data.is_null() {
        json!({})
    } else {
        req.event_data
    };

    VisitorRepository::new(state.pool())
        .record_event(&NewEvent {
            session_id: &req.session_id,
            event_type: &req.event_type,
            event_category: req.event_category.as_deref(),
            event_label: req.event_label.as_deref(),
            event_value: req.event_value,
            event_data: &data,
        })
        .await?;

    Ok(Json(json!({ "success": true })))
}

/// Live visitor count.
#[derive(Debug, Serialize)]
pub struct LiveResponse {
    pub count: u64,
}

/// Sessions active in the last few minutes.
///
/// GET /api/visitors/live
#[instrument(skip_all)]
pub async fn live(State(state): State<AppState>) -> Json<LiveResponse> {
    Json(LiveResponse {
        count: state.live_visitors().count().await,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_track_request_tolerates_missing_fields() {
        let req: TrackRequest = serde_json::from_str("{}").unwrap();
        assert!(req.session_id.is_none());
        assert!(req.referrer.is_none());
    }

    #[test]
    fn test_heartbeat_accepts_current_page() {
        let req: HeartbeatRequest =
            serde_json::from_str(r#"{"session_id": "s1", "current_page": "/shop"}"#).unwrap();
        assert_eq!(req.page.as_deref(), Some("/shop"));
    }
}
