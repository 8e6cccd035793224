//! Visitor analytics types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use raze_core::analytics::DeviceInfo;
use raze_core::{UserId, UserType, VisitorSessionId};

/// Where an IP address is, as far as the lookup service knows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
}

/// One browser session on the storefront.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VisitorSession {
    pub id: VisitorSessionId,
    pub session_id: String,
    pub user_id: Option<UserId>,
    pub user_email: Option<String>,
    pub user_type: UserType,
    pub ip_address: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    pub device_type: String,
    pub browser: String,
    pub os: String,
    pub screen_resolution: Option<String>,
    pub language: Option<String>,
    pub referrer: String,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub landing_page: Option<String>,
    pub current_page: Option<String>,
    pub pages_viewed: Vec<String>,
    pub first_visit: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Seconds between the first visit and the latest heartbeat.
    pub session_duration: i64,
}

/// Everything recorded when a visit is tracked.
#[derive(Debug, Clone)]
pub struct NewVisit<'a> {
    pub session_id: &'a str,
    pub user_id: Option<UserId>,
    pub user_email: Option<&'a str>,
    pub user_type: UserType,
    pub ip_address: Option<&'a str>,
    pub geo: &'a GeoLocation,
    pub device: DeviceInfo,
    pub screen_resolution: Option<&'a str>,
    pub language: Option<&'a str>,
    /// Browser timezone, used when the geolocation lookup has none.
    pub timezone: Option<&'a str>,
    pub referrer: &'a str,
    pub utm_source: Option<&'a str>,
    pub utm_medium: Option<&'a str>,
    pub utm_campaign: Option<&'a str>,
    pub landing_page: Option<&'a str>,
}

/// A recorded page view.
#[derive(Debug, Clone)]
pub struct NewPageView<'a> {
    pub session_id: &'a str,
    pub page_path: &'a str,
    pub page_title: Option<&'a str>,
    pub referrer: Option<&'a str>,
    pub time_on_page: Option<i64>,
}

/// A recorded custom event such as `add_to_cart`.
#[derive(Debug, Clone)]
pub struct NewEvent<'a> {
    pub session_id: &'a str,
    pub event_type: &'a str,
    pub event_category: Option<&'a str>,
    pub event_label: Option<&'a str>,
    pub event_value: Option<f64>,
    pub event_data: &'a serde_json::Value,
}

/// A stored analytics event.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AnalyticsEvent {
    pub id: i32,
    pub session_id: String,
    pub event_type: String,
    pub event_category: Option<String>,
    pub event_label: Option<String>,
    pub event_value: Option<f64>,
    pub event_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
