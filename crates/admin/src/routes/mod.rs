//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /api/admin/login                     - Sign in
//! POST   /api/admin/logout                    - Sign out
//! GET    /api/admin/me                        - Current admin
//!
//! # Dashboard
//! GET    /api/admin/stats                     - Totals for a timeframe
//!
//! # People
//! GET    /api/admin/users                     - Accounts, newest first
//! DELETE /api/admin/users/{id}                - Remove an account (super admin)
//! GET    /api/admin/subscribers               - Email subscriptions
//! GET    /api/admin/subscribers/stats         - Subscriptions per source
//! DELETE /api/admin/subscribers/{id}          - Remove a subscription
//! GET    /api/admin/waitlist                  - Waitlist by position
//!
//! # Orders
//! GET    /api/admin/orders                    - Filtered list
//! GET    /api/admin/orders/stats              - Count per status, revenue
//! GET    /api/admin/orders/{id}               - One order
//! PATCH  /api/admin/orders/{id}               - Status, tracking, notes
//! POST   /api/admin/orders/{id}/label         - Buy a shipping label
//!
//! # Inventory
//! GET    /api/admin/inventory                 - All variants
//! GET    /api/admin/inventory/stats           - Totals and low stock
//! PUT    /api/admin/inventory                 - Set one variant
//! POST   /api/admin/inventory/bulk            - Set many variants
//!
//! # Promo codes
//! GET    /api/admin/promo                     - All codes
//! POST   /api/admin/promo                     - Create a code
//! PATCH  /api/admin/promo/{code}              - Enable or disable
//! DELETE /api/admin/promo/{code}              - Remove a code
//!
//! # Analytics
//! GET    /api/admin/analytics/overview        - Visitors, pages, funnel
//! GET    /api/admin/analytics/locations       - Visitors by city
//! GET    /api/admin/analytics/realtime        - Active visitors
//! GET    /api/admin/analytics/daily           - Per-day counts
//!
//! # Contacts
//! GET    /api/admin/export/contacts           - CSV of every address
//! GET    /api/admin/search                    - Accounts and subscribers
//! GET    /api/admin/contacts/{email}          - Everything about one address
//! DELETE /api/admin/contacts/{email}          - Remove one address (super admin)
//! POST   /api/admin/contacts/bulk-delete      - Remove many addresses (super admin)
//! GET    /api/admin/notes/{email}             - Notes on an address
//! POST   /api/admin/notes/{email}             - Add a note
//! GET    /api/admin/activity                  - Admin activity log
//!
//! # Giveaway
//! POST   /api/admin/giveaway/pick             - Random eligible entrant
//! POST   /api/admin/giveaway/winner           - Record and notify a winner
//! GET    /api/admin/giveaway/winners          - Past winners
//!
//! # Abandoned carts
//! GET    /api/admin/abandoned-carts           - Saved carts
//! POST   /api/admin/abandoned-carts/process   - Send due reminders now
//!
//! # Notifications
//! GET    /api/admin/email-logs                - Send outcomes and totals
//! POST   /api/admin/resend-email/{email}      - Resend welcome, waitlist or receipt
//! POST   /api/admin/email/bulk                - One email to an audience
//! GET    /api/admin/failed-webhooks           - Unresolved deliveries
//! POST   /api/admin/failed-webhooks/{id}/resolve - Close a failure
//! ```
//!
//! Reads need any signed-in admin; changes need a role that can write.

pub mod abandoned_carts;
pub mod analytics;
pub mod auth;
pub mod contacts;
pub mod giveaway;
pub mod inventory;
pub mod notes;
pub mod notifications;
pub mod orders;
pub mod promo;
pub mod stats;
pub mod subscribers;
pub mod users;
pub mod waitlist;

use axum::Router;
use serde::Deserialize;
use serde_json::Value;

use raze_core::Email;

use crate::db::ActivityRepository;
use crate::error::{AppError, Result};
use crate::models::{Action, CurrentAdmin};
use crate::state::AppState;

/// Largest page any list endpoint returns.
pub const MAX_PAGE_SIZE: i64 = 500;

/// `skip`/`limit` query parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

const fn default_limit() -> i64 {
    100
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

impl Pagination {
    /// Offset, never negative.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.skip.max(0)
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

/// Parse an email address from a path or body.
///
/// # Errors
///
/// Returns 400 if the address is invalid.
pub(crate) fn parse_email(input: &str) -> Result<Email> {
    Email::parse(input).map_err(|_| AppError::BadRequest("Invalid email address".to_string()))
}

/// Append to the activity log.
///
/// A failed write is logged and otherwise ignored so it never undoes the
/// action it describes.
pub(crate) async fn record_activity(
    state: &AppState,
    admin: &CurrentAdmin,
    action: Action,
    target: Option<&str>,
    details: Value,
) {
    if let Err(e) = ActivityRepository::new(state.pool())
        .record(&admin.email, action, target, &details)
        .await
    {
        tracing::warn!(error = %e, action = action.as_str(), "Failed to record admin activity");
    }
}

/// Create all routes for admin.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .merge(auth::router())
        .merge(stats::router())
        .merge(users::router())
        .merge(subscribers::router())
        .merge(waitlist::router())
        .merge(orders::router())
        .merge(inventory::router())
        .merge(promo::router())
        .merge(analytics::router())
        .merge(contacts::router())
        .merge(notes::router())
        .merge(notifications::router())
        .merge(giveaway::router())
        .merge(abandoned_carts::router());

    Router::new().nest("/api/admin", api)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps() {
        let page = Pagination {
            skip: -5,
            limit: 10_000,
        };
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), MAX_PAGE_SIZE);

        let page = Pagination { skip: 20, limit: 0 };
        assert_eq!(page.offset(), 20);
        assert_eq!(page.limit(), 1);
    }

    #[test]
    fn test_pagination_defaults() {
        let page: Pagination = serde_json::from_str("{}").unwrap_or_default();
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), 100);
    }
}
