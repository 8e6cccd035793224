//! Contact export, search and per-address detail.

use std::collections::HashSet;
use std::fmt::Write;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use raze_storefront::db::contacts::{ContactRepository, DeletedContacts};
use raze_storefront::db::orders::OrderRepository;
use raze_storefront::db::subscriptions::SubscriptionRepository;
use raze_storefront::db::users::UserRepository;
use raze_storefront::db::waitlist::WaitlistRepository;
use raze_storefront::models::order::Order;
use raze_storefront::models::subscription::Subscription;

use super::{parse_email, record_activity, users::AdminUserView};
use crate::db::NoteRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, RequireSuperAdmin};
use crate::models::{Action, ContactNote};
use crate::state::AppState;

/// Most rows read from each table for an export.
const EXPORT_LIMIT: i64 = 10_000;
const SEARCH_LIMIT: i64 = 500;
const DETAIL_ORDER_LIMIT: i64 = 100;
/// Most addresses accepted by one bulk delete.
const BULK_DELETE_LIMIT: usize = 1_000;

const CSV_HEADER: &str = "email,name,source,created_at,subscribed";

/// Build the contacts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/export/contacts", get(export))
        .route("/search", get(search))
        .route("/contacts/{email}", get(show).delete(destroy))
        .route("/contacts/bulk-delete", post(bulk_destroy))
}

/// One line of the contacts export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRow {
    pub email: String,
    pub name: Option<String>,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub subscribed: bool,
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
///
/// Cells a spreadsheet would evaluate as a formula get a leading `'`.
fn csv_field(value: &str) -> String {
    let value = if value.starts_with(['=', '+', '-', '@', '\t', '\r']) {
        format!("'{value}")
    } else {
        value.to_string()
    };
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}

/// Render rows as CSV, keeping the first row for each (email, source).
#[must_use]
pub fn contacts_csv(rows: &[ContactRow]) -> String {
    let mut seen = HashSet::new();
    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');

    for row in rows {
        if !seen.insert((row.email.to_lowercase(), row.source.as_str())) {
            continue;
        }
        let _ = writeln!(
            csv,
            "{},{},{},{},{}",
            csv_field(&row.email),
            csv_field(row.name.as_deref().unwrap_or("")),
            csv_field(&row.source),
            row.created_at.to_rfc3339(),
            row.subscribed
        );
    }
    csv
}

/// A search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub email: String,
    pub name: Option<String>,
    pub discipline: Option<String>,
    /// `user` or `subscriber`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub source: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total: usize,
}

/// Everything stored about one address.
#[derive(Debug, Serialize)]
pub struct ContactDetail {
    pub email: String,
    pub user: Option<AdminUserView>,
    pub subscriptions: Vec<Subscription>,
    pub orders: Vec<Order>,
    pub notes: Vec<ContactNote>,
}

/// Accounts, subscriptions and waitlist entries as one CSV.
///
/// GET /api/admin/export/contacts
///
/// # Errors
///
/// Returns 500 if a query fails.
#[instrument(skip(state, admin))]
async fn export(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Result<impl IntoResponse> {
    let pool = state.shop_pool();
    let users = UserRepository::new(pool).list(0, EXPORT_LIMIT).await?;
    let subscriptions = SubscriptionRepository::new(pool)
        .list(None, 0, EXPORT_LIMIT)
        .await?;
    let waitlist = WaitlistRepository::new(pool).list(0, EXPORT_LIMIT).await?;

    let mut rows = Vec::with_capacity(users.len() + subscriptions.len() + waitlist.len());
    rows.extend(users.into_iter().map(|u| ContactRow {
        email: u.email.to_string(),
        name: Some(u.name),
        source: "account".to_string(),
        created_at: u.created_at,
        subscribed: u.email_subscribed,
    }));
    rows.extend(subscriptions.into_iter().map(|s| ContactRow {
        email: s.email,
        name: s.name,
        source: s.source.as_str().to_string(),
        created_at: s.created_at,
        subscribed: s.email_subscribed,
    }));
    rows.extend(waitlist.into_iter().map(|w| ContactRow {
        email: w.email,
        name: w.name,
        source: "waitlist".to_string(),
        created_at: w.created_at,
        subscribed: w.email_subscribed,
    }));

    let csv = contacts_csv(&rows);
    record_activity(
        &state,
        &admin,
        Action::ContactsExported,
        None,
        json!({ "rows": csv.lines().count().saturating_sub(1) }),
    )
    .await;

    Ok((
        StatusCode::OK,
        [
            ("Content-Type", "text/csv"),
            (
                "Content-Disposition",
                "attachment; filename=\"raze_contacts.csv\"",
            ),
        ],
        csv,
    ))
}

/// Accounts and subscribers matching an email or name fragment.
///
/// GET /api/admin/search?q=
///
/// Accounts come first; a subscriber whose address already matched as an
/// account is left out.
///
/// # Errors
///
/// Returns 500 if a query fails.
#[instrument(skip(state, _admin, query))]
async fn search(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let pool = state.shop_pool();
    let users = UserRepository::new(pool).search(&query.q, SEARCH_LIMIT).await?;
    let subscriptions = SubscriptionRepository::new(pool)
        .search(&query.q, SEARCH_LIMIT)
        .await?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut results = Vec::new();
    for user in users {
        seen.insert(user.email.to_string());
        results.push(SearchResult {
            email: user.email.to_string(),
            name: Some(user.name),
            discipline: user.gymnastics_type,
            kind: "user",
            source: user.auth_provider.as_str().to_string(),
            date: user.created_at,
        });
    }
    for sub in subscriptions {
        if !seen.insert(sub.email.to_lowercase()) {
            continue;
        }
        results.push(SearchResult {
            email: sub.email,
            name: sub.name,
            discipline: None,
            kind: "subscriber",
            source: sub.source.as_str().to_string(),
            date: sub.created_at,
        });
    }

    Ok(Json(SearchResponse {
        total: results.len(),
        results,
    }))
}

/// Account, subscriptions, orders and notes for one address.
///
/// GET /api/admin/contacts/{email}
///
/// # Errors
///
/// Returns 400 for an invalid address.
#[instrument(skip(state, _admin))]
async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(email): Path<String>,
) -> Result<Json<ContactDetail>> {
    let email = parse_email(&email)?;
    let pool = state.shop_pool();

    let user = UserRepository::new(pool)
        .get_by_email(&email)
        .await?
        .map(|u| AdminUserView::new(&u, state.config().is_staff_email(email.as_str())));
    let subscriptions = SubscriptionRepository::new(pool).for_email(&email).await?;
    let orders = OrderRepository::new(pool)
        .for_email(email.as_str(), DETAIL_ORDER_LIMIT)
        .await?;
    let notes = NoteRepository::new(state.pool()).for_email(&email).await?;

    Ok(Json(ContactDetail {
        email: email.to_string(),
        user,
        subscriptions,
        orders,
        notes,
    }))
}

/// Remove everything stored for one address.
///
/// DELETE /api/admin/contacts/{email}
///
/// # Errors
///
/// Returns 400 for an invalid address, 404 if nothing matched.
#[instrument(skip(state, admin))]
async fn destroy(
    State(state): State<AppState>,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Path(email): Path<String>,
) -> Result<Json<DeletedContacts>> {
    let email = parse_email(&email)?;
    let deleted = ContactRepository::new(state.shop_pool())
        .delete(&[email.to_string()])
        .await?;
    if deleted.total() == 0 {
        return Err(AppError::NotFound("No contact with this address".to_string()));
    }

    tracing::info!(total = deleted.total(), "Contact deleted");
    record_activity(
        &state,
        &admin,
        Action::ContactsDeleted,
        Some(email.as_str()),
        json!({ "deleted": deleted }),
    )
    .await;

    Ok(Json(deleted))
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub emails: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub success: bool,
    pub requested: usize,
    pub deleted: DeletedContacts,
}

/// Valid, distinct, lowercased addresses from a bulk delete form.
///
/// # Errors
///
/// Returns 400 for an empty or oversized list or any invalid address.
fn bulk_targets(emails: &[String]) -> Result<Vec<String>> {
    if emails.is_empty() || emails.len() > BULK_DELETE_LIMIT {
        return Err(AppError::BadRequest(format!(
            "Provide between 1 and {BULK_DELETE_LIMIT} addresses"
        )));
    }
    let mut seen = HashSet::new();
    let mut targets = Vec::with_capacity(emails.len());
    for email in emails {
        let email = parse_email(email)?.as_str().to_lowercase();
        if seen.insert(email.clone()) {
            targets.push(email);
        }
    }
    Ok(targets)
}

/// Remove accounts, subscriptions and waitlist entries for many addresses.
///
/// POST /api/admin/contacts/bulk-delete
///
/// # Errors
///
/// Returns 400 for an empty list or an invalid address.
#[instrument(skip(state, admin, req), fields(count = req.emails.len()))]
async fn bulk_destroy(
    State(state): State<AppState>,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Json(req): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>> {
    let targets = bulk_targets(&req.emails)?;
    let deleted = ContactRepository::new(state.shop_pool())
        .delete(&targets)
        .await?;

    tracing::info!(requested = targets.len(), total = deleted.total(), "Contacts deleted");
    record_activity(
        &state,
        &admin,
        Action::ContactsDeleted,
        None,
        json!({ "emails": targets, "deleted": deleted }),
    )
    .await;

    Ok(Json(BulkDeleteResponse {
        success: true,
        requested: targets.len(),
        deleted,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn row(email: &str, name: Option<&str>, source: &str) -> ContactRow {
        ContactRow {
            email: email.to_string(),
            name: name.map(String::from),
            source: source.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
            subscribed: true,
        }
    }

    #[test]
    fn test_csv_header_and_row() {
        let csv = contacts_csv(&[row("a@b.co", Some("Ana"), "account")]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        assert_eq!(
            lines.next(),
            Some("a@b.co,Ana,account,2025-01-02T03:04:05+00:00,true")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_csv_one_row_per_email_and_source() {
        let csv = contacts_csv(&[
            row("a@b.co", None, "early_access"),
            row("A@B.co", None, "early_access"),
            row("a@b.co", None, "waitlist"),
        ]);
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_csv_quotes_awkward_names() {
        let csv = contacts_csv(&[row("a@b.co", Some("Smith, \"Jo\""), "account")]);
        assert!(csv.contains("\"Smith, \"\"Jo\"\"\""));
    }

    #[test]
    fn test_csv_neutralizes_formula_cells() {
        let csv = contacts_csv(&[
            row("a@b.co", Some("=HYPERLINK(\"http://x\")"), "account"),
            row("c@d.co", Some("+1 555"), "account"),
            row("e@f.co", Some("-2"), "account"),
            row("g@h.co", Some("@SUM(A1)"), "account"),
        ]);
        let names: Vec<_> = csv.lines().skip(1).map(|l| l.split(',').nth(1).unwrap()).collect();
        assert_eq!(names[0], "\"'=HYPERLINK(\"\"http://x\"\")\"");
        assert_eq!(names[1], "'+1 555");
        assert_eq!(names[2], "'-2");
        assert_eq!(names[3], "'@SUM(A1)");
    }

    #[test]
    fn test_csv_leaves_plain_names_alone() {
        assert_eq!(csv_field("Ana-Maria"), "Ana-Maria");
        assert_eq!(csv_field("a+tag@b.co"), "a+tag@b.co");
    }

    #[test]
    fn test_bulk_targets_dedupes_case_insensitively() {
        let emails = vec!["Ana@Example.com".to_string(), "ana@example.com".to_string()];
        assert_eq!(bulk_targets(&emails).unwrap(), vec!["ana@example.com"]);
    }

    #[test]
    fn test_bulk_targets_rejects_bad_lists() {
        assert!(bulk_targets(&[]).is_err());
        assert!(bulk_targets(&["not-an-email".to_string()]).is_err());
        let too_many = vec!["a@b.co".to_string(); BULK_DELETE_LIMIT + 1];
        assert!(bulk_targets(&too_many).is_err());
    }
}
