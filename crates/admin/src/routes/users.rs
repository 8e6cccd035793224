//! Customer accounts.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use raze_core::UserId;
use raze_storefront::db::users::UserRepository;
use raze_storefront::models::user::{User, UserResponse};

use super::{MAX_PAGE_SIZE, record_activity};
use crate::error::Result;
use crate::middleware::{RequireAdminAuth, RequireSuperAdmin};
use crate::models::Action;
use crate::state::AppState;

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(index))
        .route("/users/{id}", delete(destroy))
}

/// `?page=&limit=`, 1-based.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

const fn first_page() -> i64 {
    1
}

const fn default_limit() -> i64 {
    50
}

impl PageQuery {
    /// Page number clamped to at least 1.
    #[must_use]
    pub fn page(&self) -> i64 {
        self.page.max(1)
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

/// An account row for the back office.
#[derive(Debug, Serialize)]
pub struct AdminUserView {
    #[serde(flatten)]
    pub account: UserResponse,
    pub email_subscribed: bool,
}

impl AdminUserView {
    pub(crate) fn new(user: &User, is_staff: bool) -> Self {
        Self {
            account: UserResponse::new(user, is_staff),
            email_subscribed: user.email_subscribed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<AdminUserView>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// Accounts, newest first.
///
/// GET /api/admin/users?page=&limit=
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<PageQuery>,
) -> Result<Json<UsersResponse>> {
    let repo = UserRepository::new(state.shop_pool());
    let users = repo.list(query.offset(), query.limit()).await?;
    let total = repo.count().await?;

    let config = state.config();
    let users = users
        .iter()
        .map(|user| AdminUserView::new(user, config.is_staff_email(user.email.as_str())))
        .collect();

    Ok(Json(UsersResponse {
        users,
        total,
        page: query.page(),
        limit: query.limit(),
    }))
}

/// Delete an account.
///
/// DELETE /api/admin/users/{id}
///
/// # Errors
///
/// Returns 403 unless the caller is a super admin, 404 if the account
/// doesn't exist.
#[instrument(skip(state, admin))]
async fn destroy(
    State(state): State<AppState>,
    RequireSuperAdmin(admin): RequireSuperAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<serde_json::Value>> {
    UserRepository::new(state.shop_pool()).delete(id).await?;

    tracing::info!(user_id = %id, "Account deleted");
    record_activity(
        &state,
        &admin,
        Action::UserDeleted,
        Some(&id.to_string()),
        json!({}),
    )
    .await;

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offsets() {
        let query = PageQuery { page: 3, limit: 25 };
        assert_eq!(query.offset(), 50);

        let query = PageQuery { page: 0, limit: 25 };
        assert_eq!(query.page(), 1);
        assert_eq!(query.offset(), 0);
    }
}
