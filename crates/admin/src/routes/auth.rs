//! Authentication route handlers for admin.
//!
//! Email and password sign-in; the session cookie carries the rest.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use super::record_activity;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAdminAuth, clear_current_admin, set_current_admin};
use crate::models::{Action, CurrentAdmin};
use crate::services::{AdminAuthError, AdminAuthService};
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// Sign-in form.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Signed-in admin.
#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub success: bool,
    pub admin: CurrentAdmin,
}

/// Sign in.
///
/// POST /api/admin/login
///
/// # Errors
///
/// Returns 401 for a wrong password, unknown account or an address outside
/// the allowlist.
#[instrument(skip(state, session, req))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AdminResponse>> {
    if !state.config().is_allowed_email(&req.email) {
        tracing::warn!("Sign-in attempt from an address outside the allowlist");
        return Err(AdminAuthError::NotAllowed.into());
    }

    let user = AdminAuthService::new(state.pool())
        .login(&req.email, &req.password)
        .await?;
    let admin = CurrentAdmin::from(&user);

    // New session id on privilege change
    session.cycle_id().await?;
    set_current_admin(&session, &admin).await?;
    set_sentry_user(admin.id.as_i32(), Some(admin.email.as_str()));

    record_activity(&state, &admin, Action::Login, None, json!({})).await;

    Ok(Json(AdminResponse {
        success: true,
        admin,
    }))
}

/// End the session.
///
/// POST /api/admin/logout
///
/// # Errors
///
/// Returns 500 if the session store fails.
#[instrument(skip(state, session, admin))]
async fn logout(
    State(state): State<AppState>,
    session: Session,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Result<Json<serde_json::Value>> {
    record_activity(&state, &admin, Action::Logout, None, json!({})).await;
    clear_current_admin(&session).await?;
    clear_sentry_user();

    Ok(Json(json!({ "success": true })))
}

/// The signed-in admin.
///
/// GET /api/admin/me
#[instrument(skip(admin))]
async fn me(RequireAdminAuth(admin): RequireAdminAuth) -> Json<AdminResponse> {
    Json(AdminResponse {
        success: true,
        admin,
    })
}
