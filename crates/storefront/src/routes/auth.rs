//! Customer account endpoints.
//!
//! ```text
//! POST /api/auth/register                        - Create account, start session
//! POST /api/auth/login                           - Password login
//! POST /api/auth/logout                          - End session
//! GET  /api/auth/me                              - Current account
//! POST /api/auth/complete-profile                - Set discipline (Google signups)
//! POST /api/auth/validate-first-order-discount   - Check personal 10% code
//! POST /api/auth/use-first-order-discount        - Mark personal code used
//! GET  /api/auth/credits                         - Credit balance and tiers
//! POST /api/auth/credits/redeem                  - Exchange credits for a code
//! GET  /api/auth/orders                          - Orders placed with the account email
//! ```

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use raze_core::AuthProvider;
use raze_core::credits::{
    CreditTier, FIRST_ORDER_PERCENT, NextTier, REDEMPTION_VALID_DAYS, available_tiers,
    first_order_code_matches, next_tier, redemption_code, tier_for,
};

use crate::db::orders::OrderRepository;
use crate::db::promo::PromoRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_session_cookie, session_cookie};
use crate::models::order::Order;
use crate::models::session::Session;
use crate::models::user::{User, UserResponse};
use crate::services::auth::{AuthService, Registration};
use crate::services::webhooks::{WebhookKind, signup_payload};
use crate::state::AppState;

/// Orders shown in the account history.
const ACCOUNT_ORDER_LIMIT: i64 = 100;

/// Response body for register and login.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub token: String,
    pub user: UserResponse,
}

/// Build a session response with the cookie attached.
fn session_response(state: &AppState, user: &User, session: &Session) -> Response {
    let body = Json(SessionResponse {
        success: true,
        token: session.token.clone(),
        user: UserResponse::new(user, state.config().is_admin_email(user.email.as_str())),
    });

    let mut headers = HeaderMap::new();
    if let Some(cookie) = session_cookie(&session.token, state.config().secure_cookies()) {
        headers.insert(SET_COOKIE, cookie);
    }

    (headers, body).into_response()
}

async fn load_user(state: &AppState, user_id: raze_core::UserId) -> Result<User> {
    UserRepository::new(state.pool())
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

// =============================================================================
// Registration & Login
// =============================================================================

/// Signup form.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub gymnastics_type: Option<String>,
    pub gender: Option<String>,
    pub age: Option<i32>,
}

/// Create an account with email and password.
///
/// POST /api/auth/register
///
/// # Errors
///
/// Returns 400 for an invalid email, a short password or a duplicate account.
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    let (user, session) = AuthService::new(state.pool())
        .register(&Registration {
            email: &req.email,
            password: &req.password,
            name: &req.name,
            gymnastics_type: req.gymnastics_type.as_deref(),
            gender: req.gender.as_deref(),
            age: req.age,
        })
        .await?;

    tracing::info!(user_id = %user.id, "Account registered");
    add_breadcrumb("auth", "Account registered", None);

    let webhooks = state.webhooks();
    webhooks.spawn(
        WebhookKind::Signup,
        user.email.to_string(),
        signup_payload(
            webhooks.asset_base(),
            user.email.as_str(),
            &user.name,
            user.first_order_discount_code.as_deref().unwrap_or_default(),
            "email",
            user.gymnastics_type.as_deref(),
        ),
    );

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(session_response(&state, &user, &session))
}

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Password login.
///
/// POST /api/auth/login
///
/// # Errors
///
/// Returns 401 for bad credentials and 400 for Google-only accounts.
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response> {
    let (user, session) = AuthService::new(state.pool())
        .login(&req.email, &req.password)
        .await?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(session_response(&state, &user, &session))
}

/// End the current session.
///
/// POST /api/auth/logout
///
/// # Errors
///
/// Returns 500 if the session cannot be deleted.
#[instrument(skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    AuthService::new(state.pool()).logout(&user.token).await?;
    clear_sentry_user();

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, clear_session_cookie());
    Ok((headers, Json(json!({ "success": true }))).into_response())
}

/// The signed-in account.
///
/// GET /api/auth/me
///
/// # Errors
///
/// Returns 401 without a valid session.
#[instrument(skip(state, current))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<UserResponse>> {
    let user = load_user(&state, current.id).await?;
    Ok(Json(UserResponse::new(
        &user,
        state.config().is_admin_email(user.email.as_str()),
    )))
}

/// Discipline chosen after a Google signup.
#[derive(Debug, Deserialize)]
pub struct CompleteProfileRequest {
    pub gymnastics_type: Option<String>,
}

/// Finish an account created through Google sign-in.
///
/// POST /api/auth/complete-profile
///
/// The signup notification for Google accounts is sent here, once the
/// discipline is known.
///
/// # Errors
///
/// Returns 400 when no discipline is given.
#[instrument(skip(state, current, req))]
pub async fn complete_profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(req): Json<CompleteProfileRequest>,
) -> Result<Json<serde_json::Value>> {
    let gymnastics_type = req
        .gymnastics_type
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .ok_or_else(|| AppError::BadRequest("gymnastics_type is required".to_string()))?;

    let before = load_user(&state, current.id).await?;
    let user = UserRepository::new(state.pool())
        .complete_profile(current.id, gymnastics_type)
        .await?;

    if before.needs_profile_completion && user.auth_provider == AuthProvider::Google {
        let webhooks = state.webhooks();
        webhooks.spawn(
            WebhookKind::Signup,
            user.email.to_string(),
            signup_payload(
                webhooks.asset_base(),
                user.email.as_str(),
                &user.name,
                user.first_order_discount_code.as_deref().unwrap_or_default(),
                "google",
                user.gymnastics_type.as_deref(),
            ),
        );
    }

    Ok(Json(json!({
        "success": true,
        "user": UserResponse::new(&user, state.config().is_admin_email(user.email.as_str())),
    })))
}

// =============================================================================
// First-Order Discount
// =============================================================================

/// Code entered at checkout.
#[derive(Debug, Deserialize)]
pub struct DiscountCodeRequest {
    pub code: String,
}

/// Check a personal first-order code.
///
/// POST /api/auth/validate-first-order-discount
///
/// # Errors
///
/// Returns 400 if the code was used or doesn't belong to the account.
#[instrument(skip(state, current, req))]
pub async fn validate_first_order_discount(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(req): Json<DiscountCodeRequest>,
) -> Result<Json<serde_json::Value>> {
    let user = load_user(&state, current.id).await?;

    if user.has_used_first_order_discount {
        return Err(AppError::BadRequest(
            "You have already used your first order discount".to_string(),
        ));
    }

    let issued = user.first_order_discount_code.as_deref().unwrap_or_default();
    if issued.is_empty() || !first_order_code_matches(issued, &req.code) {
        return Err(AppError::BadRequest(
            "Invalid discount code for this account".to_string(),
        ));
    }

    Ok(Json(json!({
        "valid": true,
        "discount_type": "percentage",
        "discount_value": FIRST_ORDER_PERCENT,
        "message": format!("{FIRST_ORDER_PERCENT}% first order discount applied!"),
    })))
}

/// Mark the first-order code as used.
///
/// POST /api/auth/use-first-order-discount
///
/// # Errors
///
/// Returns 400 if it was already used.
#[instrument(skip(state, current))]
pub async fn use_first_order_discount(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<serde_json::Value>> {
    let used = UserRepository::new(state.pool())
        .use_first_order_discount(current.id)
        .await?;

    if !used {
        return Err(AppError::BadRequest(
            "You have already used your first order discount".to_string(),
        ));
    }

    Ok(Json(json!({ "success": true })))
}

// =============================================================================
// Credits
// =============================================================================

/// Credit balance and what it can buy.
#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    pub current_credits: i32,
    pub total_earned: i32,
    pub total_redeemed: i32,
    pub available_tiers: Vec<CreditTier>,
    pub next_tier: Option<NextTier>,
}

/// Credit balance.
///
/// GET /api/auth/credits
///
/// # Errors
///
/// Returns 401 without a valid session.
#[instrument(skip(state, current))]
pub async fn credits(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<CreditsResponse>> {
    let user = load_user(&state, current.id).await?;
    Ok(Json(CreditsResponse {
        current_credits: user.raze_credits,
        total_earned: user.total_credits_earned,
        total_redeemed: user.total_credits_redeemed,
        available_tiers: available_tiers(user.raze_credits),
        next_tier: next_tier(user.raze_credits),
    }))
}

/// Tier to redeem.
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    #[serde(alias = "tier_credits")]
    pub credits: i32,
}

/// Exchange credits for a single-use discount code.
///
/// POST /api/auth/credits/redeem
///
/// Credits are taken first; if the code cannot be stored they are refunded.
///
/// # Errors
///
/// Returns 400 for an unknown tier or an insufficient balance.
#[instrument(skip(state, current))]
pub async fn redeem_credits(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(req): Json<RedeemRequest>,
) -> Result<Json<serde_json::Value>> {
    let tier = tier_for(req.credits)
        .ok_or_else(|| AppError::BadRequest("Invalid redemption tier".to_string()))?;

    let users = UserRepository::new(state.pool());
    let Some(remaining) = users.spend_credits(current.id, tier.credits).await? else {
        let user = load_user(&state, current.id).await?;
        return Err(AppError::BadRequest(format!(
            "Insufficient credits. You have {}, need {}",
            user.raze_credits, tier.credits
        )));
    };

    let rule = redemption_code(tier, Utc::now());
    if let Err(e) = PromoRepository::new(state.pool()).create(&rule).await {
        users.refund_credits(current.id, tier.credits).await?;
        return Err(e.into());
    }

    tracing::info!(code = %rule.code, "Credits redeemed");

    Ok(Json(json!({
        "success": true,
        "discount_code": rule.code,
        "discount_amount": tier.discount,
        "remaining_credits": remaining,
        "expires_in_days": REDEMPTION_VALID_DAYS,
        "message": format!("Redeemed {} credits for {}", tier.credits, tier.label()),
    })))
}

/// Orders placed with the account email.
///
/// GET /api/auth/orders
///
/// # Errors
///
/// Returns 401 without a valid session.
#[instrument(skip(state, current))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .for_email(current.email.as_str(), ACCOUNT_ORDER_LIMIT)
        .await?;
    Ok(Json(orders))
}
