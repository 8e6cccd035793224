//! Notification history, failed deliveries, resends and bulk email.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use raze_core::FailedWebhookId;
use raze_storefront::db::contacts::{Audience, ContactRepository};
use raze_storefront::db::email_logs::{EmailLog, EmailLogRepository, EmailLogSummary, EmailStatus};
use raze_storefront::db::failed_webhooks::{FailedWebhook, FailedWebhookRepository};
use raze_storefront::db::orders::OrderRepository;
use raze_storefront::db::users::UserRepository;
use raze_storefront::db::waitlist::WaitlistRepository;
use raze_storefront::services::webhooks::{
    Delivery, SendOptions, WaitlistNotice, WebhookKind, bulk_email_payload,
    order_confirmation_payload, signup_payload, waitlist_payload,
};

use super::{MAX_PAGE_SIZE, parse_email, record_activity};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::Action;
use crate::state::AppState;

/// Build the notifications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/email-logs", get(email_logs))
        .route("/failed-webhooks", get(failed_webhooks))
        .route("/failed-webhooks/{id}/resolve", post(resolve_webhook))
        .route("/resend-email/{email}", post(resend))
        .route("/email/bulk", post(bulk_email))
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub logs: Vec<EmailLog>,
    pub summary: EmailLogSummary,
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(100).clamp(1, MAX_PAGE_SIZE)
}

/// Notification outcomes, newest first, with totals.
///
/// GET /api/admin/email-logs?status=&limit=
///
/// # Errors
///
/// Returns 400 for an unknown status.
#[instrument(skip(state, _admin))]
async fn email_logs(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<LogQuery>,
) -> Result<Json<LogResponse>> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => Some(
            EmailStatus::parse(value)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown status: {value}")))?,
        ),
    };

    let repo = EmailLogRepository::new(state.shop_pool());
    let logs = repo.list(status, clamp_limit(query.limit)).await?;
    let summary = repo.summary().await?;

    Ok(Json(LogResponse { logs, summary }))
}

#[derive(Debug, Serialize)]
pub struct FailedWebhooksResponse {
    pub webhooks: Vec<FailedWebhook>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

/// Unresolved deliveries, newest first.
///
/// GET /api/admin/failed-webhooks
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state, _admin))]
async fn failed_webhooks(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<LimitQuery>,
) -> Result<Json<FailedWebhooksResponse>> {
    let webhooks = FailedWebhookRepository::new(state.shop_pool())
        .unresolved(clamp_limit(query.limit))
        .await?;

    Ok(Json(FailedWebhooksResponse {
        total: webhooks.len(),
        webhooks,
    }))
}

/// Close a failed delivery. An abandoned-cart reminder held by it becomes
/// due again on the next run.
///
/// POST /api/admin/failed-webhooks/{id}/resolve
///
/// # Errors
///
/// Returns 404 if there is no open failure with this id.
#[instrument(skip(state, admin))]
async fn resolve_webhook(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<FailedWebhookId>,
) -> Result<Json<FailedWebhook>> {
    let resolved = FailedWebhookRepository::new(state.shop_pool())
        .resolve(id)
        .await?;

    record_activity(
        &state,
        &admin,
        Action::WebhookResolved,
        Some(&id.to_string()),
        json!({ "webhook": resolved.webhook_name, "dedupe_key": resolved.dedupe_key }),
    )
    .await;

    Ok(Json(resolved))
}

/// Which notification to send again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResendKind {
    #[default]
    Welcome,
    Waitlist,
    OrderConfirmation,
}

#[derive(Debug, Deserialize)]
pub struct ResendQuery {
    #[serde(default)]
    pub email_type: ResendKind,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub success: bool,
    pub message: String,
}

fn send_response(delivery: Delivery, what: &str) -> SendResponse {
    match delivery {
        Delivery::Sent => SendResponse {
            success: true,
            message: format!("{what} sent"),
        },
        Delivery::Skipped => SendResponse {
            success: false,
            message: format!("{what} skipped (hook not configured or recipient unsubscribed)"),
        },
        Delivery::Failed => SendResponse {
            success: false,
            message: format!("{what} failed; stored for replay"),
        },
    }
}

/// Send a welcome, waitlist or order confirmation email again.
///
/// POST /api/admin/resend-email/{email}?email_type=welcome
///
/// The payload is rebuilt from the account, the latest waitlist entry or
/// the latest order for the address.
///
/// # Errors
///
/// Returns 400 for an invalid address, 404 if there is nothing to resend.
#[instrument(skip(state, admin))]
async fn resend(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(email): Path<String>,
    Query(query): Query<ResendQuery>,
) -> Result<Json<SendResponse>> {
    let email = parse_email(&email)?;
    let pool = state.shop_pool();
    let webhooks = state.webhooks();
    let base = webhooks.asset_base();

    let (kind, payload): (WebhookKind, Value) = match query.email_type {
        ResendKind::Welcome => {
            let user = UserRepository::new(pool)
                .get_by_email(&email)
                .await?
                .ok_or_else(|| AppError::NotFound("No account for this address".to_string()))?;
            let payload = signup_payload(
                base,
                user.email.as_str(),
                &user.name,
                user.first_order_discount_code.as_deref().unwrap_or_default(),
                user.auth_provider.as_str(),
                user.gymnastics_type.as_deref(),
            );
            (WebhookKind::Signup, payload)
        }
        ResendKind::Waitlist => {
            let entry = WaitlistRepository::new(pool)
                .latest_for_email(email.as_str())
                .await?
                .ok_or_else(|| AppError::NotFound("Not on the waitlist".to_string()))?;
            let payload = waitlist_payload(
                base,
                &WaitlistNotice {
                    email: &entry.email,
                    product_name: &entry.product_name,
                    variant: &entry.variant,
                    image: entry.image.as_deref(),
                    sizes: &entry.sizes,
                    access_code: &entry.access_code,
                    is_update: false,
                },
            );
            (WebhookKind::Waitlist, payload)
        }
        ResendKind::OrderConfirmation => {
            let order = OrderRepository::new(pool)
                .for_email(email.as_str(), 1)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| AppError::NotFound("No orders for this address".to_string()))?;
            (
                WebhookKind::OrderConfirmation,
                order_confirmation_payload(&order),
            )
        }
    };

    let options = SendOptions {
        resend: true,
        ..SendOptions::default()
    };
    let delivery = webhooks.send_with(kind, email.as_str(), &payload, options).await;

    record_activity(
        &state,
        &admin,
        Action::EmailResent,
        Some(email.as_str()),
        json!({ "email_type": kind.name(), "delivered": delivery == Delivery::Sent }),
    )
    .await;

    Ok(Json(send_response(delivery, kind.name())))
}

/// Bulk email form.
#[derive(Debug, Deserialize)]
pub struct BulkEmailRequest {
    pub target: Audience,
    pub subject: String,
    pub html_content: String,
}

#[derive(Debug, Serialize)]
pub struct BulkEmailResponse {
    pub success: bool,
    pub message: String,
    pub recipient_count: usize,
}

/// Send one email to an audience of subscribed addresses.
///
/// POST /api/admin/email/bulk
///
/// Only addresses that still accept email are included; the hook gets one
/// payload listing every recipient.
///
/// # Errors
///
/// Returns 400 for an empty subject or body.
#[instrument(skip(state, admin, req), fields(target = req.target.as_str()))]
async fn bulk_email(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(req): Json<BulkEmailRequest>,
) -> Result<Json<BulkEmailResponse>> {
    let subject = req.subject.trim();
    if subject.is_empty() || req.html_content.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Subject and content are required".to_string(),
        ));
    }

    let recipients = ContactRepository::new(state.shop_pool())
        .recipients(req.target)
        .await?;
    if recipients.is_empty() {
        return Ok(Json(BulkEmailResponse {
            success: false,
            message: "No subscribed recipients".to_string(),
            recipient_count: 0,
        }));
    }

    let webhooks = state.webhooks();
    let payload = bulk_email_payload(
        webhooks.asset_base(),
        req.target.as_str(),
        subject,
        &req.html_content,
        &recipients,
    );
    let options = SendOptions {
        unlogged: true,
        ..SendOptions::default()
    };
    let delivery = webhooks
        .send_with(WebhookKind::BulkEmail, req.target.as_str(), &payload, options)
        .await;

    if delivery == Delivery::Sent {
        let logged = EmailLogRepository::new(state.shop_pool())
            .record_many(&recipients, WebhookKind::BulkEmail.name(), EmailStatus::Sent)
            .await;
        if let Err(e) = logged {
            tracing::warn!(error = %e, "Failed to log bulk email recipients");
        }
    }

    tracing::info!(recipients = recipients.len(), ?delivery, "Bulk email");
    record_activity(
        &state,
        &admin,
        Action::BulkEmailSent,
        Some(req.target.as_str()),
        json!({ "subject": subject, "recipients": recipients.len(), "delivered": delivery == Delivery::Sent }),
    )
    .await;

    let response = send_response(delivery, "Bulk email");
    Ok(Json(BulkEmailResponse {
        success: response.success,
        message: response.message,
        recipient_count: recipients.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resend_kind_defaults_to_welcome() {
        let query: ResendQuery = serde_json::from_str("{}").unwrap_or(ResendQuery {
            email_type: ResendKind::Waitlist,
        });
        assert_eq!(query.email_type, ResendKind::Welcome);
    }

    #[test]
    fn test_send_response_messages() {
        assert!(send_response(Delivery::Sent, "signup").success);
        let skipped = send_response(Delivery::Skipped, "signup");
        assert!(!skipped.success);
        assert!(skipped.message.contains("skipped"));
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), 100);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), MAX_PAGE_SIZE);
    }
}
