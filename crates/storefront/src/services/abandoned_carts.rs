//! Abandoned-cart reminder runs.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use sqlx::PgPool;
use tracing::instrument;

use raze_core::AbandonedCartId;
use raze_core::abandoned_cart::{ProcessSummary, ReminderStep, due_step};

use crate::db::RepositoryError;
use crate::db::abandoned_carts::AbandonedCartRepository;
use crate::db::failed_webhooks::FailedWebhookRepository;
use crate::services::webhooks::{
    Delivery, SendOptions, WebhookDispatcher, WebhookKind, abandoned_cart_payload,
};

/// Reminders in flight at once.
const REMINDER_CONCURRENCY: usize = 8;

const REMINDER_KEY_PREFIX: &str = "abandoned_cart:";

/// Dedupe key for one reminder of one cart.
#[must_use]
pub fn reminder_key(cart: AbandonedCartId, step: ReminderStep) -> String {
    format!("{REMINDER_KEY_PREFIX}{cart}:{}", step.sequence())
}

/// Send every reminder that is due as of `now`.
///
/// A cart is only marked once its reminder is delivered. A reminder whose
/// last attempt failed is held until that failure is resolved, so one bad
/// hook costs one retry cycle per cart instead of one per run.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if carts cannot be read or updated.
#[instrument(skip(pool, webhooks))]
pub async fn process_abandoned_carts(
    pool: &PgPool,
    webhooks: &WebhookDispatcher,
    now: DateTime<Utc>,
) -> Result<ProcessSummary, RepositoryError> {
    let carts = AbandonedCartRepository::new(pool);
    let held = FailedWebhookRepository::new(pool)
        .open_keys(REMINDER_KEY_PREFIX)
        .await?;
    let mut summary = ProcessSummary::default();

    let mut due = Vec::new();
    for cart in carts.pending_reminders().await? {
        let Some(step) = due_step(cart.reminder_state(), cart.abandoned_at, now) else {
            continue;
        };
        let key = reminder_key(cart.id, step);
        if held.contains(&key) {
            summary.held += 1;
            continue;
        }
        due.push((cart, step, key));
    }

    let carts = &carts;
    let outcomes: Vec<(ReminderStep, Delivery)> = stream::iter(due)
        .map(|(cart, step, key)| async move {
            let payload = abandoned_cart_payload(&cart, step);
            let options = SendOptions {
                dedupe_key: Some(&key),
                ..SendOptions::default()
            };
            let delivery = webhooks
                .send_with(WebhookKind::AbandonedCart(step), &cart.email, &payload, options)
                .await;
            if delivery == Delivery::Sent {
                carts.mark_sent(cart.id, step).await?;
            }
            Ok::<_, RepositoryError>((step, delivery))
        })
        .buffer_unordered(REMINDER_CONCURRENCY)
        .try_collect()
        .await?;

    for (step, delivery) in outcomes {
        match delivery {
            Delivery::Sent => summary.record(step),
            Delivery::Failed => summary.failed += 1,
            Delivery::Skipped => {}
        }
    }

    tracing::info!(?summary, "Abandoned cart run finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reminder_key_names_cart_and_step() {
        assert_eq!(
            reminder_key(AbandonedCartId::new(42), ReminderStep::Second),
            "abandoned_cart:42:2"
        );
    }
}
