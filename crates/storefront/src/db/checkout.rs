//! Pending orders and payment transactions.
//!
//! A paid checkout session turns into exactly one order: the pending row
//! is deleted with `RETURNING` in the same transaction that inserts the
//! order, and `orders.stripe_session_id` is unique. Everything the sale
//! changes (stock, code usage, open carts) commits with the order or not
//! at all.

use sqlx::PgPool;

use raze_core::{Money, OrderStatus, PaymentStatus, UserId};

use super::abandoned_carts::mark_recovered_on;
use super::inventory::deduct_stock;
use super::promo::record_use_on;
use super::users::use_first_order_code;
use super::{RepositoryError, orders, to_json};
use crate::models::checkout::{NewPendingOrder, PaymentTransaction, PendingOrder};
use crate::models::inventory::StockRequest;
use crate::models::order::Order;

const PENDING_COLUMNS: &str = "id, stripe_session_id, email, customer_name, items, \
     shipping_address, subtotal, discount, discount_description, promo_code, total, created_at";

const TRANSACTION_COLUMNS: &str = "id, session_id, email, amount, currency, status, \
     provider_status, order_id, metadata, created_at, updated_at";

/// Repository for checkout state.
pub struct CheckoutRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store the order details for a new checkout session along with its
    /// payment transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the session is already recorded.
    pub async fn begin(
        &self,
        pending: &NewPendingOrder<'_>,
        metadata: &serde_json::Value,
    ) -> Result<PendingOrder, RepositoryError> {
        let items = to_json(&pending.items, "order items")?;
        let shipping = to_json(pending.shipping_address, "shipping address")?;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, PendingOrder>(&format!(
            "INSERT INTO pending_orders \
                 (stripe_session_id, email, customer_name, items, shipping_address, subtotal, \
                  discount, discount_description, promo_code, total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {PENDING_COLUMNS}"
        ))
        .bind(pending.stripe_session_id)
        .bind(pending.email)
        .bind(pending.customer_name)
        .bind(items)
        .bind(shipping)
        .bind(pending.subtotal)
        .bind(pending.discount)
        .bind(pending.discount_description)
        .bind(pending.promo_code)
        .bind(pending.total)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::on_unique(e, "Checkout session already recorded"))?;

        sqlx::query(
            "INSERT INTO payment_transactions (session_id, email, amount, metadata) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(pending.stripe_session_id)
        .bind(pending.email)
        .bind(pending.total)
        .bind(metadata)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::on_unique(e, "Checkout session already recorded"))?;

        tx.commit().await?;
        Ok(row)
    }

    /// The payment transaction for a session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn transaction(
        &self,
        session_id: &str,
    ) -> Result<Option<PaymentTransaction>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentTransaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM payment_transactions WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Record the latest payment state reported by the provider.
    ///
    /// Returns `false` if the session is unknown.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_status(
        &self,
        session_id: &str,
        status: PaymentStatus,
        provider_status: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE payment_transactions SET status = $2, provider_status = $3, updated_at = NOW() \
             WHERE session_id = $1",
        )
        .bind(session_id)
        .bind(status)
        .bind(provider_status)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Turn the pending order for a paid session into a confirmed order.
    ///
    /// In the same transaction the sold units leave on-hand stock (holds
    /// are untouched), the promo or first-order code is spent and the
    /// customer's open abandoned carts are closed.
    ///
    /// Returns `None` if there is no pending order left for the session,
    /// which is the case once another request has completed it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an order already exists for
    /// the session.
    pub async fn complete(
        &self,
        session_id: &str,
        order_number: &str,
        user_id: Option<UserId>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some(pending) = sqlx::query_as::<_, PendingOrder>(&format!(
            "DELETE FROM pending_orders WHERE stripe_session_id = $1 RETURNING {PENDING_COLUMNS}"
        ))
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let items = to_json(&pending.items, "order items")?;
        let shipping = to_json(&pending.shipping_address, "shipping address")?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders \
                 (order_number, user_id, email, customer_name, items, subtotal, discount, \
                  discount_description, promo_code, shipping_cost, total, status, \
                  shipping_address, stripe_session_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {}",
            orders::COLUMNS
        ))
        .bind(order_number)
        .bind(user_id)
        .bind(&pending.email)
        .bind(&pending.customer_name)
        .bind(items)
        .bind(pending.subtotal)
        .bind(pending.discount)
        .bind(pending.discount_description.as_deref())
        .bind(pending.promo_code.as_deref())
        .bind(Money::ZERO)
        .bind(pending.total)
        .bind(OrderStatus::Confirmed)
        .bind(shipping)
        .bind(session_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::on_unique(e, "Order already exists for this session"))?;

        sqlx::query(
            "UPDATE payment_transactions SET order_id = $2, status = 'paid', updated_at = NOW() \
             WHERE session_id = $1",
        )
        .bind(session_id)
        .bind(order.id)
        .execute(&mut *tx)
        .await?;

        let stock: Vec<StockRequest> = order.items.iter().map(StockRequest::from).collect();
        deduct_stock(&mut tx, &stock).await?;
        mark_recovered_on(&mut tx, &order.email).await?;

        if let Some(code) = order.promo_code.as_deref() {
            let first_order = match user_id {
                Some(user_id) => use_first_order_code(&mut tx, user_id, code).await?,
                None => false,
            };
            if !first_order {
                record_use_on(&mut tx, code).await?;
            }
        }

        tx.commit().await?;
        Ok(Some(order))
    }
}
