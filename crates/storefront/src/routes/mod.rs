//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST /api/auth/register                       - Create account (rate limited)
//! POST /api/auth/login                          - Password login (rate limited)
//! POST /api/auth/logout                         - End session
//! GET  /api/auth/me                             - Current account
//! POST /api/auth/complete-profile               - Finish a Google signup
//! POST /api/auth/validate-first-order-discount  - Check personal code
//! POST /api/auth/use-first-order-discount       - Spend personal code
//! GET  /api/auth/credits                        - Credit balance
//! POST /api/auth/credits/redeem                 - Credits for a discount code
//! GET  /api/auth/orders                         - Account order history
//!
//! # Subscriptions
//! POST /api/subscriptions                       - Subscribe
//! POST /api/subscriptions/unsubscribe           - Opt out everywhere
//! GET  /api/subscriptions/check                 - Subscription state
//!
//! # Waitlist
//! POST /api/waitlist/join                       - Join or add sizes
//! GET  /api/waitlist/check                      - Entry for a variant
//! GET  /api/waitlist/status                     - Spots left
//! GET  /api/waitlist/stats                      - Public counter
//! POST /api/waitlist/verify                     - Check an access code
//!
//! # Catalog & Cart
//! GET  /api/products                            - Products with stock
//! GET  /api/products/{id}                       - One product
//! POST /api/cart/quote                          - Price a cart
//! POST /api/cart/abandoned                      - Save a left cart
//! POST /api/cart/recovered                      - Stop reminders
//!
//! # Inventory
//! GET  /api/inventory                           - All variants
//! GET  /api/inventory/product/{id}              - One product by color/size
//! POST /api/inventory/check                     - Can a variant cover a quantity
//! POST /api/inventory/reserve                   - Hold stock (all or nothing)
//! POST /api/inventory/release                   - Release held stock
//! POST /api/inventory/commit                    - Sell held stock
//!
//! # Promo, Orders & Checkout
//! POST /api/promo/validate                      - Check a code
//! POST /api/promo/use                           - Count a use
//! POST /api/orders                              - Place an order
//! GET  /api/orders/track                        - Track by number and email
//! GET  /api/orders/track/{order_number}         - Track by number
//! GET  /api/orders/{order_ref}                  - By id or number
//! POST /api/checkout/session                    - Open a payment page
//! GET  /api/checkout/status/{session_id}        - Poll payment
//! POST /api/checkout/webhook                    - Provider events (not rate limited)
//!
//! # Shipping
//! POST /api/shipping/rates                      - Carrier options to an address
//! GET  /api/shipping/tracking/{carrier}/{number} - Parcel status
//!
//! # Wishlist
//! GET    /api/wishlist                          - Saved products
//! POST   /api/wishlist                          - Save a product
//! DELETE /api/wishlist/{product_id}             - Forget a product
//!
//! # Analytics
//! POST /api/visitors/track                      - Start a visitor session
//! POST /api/visitors/heartbeat                  - Keep it alive
//! POST /api/visitors/pageview                   - Page view
//! POST /api/visitors/event                      - Custom event
//! GET  /api/visitors/live                       - Live visitor count
//! GET  /api/stats                               - Public counters
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod promo;
pub mod shipping;
pub mod stats;
pub mod subscriptions;
pub mod visitors;
pub mod waitlist;
pub mod wishlist;

use axum::{
    Router,
    routing::{delete, get, post},
};

use raze_core::Email;

use crate::error::{AppError, Result};
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Parse a customer-entered email address.
///
/// # Errors
///
/// Returns 400 if the address is invalid.
pub(crate) fn parse_email(input: &str) -> Result<Email> {
    Email::parse(input).map_err(|_| AppError::BadRequest("Invalid email address".to_string()))
}

/// Create the auth routes router.
///
/// Login and registration get the stricter rate limit.
pub fn auth_routes(rate_limit: bool) -> Router<AppState> {
    let mut credentials = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));
    if rate_limit {
        credentials = credentials.layer(auth_rate_limiter());
    }

    Router::new()
        .merge(credentials)
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/complete-profile", post(auth::complete_profile))
        .route(
            "/validate-first-order-discount",
            post(auth::validate_first_order_discount),
        )
        .route(
            "/use-first-order-discount",
            post(auth::use_first_order_discount),
        )
        .route("/credits", get(auth::credits))
        .route("/credits/redeem", post(auth::redeem_credits))
        .route("/orders", get(auth::orders))
}

/// Create the subscription routes router.
pub fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(subscriptions::subscribe))
        .route("/unsubscribe", post(subscriptions::unsubscribe))
        .route("/check", get(subscriptions::check))
}

/// Create the waitlist routes router.
pub fn waitlist_routes() -> Router<AppState> {
    Router::new()
        .route("/join", post(waitlist::join))
        .route("/check", get(waitlist::check))
        .route("/status", get(waitlist::status))
        .route("/stats", get(waitlist::stats))
        .route("/verify", post(waitlist::verify))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/quote", post(cart::quote))
        .route("/abandoned", post(cart::abandoned))
        .route("/recovered", post(cart::recovered))
}

/// Create the inventory routes router.
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(inventory::index))
        .route("/product/{id}", get(inventory::product))
        .route("/check", post(inventory::check))
        .route("/reserve", post(inventory::reserve))
        .route("/release", post(inventory::release))
        .route("/commit", post(inventory::commit))
}

/// Create the promo routes router.
pub fn promo_routes() -> Router<AppState> {
    Router::new()
        .route("/validate", post(promo::validate))
        .route("/use", post(promo::use_code))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create))
        .route("/track", get(orders::track))
        .route("/track/{order_number}", get(orders::track_by_path))
        .route("/{order_ref}", get(orders::show))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/session", post(checkout::create_session))
        .route("/status/{session_id}", get(checkout::status))
}

/// Create the shipping routes router.
pub fn shipping_routes() -> Router<AppState> {
    Router::new()
        .route("/rates", post(shipping::rates))
        .route("/tracking/{carrier}/{tracking_number}", get(shipping::tracking))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::index).post(wishlist::add))
        .route("/{product_id}", delete(wishlist::remove))
}

/// Create the visitor analytics routes router.
pub fn visitor_routes() -> Router<AppState> {
    Router::new()
        .route("/track", post(visitors::track))
        .route("/heartbeat", post(visitors::heartbeat))
        .route("/pageview", post(visitors::pageview))
        .route("/event", post(visitors::event))
        .route("/live", get(visitors::live))
}

/// Create all routes for the storefront.
///
/// Tests drive the router with `rate_limit` off so requests don't share
/// one bucket. The payment webhook is mounted outside the API rate limit.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    let mut api = Router::new()
        .nest("/auth", auth_routes(rate_limit))
        .nest("/subscriptions", subscription_routes())
        .nest("/waitlist", waitlist_routes())
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/inventory", inventory_routes())
        .nest("/promo", promo_routes())
        .nest("/orders", order_routes())
        .nest("/checkout", checkout_routes())
        .nest("/shipping", shipping_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/visitors", visitor_routes())
        .route("/stats", get(stats::index));

    if rate_limit {
        api = api.layer(api_rate_limiter());
    }

    Router::new()
        .route("/api/checkout/webhook", post(checkout::webhook))
        .nest("/api", api)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_email_rejects_garbage() {
        assert!(parse_email("not-an-email").is_err());
        assert_eq!(parse_email(" A@B.co ").map(|e| e.to_string()).ok().as_deref(), Some("a@b.co"));
    }
}
