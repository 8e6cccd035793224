//! Live tests against a running storefront.
//!
//! These tests require:
//! - A migrated and seeded `PostgreSQL` database (raze-cli migrate all, seed all)
//! - The storefront running (cargo run -p raze-storefront)
//!
//! Run with: cargo test -p raze-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::StatusCode;
use serde_json::{Value, json};

use raze_core::Money;
use raze_integration_tests::{cookie_client, storefront_base_url, unique_email};

async fn post(client: &reqwest::Client, path: &str, body: &Value) -> (StatusCode, Value) {
    let resp = client
        .post(format!("{}{path}", storefront_base_url()))
        .json(body)
        .send()
        .await
        .expect("request failed");
    let status = resp.status();
    (status, resp.json().await.unwrap_or(Value::Null))
}

async fn get(client: &reqwest::Client, path: &str) -> (StatusCode, Value) {
    let resp = client
        .get(format!("{}{path}", storefront_base_url()))
        .send()
        .await
        .expect("request failed");
    let status = resp.status();
    (status, resp.json().await.unwrap_or(Value::Null))
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_register_then_me() {
    let client = cookie_client();
    let email = unique_email("register");

    let (status, body) = post(
        &client,
        "/api/auth/register",
        &json!({
            "email": email,
            "password": "vault-and-beam-42",
            "name": "Test Gymnast",
            "gymnastics_type": "artistic",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert!(body["token"].is_string());
    let code = body["user"]["first_order_discount_code"].as_str().unwrap();
    assert!(code.starts_with("WELCOME"));

    // Session cookie carries over.
    let (status, me) = get(&client, "/api/auth/me").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], email.as_str());
    assert_eq!(me["raze_credits"], 0);

    // Same address again is a conflict.
    let (status, _) = post(
        &client,
        "/api/auth/register",
        &json!({ "email": email, "password": "vault-and-beam-42", "name": "Again" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_login_wrong_password() {
    let client = cookie_client();
    let email = unique_email("login");

    let (status, _) = post(
        &client,
        "/api/auth/register",
        &json!({ "email": email, "password": "vault-and-beam-42", "name": "Test" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &reqwest::Client::new(),
        "/api/auth/login",
        &json!({ "email": email, "password": "not-the-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Subscriptions & Waitlist
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_subscribe_is_idempotent() {
    let client = reqwest::Client::new();
    let email = unique_email("giveaway");
    let body = json!({ "email": email, "source": "giveaway_popup" });

    let (status, first) = post(&client, "/api/subscriptions", &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["already_subscribed"], false);
    assert!(first["entry_id"].is_string());

    let (status, second) = post(&client, "/api/subscriptions", &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["already_subscribed"], true);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_waitlist_join_merges_sizes() {
    let client = reqwest::Client::new();
    let email = unique_email("waitlist");
    let join = |sizes: Value, force_add: bool| {
        json!({
            "email": email,
            "product_id": 1,
            "product_name": "Performance T-Shirt",
            "variant": "Black",
            "sizes": sizes,
            "force_add": force_add,
        })
    };

    let (status, first) = post(&client, "/api/waitlist/join", &join(json!("M"), false)).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["is_update"], false);

    let (status, second) = post(
        &client,
        "/api/waitlist/join",
        &join(json!([{ "size": "L", "quantity": 2 }]), true),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["is_update"], true);

    let (status, check) = get(
        &client,
        &format!("/api/waitlist/check?email={email}&product_id=1&variant=Black"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["on_waitlist"], true);
}

// ============================================================================
// Cart & Promo
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront and seeded promo codes"]
async fn test_quote_with_seeded_code() {
    let client = reqwest::Client::new();
    let (status, body) = post(
        &client,
        "/api/cart/quote",
        &json!({
            "items": [{
                "product_id": 1, "name": "Performance T-Shirt", "color": "Black",
                "size": "M", "unit_price": "55.00", "quantity": 2,
            }],
            "promo_code": "welcome10",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["promo_code"], "WELCOME10");
    let total: Money = serde_json::from_value(body["total"].clone()).unwrap();
    assert_eq!(total, Money::from_dollars(99));
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_unknown_promo_code() {
    let (status, _) = post(
        &reqwest::Client::new(),
        "/api/promo/validate",
        &json!({ "code": "NOPE-NOT-REAL", "subtotal": "50.00" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded inventory"]
async fn test_products_list_stock() {
    let (status, body) = get(&reqwest::Client::new(), "/api/products").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_array() || body["products"].is_array());
}
