//! Storefront router tests that never reach the database.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};
use tower::ServiceExt;

use raze_integration_tests::{
    empty_request, json_body, json_request, lazy_pool, storefront_app, storefront_app_over,
};

fn tee(quantity: u32) -> Value {
    json!({
        "product_id": 1,
        "name": "Performance T-Shirt",
        "color": "Black",
        "size": "M",
        "unit_price": "55.00",
        "quantity": quantity,
    })
}

#[tokio::test]
async fn test_quote_rejects_empty_cart() {
    let response = storefront_app()
        .oneshot(json_request("POST", "/api/cart/quote", &json!({ "items": [] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["detail"].is_string());
}

#[tokio::test]
async fn test_quote_rejects_zero_quantity() {
    let response = storefront_app()
        .oneshot(json_request("POST", "/api/cart/quote", &json!({ "items": [tee(0)] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quote_credits_need_a_session() {
    let response = storefront_app()
        .oneshot(json_request(
            "POST",
            "/api/cart/quote",
            &json!({ "items": [tee(1)], "credits_to_use": 100 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_quote_rejects_unknown_credit_tier() {
    let response = storefront_app()
        .oneshot(json_request(
            "POST",
            "/api/cart/quote",
            &json!({ "items": [tee(1)], "credits_to_use": 150 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_unavailable_without_payments() {
    let response = storefront_app()
        .oneshot(json_request(
            "POST",
            "/api/checkout/session",
            &json!({
                "items": [tee(1)],
                "shipping": {
                    "first_name": "Dana",
                    "last_name": "Reyes",
                    "email": "dana@example.com",
                    "address_line1": "1 Vault Way",
                    "city": "Austin",
                    "state": "TX",
                    "postal_code": "78701",
                    "country": "US",
                },
                "origin_url": "http://localhost:3000",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        json_body(response).await["detail"],
        "Payments are not configured"
    );
}

#[tokio::test]
async fn test_me_requires_session() {
    let response = storefront_app()
        .oneshot(empty_request("GET", "/api/auth/me"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wishlist_requires_session() {
    let response = storefront_app()
        .oneshot(empty_request("GET", "/api/wishlist"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = storefront_app()
        .oneshot(json_request("POST", "/api/wishlist", &json!({ "product_id": 1 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_shipping_unavailable_without_provider() {
    let response = storefront_app()
        .oneshot(empty_request("GET", "/api/shipping/tracking/usps/9400100000000000000000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["detail"], "Shipping is not configured");

    let address = json!({
        "first_name": "Ana",
        "last_name": "Lima",
        "email": "ana@example.com",
        "address_line1": "1 Beam Way",
        "city": "Austin",
        "state": "TX",
        "postal_code": "78701",
    });
    let response = storefront_app()
        .oneshot(json_request("POST", "/api/shipping/rates", &json!({ "address_to": address })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = storefront_app()
        .oneshot(empty_request("GET", "/api/nope"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn from_client(mut request: axum::http::Request<axum::body::Body>) -> axum::http::Request<axum::body::Body> {
    request
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.7".parse().unwrap());
    request
}

#[tokio::test]
async fn test_payment_webhook_skips_the_api_rate_limit() {
    let app = storefront_app_over(lazy_pool(), true);

    for _ in 0..60 {
        let response = app
            .clone()
            .oneshot(from_client(json_request("POST", "/api/checkout/webhook", &json!({}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

#[tokio::test]
async fn test_api_rate_limit_still_applies_to_shoppers() {
    let app = storefront_app_over(lazy_pool(), true);
    let mut statuses = Vec::new();

    for _ in 0..60 {
        let response = app
            .clone()
            .oneshot(from_client(json_request(
                "POST",
                "/api/waitlist/join",
                &json!({ "email": "nope", "product_id": 1, "product_name": "Tee", "variant": "Black", "sizes": "M" }),
            )))
            .await
            .unwrap();
        statuses.push(response.status());
    }

    assert_eq!(statuses[0], StatusCode::BAD_REQUEST);
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
}
