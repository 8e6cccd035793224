//! Admin router tests that never reach the database.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use raze_integration_tests::{admin_app, empty_request, json_body, json_request};

#[tokio::test]
async fn test_reads_need_a_session() {
    for uri in [
        "/api/admin/stats",
        "/api/admin/users",
        "/api/admin/orders",
        "/api/admin/inventory",
        "/api/admin/analytics/overview",
        "/api/admin/export/contacts",
        "/api/admin/activity",
        "/api/admin/email-logs",
        "/api/admin/failed-webhooks",
        "/api/admin/me",
    ] {
        let response = admin_app(&[]).oneshot(empty_request("GET", uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(json_body(response).await["detail"], "Not authenticated", "{uri}");
    }
}

#[tokio::test]
async fn test_writes_need_a_session() {
    let response = admin_app(&[])
        .oneshot(json_request(
            "PUT",
            "/api/admin/inventory",
            &json!({ "product_id": 1, "color": "Black", "size": "M", "quantity": 10 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = admin_app(&[])
        .oneshot(empty_request("POST", "/api/admin/giveaway/pick"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_notification_and_contact_writes_need_a_session() {
    let writes = [
        (
            "POST",
            "/api/admin/email/bulk",
            json!({ "target": "subscribers", "subject": "Drop", "html_content": "<p>Hi</p>" }),
        ),
        ("POST", "/api/admin/resend-email/ana@example.com", json!({})),
        ("POST", "/api/admin/failed-webhooks/1/resolve", json!({})),
        (
            "POST",
            "/api/admin/contacts/bulk-delete",
            json!({ "emails": ["ana@example.com"] }),
        ),
        ("DELETE", "/api/admin/contacts/ana@example.com", json!({})),
        ("POST", "/api/admin/orders/1/label", json!({ "rate_id": "rate_123" })),
    ];

    for (method, uri, body) in writes {
        let response = admin_app(&[])
            .oneshot(json_request(method, uri, &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_login_outside_allowlist_is_rejected() {
    let response = admin_app(&["coach@razetraining.com"])
        .oneshot(json_request(
            "POST",
            "/api/admin/login",
            &json!({ "email": "intruder@example.com", "password": "whatever-password" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await["detail"],
        "Invalid email or password"
    );
}

#[tokio::test]
async fn test_login_requires_json_body() {
    let response = admin_app(&[])
        .oneshot(empty_request("POST", "/api/admin/login"))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}
