//! Live tests against a running admin API.
//!
//! These tests require:
//! - A migrated admin database with an account created by
//!   `raze-cli admin create`
//! - The admin server running (cargo run -p raze-admin)
//! - `ADMIN_TEST_EMAIL` and `ADMIN_TEST_PASSWORD` for that account
//!
//! Run with: cargo test -p raze-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use raze_integration_tests::{admin_base_url, cookie_client};

/// Sign in and return a client holding the session cookie.
async fn signed_in_client() -> Client {
    let email = std::env::var("ADMIN_TEST_EMAIL").expect("ADMIN_TEST_EMAIL not set");
    let password = std::env::var("ADMIN_TEST_PASSWORD").expect("ADMIN_TEST_PASSWORD not set");

    let client = cookie_client();
    let resp = client
        .post(format!("{}/api/admin/login", admin_base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    client
}

async fn get(client: &Client, path: &str) -> (StatusCode, Value) {
    let resp = client
        .get(format!("{}{path}", admin_base_url()))
        .send()
        .await
        .expect("request failed");
    let status = resp.status();
    (status, resp.json().await.unwrap_or(Value::Null))
}

#[tokio::test]
#[ignore = "Requires running admin server and a test account"]
async fn test_login_then_me() {
    let client = signed_in_client().await;
    let (status, me) = get(&client, "/api/admin/me").await;
    assert_eq!(status, StatusCode::OK);
    assert!(me["email"].is_string());
}

#[tokio::test]
#[ignore = "Requires running admin server and a test account"]
async fn test_stats_timeframes() {
    let client = signed_in_client().await;

    for timeframe in ["today", "7d", "30d", "90d", "all"] {
        let (status, stats) = get(&client, &format!("/api/admin/stats?timeframe={timeframe}")).await;
        assert_eq!(status, StatusCode::OK, "{timeframe}");
        assert!(stats["total_users"].is_number());
    }

    let (status, _) = get(&client, "/api/admin/stats?timeframe=fortnight").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running admin server and a test account"]
async fn test_contacts_export_is_csv() {
    let client = signed_in_client().await;
    let resp = client
        .get(format!("{}/api/admin/export/contacts", admin_base_url()))
        .send()
        .await
        .expect("request failed");

    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_owned();
    assert!(content_type.starts_with("text/csv"));
    let body = resp.text().await.unwrap();
    assert!(body.starts_with("email,name,source,created_at,subscribed"));
}

#[tokio::test]
#[ignore = "Requires running admin server and a test account"]
async fn test_activity_log_records_login() {
    let client = signed_in_client().await;
    let (status, body) = get(&client, "/api/admin/activity?limit=5").await;
    assert_eq!(status, StatusCode::OK);
    let logs = body["logs"].as_array().unwrap();
    assert!(logs.iter().any(|entry| entry["action"] == "login"));
}

#[tokio::test]
#[ignore = "Requires running admin server and a test account"]
async fn test_logout_ends_session() {
    let client = signed_in_client().await;
    let resp = client
        .post(format!("{}/api/admin/logout", admin_base_url()))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, _) = get(&client, "/api/admin/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
