mod common;

use axum::http::{StatusCode, header};
use chrono::Duration;
use clinic::clinic_auth::LockoutStore;
use clinic::clinic_config::LockoutConfig;
use clinic::testing::TestApp;
use common::{CLIENT_IP, PASSWORD, body_json, login_request, post_json};
use serde_json::json;
use tower::ServiceExt;

const USERNAME: &str = "U1234567";

async fn fail_login(app: &TestApp, ip: &str) -> serde_json::Value {
    let response = app
        .router()
        .oneshot(login_request(USERNAME, "WrongPass1", ip))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    body_json(response).await
}

#[tokio::test]
async fn test_fifth_failure_locks_out_client() {
    let app = TestApp::new();
    app.add_account(USERNAME, PASSWORD);

    for expected_remaining in [4, 3, 2, 1] {
        let body = fail_login(&app, CLIENT_IP).await;
        assert_eq!(body["remaining_attempts"], expected_remaining);
        assert!(body.get("lockout").is_none());
    }

    let body = fail_login(&app, CLIENT_IP).await;
    assert_eq!(body["remaining_attempts"], 0);
    assert_eq!(body["lockout"], true);
    assert_eq!(body["retry_after_seconds"], 600);

    // The correct password is refused while the lockout lasts.
    let response = app
        .router()
        .oneshot(login_request(USERNAME, PASSWORD, CLIENT_IP))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::RETRY_AFTER], "600");
    let body = body_json(response).await;
    assert_eq!(body["lockout"], true);
    assert_eq!(body["retry_after_seconds"], 600);
}

#[tokio::test]
async fn test_lockout_countdown_and_expiry() {
    let app = TestApp::new();
    app.add_account(USERNAME, PASSWORD);

    for _ in 0..5 {
        fail_login(&app, CLIENT_IP).await;
    }

    app.advance(Duration::minutes(4));
    let response = app
        .router()
        .oneshot(login_request(USERNAME, PASSWORD, CLIENT_IP))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["retry_after_seconds"], 360);

    app.advance(Duration::minutes(6));
    let response = app
        .router()
        .oneshot(login_request(USERNAME, PASSWORD, CLIENT_IP))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_lockout_is_per_client() {
    let app = TestApp::new();
    app.add_account(USERNAME, PASSWORD);

    for _ in 0..5 {
        fail_login(&app, CLIENT_IP).await;
    }

    let response = app
        .router()
        .oneshot(login_request(USERNAME, PASSWORD, "10.0.0.6"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_success_resets_counter() {
    let app = TestApp::new();
    app.add_account(USERNAME, PASSWORD);

    for _ in 0..4 {
        fail_login(&app, CLIENT_IP).await;
    }

    let response = app
        .router()
        .oneshot(login_request(USERNAME, PASSWORD, CLIENT_IP))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = fail_login(&app, CLIENT_IP).await;
    assert_eq!(body["remaining_attempts"], 4);
}

#[tokio::test]
async fn test_malformed_forms_count_towards_lockout() {
    let app = TestApp::new();
    app.add_account(USERNAME, PASSWORD);

    for _ in 0..5 {
        let response = app
            .router()
            .oneshot(post_json("/login", json!({ "username": "bad" }), CLIENT_IP))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app
        .router()
        .oneshot(login_request(USERNAME, PASSWORD, CLIENT_IP))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["lockout"], true);
}

#[tokio::test]
async fn test_custom_threshold_and_forwarded_for() {
    let app = TestApp::with_lockout(LockoutConfig {
        max_attempts: 2,
        lockout_duration_secs: 60,
        trust_forwarded_for: true,
    });
    app.add_account(USERNAME, PASSWORD);

    for _ in 0..2 {
        let mut request = login_request(USERNAME, "WrongPass1", CLIENT_IP);
        request
            .headers_mut()
            .insert("x-forwarded-for", "203.0.113.9".parse().unwrap());
        app.router().oneshot(request).await.unwrap();
    }

    // Same socket peer, different forwarded client: not locked.
    let response = app
        .router()
        .oneshot(login_request(USERNAME, PASSWORD, CLIENT_IP))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut request = login_request(USERNAME, PASSWORD, CLIENT_IP);
    request
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.9".parse().unwrap());
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["retry_after_seconds"], 60);
}

#[tokio::test]
async fn test_malformed_form_while_locked_is_rejected_as_locked_out() {
    let app = TestApp::new();
    app.add_account(USERNAME, PASSWORD);

    for _ in 0..5 {
        fail_login(&app, CLIENT_IP).await;
    }

    let response = app
        .router()
        .oneshot(post_json("/login", json!({ "username": "bad" }), CLIENT_IP))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::RETRY_AFTER], "600");
    let body = body_json(response).await;
    assert_eq!(body["lockout"], true);
    assert_eq!(body["retry_after_seconds"], 600);

    let record = app.lockouts.get(CLIENT_IP).await.unwrap().unwrap();
    assert_eq!(record.failed_attempts, 5);
}

#[tokio::test]
async fn test_malformed_super_admin_key_while_locked_is_rejected_as_locked_out() {
    let app = TestApp::new();
    app.add_account(USERNAME, PASSWORD);

    for _ in 0..5 {
        fail_login(&app, CLIENT_IP).await;
    }

    let response = app
        .router()
        .oneshot(post_json(
            "/superAdminLogin",
            json!({ "super_admin_key": "not-a-uuid" }),
            CLIENT_IP,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["lockout"], true);

    let record = app.lockouts.get(CLIENT_IP).await.unwrap().unwrap();
    assert_eq!(record.failed_attempts, 5);
}
