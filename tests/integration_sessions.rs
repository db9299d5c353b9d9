mod common;

use axum::http::{StatusCode, header};
use chrono::Duration;
use clinic::testing::TestApp;
use common::{CLIENT_IP, PASSWORD, bearer, body_json, login_request, request};
use serde_json::Value;
use tower::ServiceExt;

async fn login(app: &TestApp, username: &str) -> Value {
    app.add_account(username, PASSWORD);
    let response = app
        .router()
        .oneshot(login_request(username, PASSWORD, CLIENT_IP))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

fn token(body: &Value, field: &str) -> String {
    body[field].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_bearer_token_reaches_own_home() {
    let app = TestApp::new();
    let tokens = login(&app, "D7654321").await;
    let auth = bearer(&token(&tokens, "access_token"));

    let response = app
        .router()
        .oneshot(request(
            "GET",
            "/api/v1/doctors/home",
            &[("authorization", auth.as_str())],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["identity"]["username"], "D7654321");
    assert_eq!(body["identity"]["role"], "DOCTOR");
    assert_eq!(body["identity"]["source"], "bearer_token");
}

#[tokio::test]
async fn test_foreign_home_is_forbidden() {
    let app = TestApp::new();
    let tokens = login(&app, "U1234567").await;
    let auth = bearer(&token(&tokens, "access_token"));

    let response = app
        .router()
        .oneshot(request(
            "GET",
            "/api/v1/admins/home",
            &[("authorization", auth.as_str())],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_anonymous_home_is_unauthorized() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(request("GET", "/api/v1/users/home", &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tampered_bearer_is_rejected() {
    let app = TestApp::new();
    let tokens = login(&app, "U1234567").await;
    let mut access = token(&tokens, "access_token");
    access.push('x');

    let response = app
        .router()
        .oneshot(request(
            "GET",
            "/api/auth/me",
            &[("authorization", bearer(&access).as_str())],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn test_bad_bearer_rejects_even_public_routes() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(request(
            "GET",
            "/api-docs/openapi.json",
            &[("authorization", "Bearer not-a-token")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cookie_authenticates() {
    let app = TestApp::new();
    let tokens = login(&app, "A0000001").await;
    let cookie = format!("token={}", token(&tokens, "access_token"));

    let response = app
        .router()
        .oneshot(request("GET", "/api/auth/me", &[("cookie", cookie.as_str())]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["username"], "A0000001");
    assert_eq!(body["role"], "ADMIN");
    assert_eq!(body["source"], "cookie");
}

#[tokio::test]
async fn test_bad_cookie_falls_through_to_anonymous() {
    let app = TestApp::new();

    let public = app
        .router()
        .oneshot(request(
            "GET",
            "/api-docs/openapi.json",
            &[("cookie", "token=garbage")],
        ))
        .await
        .unwrap();
    assert_eq!(public.status(), StatusCode::OK);

    let protected = app
        .router()
        .oneshot(request("GET", "/api/auth/me", &[("cookie", "token=garbage")]))
        .await
        .unwrap();
    assert_eq!(protected.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(protected).await;
    assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
async fn test_expired_bearer_without_refresh_is_rejected() {
    let app = TestApp::new();
    let tokens = login(&app, "U1234567").await;
    app.advance(Duration::minutes(6));

    let response = app
        .router()
        .oneshot(request(
            "GET",
            "/api/auth/me",
            &[("authorization", bearer(&token(&tokens, "access_token")).as_str())],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Token has expired");
}

#[tokio::test]
async fn test_expired_bearer_with_refresh_emits_new_pair() {
    let app = TestApp::new();
    let tokens = login(&app, "U1234567").await;
    let old_access = token(&tokens, "access_token");
    app.advance(Duration::minutes(6));

    let response = app
        .router()
        .oneshot(request(
            "GET",
            "/api/auth/me",
            &[
                ("authorization", bearer(&old_access).as_str()),
                ("refreshtoken", bearer(&token(&tokens, "refresh_token")).as_str()),
            ],
        ))
        .await
        .unwrap();

    // The current call stays anonymous; the new pair comes back in headers.
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let new_auth = response.headers()[header::AUTHORIZATION]
        .to_str()
        .unwrap()
        .to_string();
    let new_refresh = response.headers()["refreshtoken"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(new_auth.starts_with("Bearer "));
    assert!(new_refresh.starts_with("Bearer "));
    assert_ne!(new_auth, bearer(&old_access));

    let new_access = new_auth.trim_start_matches("Bearer ");
    let validated = app.state.sessions.tokens().validate(new_access).unwrap();
    assert_eq!(validated.username(), "U1234567");

    let retried = app
        .router()
        .oneshot(request("GET", "/api/auth/me", &[("authorization", new_auth.as_str())]))
        .await
        .unwrap();
    assert_eq!(retried.status(), StatusCode::OK);
    let body = body_json(retried).await;
    assert_eq!(body["username"], "U1234567");
    assert_eq!(body["role"], "USER");
}

#[tokio::test]
async fn test_refresh_endpoint_and_single_use() {
    let app = TestApp::new();
    let tokens = login(&app, "D7654321").await;
    let refresh_header = bearer(&token(&tokens, "refresh_token"));

    let response = app
        .router()
        .oneshot(request(
            "POST",
            "/api/auth/refresh",
            &[("refreshtoken", refresh_header.as_str())],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["role"], "DOCTOR");
    assert_ne!(body["refresh_token"], tokens["refresh_token"]);

    let replay = app
        .router()
        .oneshot(request(
            "POST",
            "/api/auth/refresh",
            &[("refreshtoken", refresh_header.as_str())],
        ))
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(replay).await;
    assert_eq!(body["error"], "Refresh token has already been used");
}

#[tokio::test]
async fn test_refresh_endpoint_requires_token() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(request("POST", "/api/auth/refresh", &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_for_vanished_principal_fails() {
    let app = TestApp::new();
    let tokens = login(&app, "U1234567").await;
    app.remove_account("U1234567");

    let response = app
        .router()
        .oneshot(request(
            "POST",
            "/api/auth/refresh",
            &[("refreshtoken", bearer(&token(&tokens, "refresh_token")).as_str())],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_a_session_token() {
    let app = TestApp::new();
    let tokens = login(&app, "U1234567").await;

    let response = app
        .router()
        .oneshot(request(
            "GET",
            "/api/auth/me",
            &[("authorization", bearer(&token(&tokens, "refresh_token")).as_str())],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_cookies_and_spends_refresh_token() {
    let app = TestApp::new();
    let tokens = login(&app, "U1234567").await;
    let refresh_cookie = format!("refreshToken={}", token(&tokens, "refresh_token"));
    let cookies = format!(
        "token={}; {}",
        token(&tokens, "access_token"),
        refresh_cookie
    );

    let response = app
        .router()
        .oneshot(request("POST", "/logout", &[("cookie", cookies.as_str())]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cleared: Vec<&str> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    assert!(cleared.iter().any(|c| c.starts_with("token=")));
    assert!(cleared.iter().any(|c| c.starts_with("refreshToken=")));

    let response = app
        .router()
        .oneshot(request(
            "POST",
            "/api/auth/refresh",
            &[("cookie", refresh_cookie.as_str())],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
