#![allow(dead_code)]

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, Response, header};
use http_body_util::BodyExt;
use serde_json::Value;

pub const PASSWORD: &str = "Passw0rd@";
pub const CLIENT_IP: &str = "10.0.0.5";

fn peer(ip: &str) -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::new(ip.parse().unwrap(), 51234))
}

/// JSON POST from `ip`.
pub fn post_json(uri: &str, body: Value, ip: &str) -> Request<Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();
    request.extensions_mut().insert(peer(ip));
    request
}

/// Request with arbitrary headers and an empty body.
pub fn request(method: &str, uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let mut request = builder.body(Body::empty()).unwrap();
    request.extensions_mut().insert(peer(CLIENT_IP));
    request
}

pub fn login_request(username: &str, password: &str, ip: &str) -> Request<Body> {
    post_json(
        "/login",
        serde_json::json!({ "username": username, "password": password }),
        ip,
    )
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// `Set-Cookie` header for `name`, if the response sets one.
pub fn set_cookie<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&prefix))
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
