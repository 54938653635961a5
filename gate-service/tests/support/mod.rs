#![allow(dead_code)]

use anyhow::{anyhow, Context, Result};
use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request};
use axum::response::Response;
use axum::Router;
use gate_service::config::{load_from, ServiceConfig};
use gate_service::{build_router, build_state, AppState};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_ISSUER: &str = "gate.test";

pub fn config_with(overrides: &[(&str, &str)]) -> ServiceConfig {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("JWT_SIGNING_SECRET".to_string(), TEST_SECRET.to_string()),
        ("JWT_ISSUER".to_string(), TEST_ISSUER.to_string()),
    ]);
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }
    load_from(|key| vars.get(key).cloned()).expect("test config loads")
}

pub fn test_config() -> ServiceConfig {
    config_with(&[])
}

pub fn test_state() -> AppState {
    build_state(&test_config()).expect("test state builds")
}

pub fn test_app(state: &AppState) -> Router {
    build_router(state.clone())
}

/// HS256-sign arbitrary claims with `secret`.
pub fn sign<T: Serialize>(claims: &T, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("claims encode")
}

pub async fn send(app: &Router, request: Request<Body>) -> Result<Response> {
    app.clone()
        .oneshot(request)
        .await
        .map_err(|err| anyhow!("router error: {err}"))
}

pub async fn read_json(response: Response) -> Result<Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    serde_json::from_slice(&bytes).context("response body is not JSON")
}

pub async fn read_text(response: Response) -> Result<String> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(String::from_utf8(bytes.to_vec())?)
}

pub fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "username": username, "password": password }).to_string(),
        ))
        .expect("login request")
}

pub async fn login_token(app: &Router, username: &str) -> Result<String> {
    let response = send(app, login_request(username, "password")).await?;
    let body = read_json(response).await?;
    body.get("token")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("login for {username} returned no token: {body}"))
}
