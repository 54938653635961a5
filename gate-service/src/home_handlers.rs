use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::{header::HOST, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use common_http_errors::ApiError;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::auth_handlers::UserInfo;
use crate::metrics::AuthMetrics;

#[derive(Debug, Serialize)]
pub struct RequestIdentity {
    pub host: String,
    pub real_ip: String,
    pub current_user: UserInfo,
}

pub async fn home() -> Json<Value> {
    Json(json!({ "message": "Welcome to the gate service!" }))
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics_endpoint(State(metrics): State<Arc<AuthMetrics>>) -> Response {
    match metrics.render() {
        Ok(response) => response,
        Err(err) => {
            error!(?err, "Failed to render metrics");
            ApiError::internal(err, None).into_response()
        }
    }
}

/// Echoes the `current_user_*` headers an upstream proxy sets. No gate runs here.
pub async fn echo_identity(
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Json<RequestIdentity> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    };

    let email = header("current_user_email");
    if email.is_empty() {
        warn!("No current_user_email header on whoami request");
    }

    let forwarded_ip = header("x-forwarded-for")
        .split(',')
        .next()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    let real_ip = [forwarded_ip, header("x-real-ip")]
        .into_iter()
        .find(|ip| !ip.is_empty())
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_default();

    Json(RequestIdentity {
        host: header(HOST.as_str()),
        real_ip,
        current_user: UserInfo {
            name: header("current_user_name"),
            email,
            role: header("current_user_role"),
        },
    })
}
