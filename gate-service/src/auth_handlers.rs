use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common_auth::{AuthContext, AuthError};
use common_http_errors::ApiError;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::store::Credential;
use crate::AppState;

const INVALID_LOGIN_MESSAGE: &str = "Invalid username or password";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
}

impl LoginResponse {
    fn denied() -> Self {
        Self {
            success: false,
            message: INVALID_LOGIN_MESSAGE.to_string(),
            token: None,
            expires: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub email: String,
    pub role: String,
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credential>, JsonRejection>,
) -> Response {
    let Json(credential) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return ApiError::BadRequest {
                code: "invalid_request",
                trace_id: None,
                message: Some(rejection.body_text()),
            }
            .into_response()
        }
    };

    match state.issuer.issue(&credential) {
        Ok(issued) => {
            state.record_login_metric("success");
            info!(username = %credential.username, jti = %issued.claims.jti, "Token issued");
            let body = LoginResponse {
                success: true,
                message: format!("Welcome back {}", credential.username),
                token: Some(issued.token),
                expires: Some(issued.expires_at.timestamp()),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(AuthError::InvalidCredentials) => {
            state.record_login_metric("invalid_credentials");
            warn!(username = %credential.username, "Invalid login attempt");
            (StatusCode::UNAUTHORIZED, Json(LoginResponse::denied())).into_response()
        }
        Err(err) => {
            state.record_login_metric("error");
            error!(error = %err, "Failed to issue token");
            err.into_response()
        }
    }
}

pub async fn whoami(context: AuthContext) -> Response {
    let info = UserInfo {
        name: context.get_string("name"),
        email: context.get_string("email"),
        role: context.get_string("role"),
    };
    if info.email.is_empty() {
        warn!(gate = %context.gate, "No email forwarded for authenticated request");
        return ApiError::unauthorized().into_response();
    }

    let mut headers = HeaderMap::new();
    for (name, value) in [
        ("x-user", &info.email),
        ("x-user-name", &info.name),
        ("x-user-role", &info.role),
    ] {
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }

    (StatusCode::OK, headers, Json(info)).into_response()
}
