use axum::response::{IntoResponse, Response};
use common_http_errors::ApiError;
use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("token signature or encoding invalid: {0}")]
    InvalidSignature(String),
    #[error("token expired")]
    TokenExpired,
    #[error("token issuer or audience mismatch: {0}")]
    InvalidIssuerOrAudience(String),
    #[error("token claims do not satisfy the gate predicate")]
    ClaimsPredicateFailed,
    #[error("custom claims validation failed: {0}")]
    CustomValidationFailed(String),
    #[error("no token found in request")]
    MissingToken,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl AuthError {
    /// Stable label used in logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InvalidSignature(_) => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidIssuerOrAudience(_) => "invalid_issuer_or_audience",
            AuthError::ClaimsPredicateFailed => "claims_predicate_failed",
            AuthError::CustomValidationFailed(_) => "custom_validation_failed",
            AuthError::MissingToken => "missing_token",
            AuthError::Signing(_) => "signing",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        match value.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                Self::InvalidIssuerOrAudience(value.to_string())
            }
            ErrorKind::MissingRequiredClaim(claim) if claim == "iss" || claim == "aud" => {
                Self::InvalidIssuerOrAudience(value.to_string())
            }
            _ => Self::InvalidSignature(value.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let api_error = match self {
            AuthError::InvalidCredentials => ApiError::Unauthorized {
                code: "invalid_credentials",
                trace_id: None,
            },
            AuthError::Signing(message) => ApiError::Internal {
                trace_id: None,
                message: Some(message),
            },
            // The specific validator failure is only logged by the caller.
            _ => ApiError::unauthorized(),
        };
        api_error.into_response()
    }
}
