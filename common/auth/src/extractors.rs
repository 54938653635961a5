use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AuthError;
use crate::forward::ForwardedClaims;

/// Forwarded claims placed on the request by a gate middleware.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub gate: String,
    pub claims: ForwardedClaims,
}

impl AuthContext {
    pub fn new(gate: impl Into<String>, claims: ForwardedClaims) -> Self {
        Self {
            gate: gate.into(),
            claims,
        }
    }

    /// Forwarded value as a string, empty when the gate did not forward `key`.
    pub fn get_string(&self, key: &str) -> String {
        self.claims.get_string(key).unwrap_or_default()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}
