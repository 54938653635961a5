use chrono::{DateTime, Utc};
use common_auth::{
    AuthError, AuthResult, PrincipalClaims, UserClaims, ADMIN_PERMISSIONS, BASELINE_PERMISSIONS,
    ROLE_ADMIN,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::store::{Account, Credential, CredentialStore};

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl_seconds: i64,
    pub email_domain: String,
}

pub struct TokenIssuer {
    config: TokenConfig,
    encoding_key: EncodingKey,
    store: Arc<dyn CredentialStore>,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in: i64,
    pub token_type: &'static str,
    pub claims: PrincipalClaims,
}

impl TokenIssuer {
    pub fn new(
        signing_secret: impl AsRef<[u8]>,
        config: TokenConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(signing_secret.as_ref()),
            config,
            store,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn issue(&self, credential: &Credential) -> AuthResult<IssuedToken> {
        self.issue_at(credential, Utc::now())
    }

    /// Issue with an explicit clock; `exp` is always `now + ttl`.
    pub fn issue_at(&self, credential: &Credential, now: DateTime<Utc>) -> AuthResult<IssuedToken> {
        info!(username = %credential.username, "login attempt");

        if credential.username.trim().is_empty() || credential.password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let account = self
            .store
            .verify(credential)
            .ok_or(AuthError::InvalidCredentials)?;

        let claims = self.claims_for(&account, now)?;
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| AuthError::Signing(format!("exp {} is out of range", claims.exp)))?;
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| AuthError::Signing(err.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at,
            expires_in: self.config.access_ttl_seconds,
            token_type: "Bearer",
            claims,
        })
    }

    /// Fresh claims for `account`; nothing is shared between calls.
    pub fn claims_for(&self, account: &Account, now: DateTime<Utc>) -> AuthResult<PrincipalClaims> {
        let issued_at = now.timestamp();
        let expires = issued_at
            .checked_add(self.config.access_ttl_seconds)
            .ok_or_else(|| {
                AuthError::Signing(format!(
                    "access ttl {} overflows the expiry timestamp",
                    self.config.access_ttl_seconds
                ))
            })?;
        let permissions = if account.username == ROLE_ADMIN {
            ADMIN_PERMISSIONS
        } else {
            BASELINE_PERMISSIONS
        };

        Ok(PrincipalClaims {
            sub: account.subject.clone(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            user: UserClaims {
                name: account.username.to_uppercase(),
                role: account.username.clone(),
                email: format!("{}@{}", account.username, self.config.email_domain),
            },
            email_verified: account.email_verified,
            permissions: permissions.iter().map(|value| value.to_string()).collect(),
            iat: issued_at,
            exp: expires,
            jti: Uuid::new_v4().to_string(),
        })
    }
}
