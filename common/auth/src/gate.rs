use std::fmt;
use std::sync::Arc;

use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::debug;

use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};
use crate::forward::{ForwardMap, ForwardedClaims};
use crate::lookup::TokenLookup;
use crate::predicate::Predicate;

/// Extra check run after the predicate passes. Returning `Err` rejects the token.
pub trait ClaimsValidator: Send + Sync {
    fn validate(&self, claims: &Value) -> Result<(), String>;
}

impl<F> ClaimsValidator for F
where
    F: Fn(&Value) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, claims: &Value) -> Result<(), String> {
        self(claims)
    }
}

/// Validates bearer tokens for one route group and exposes the forwarded claims.
#[derive(Clone)]
pub struct ClaimsGate {
    name: String,
    config: JwtConfig,
    decoding_key: DecodingKey,
    validation: Validation,
    predicate: Predicate,
    forward: ForwardMap,
    lookup: TokenLookup,
    validator: Option<Arc<dyn ClaimsValidator>>,
}

impl fmt::Debug for ClaimsGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimsGate")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("predicate", &self.predicate.to_string())
            .field("forward", &self.forward)
            .field("lookup", &self.lookup)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl ClaimsGate {
    pub fn builder(
        name: impl Into<String>,
        config: JwtConfig,
        predicate: Predicate,
    ) -> ClaimsGateBuilder {
        ClaimsGateBuilder::new(name.into(), config, predicate)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn lookup(&self) -> &TokenLookup {
        &self.lookup
    }

    /// Checks signature, expiry, issuer/audience, predicate and the custom
    /// validator in that order, then projects the forward map.
    pub fn authenticate(&self, token: &str) -> AuthResult<ForwardedClaims> {
        let claims = decode::<Value>(token, &self.decoding_key, &self.validation)?.claims;

        if !self.predicate.evaluate(&claims) {
            return Err(AuthError::ClaimsPredicateFailed);
        }

        if let Some(validator) = &self.validator {
            validator
                .validate(&claims)
                .map_err(AuthError::CustomValidationFailed)?;
        }

        let forwarded = self.forward.project(&claims);
        debug!(gate = %self.name, forwarded = forwarded.len(), "token accepted");
        Ok(forwarded)
    }

    /// Locate the token in the request and authenticate it.
    pub fn authorize_parts(&self, parts: &Parts) -> AuthResult<ForwardedClaims> {
        let token = self.lookup.extract(parts)?;
        self.authenticate(&token)
    }
}

pub struct ClaimsGateBuilder {
    name: String,
    config: JwtConfig,
    predicate: Predicate,
    forward: ForwardMap,
    lookup: TokenLookup,
    validator: Option<Arc<dyn ClaimsValidator>>,
}

impl ClaimsGateBuilder {
    fn new(name: String, config: JwtConfig, predicate: Predicate) -> Self {
        Self {
            name,
            config,
            predicate,
            forward: ForwardMap::new(),
            lookup: TokenLookup::default(),
            validator: None,
        }
    }

    pub fn with_forward_map(mut self, forward: ForwardMap) -> Self {
        self.forward = forward;
        self
    }

    pub fn with_token_lookup(mut self, lookup: TokenLookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_validator<V>(mut self, validator: V) -> Self
    where
        V: ClaimsValidator + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn build(self) -> ClaimsGate {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.set_audience(&[self.config.audience.as_str()]);
        validation.leeway = self.config.leeway_seconds.into();

        ClaimsGate {
            decoding_key: DecodingKey::from_secret(&self.config.signing_secret),
            validation,
            name: self.name,
            config: self.config,
            predicate: self.predicate,
            forward: self.forward,
            lookup: self.lookup,
            validator: self.validator,
        }
    }
}
