use std::str::FromStr;

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::error::{AuthError, AuthResult};

/// Where a gate looks for the bearer token, written as `header:Authorization`,
/// `query:token` or `cookie:jwt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenLookup {
    Header(HeaderName),
    Query(String),
    Cookie(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenLookupError {
    #[error("token lookup '{0}' must look like source:name")]
    Malformed(String),
    #[error("unsupported token lookup source '{0}', use header, query or cookie")]
    UnsupportedSource(String),
    #[error("invalid header name '{0}' in token lookup")]
    InvalidHeader(String),
}

impl Default for TokenLookup {
    fn default() -> Self {
        TokenLookup::Header(AUTHORIZATION)
    }
}

impl FromStr for TokenLookup {
    type Err = TokenLookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, name) = s
            .trim()
            .split_once(':')
            .map(|(source, name)| (source.trim(), name.trim()))
            .filter(|(_, name)| !name.is_empty())
            .ok_or_else(|| TokenLookupError::Malformed(s.to_string()))?;

        match source.to_ascii_lowercase().as_str() {
            "header" => HeaderName::from_str(name)
                .map(TokenLookup::Header)
                .map_err(|_| TokenLookupError::InvalidHeader(name.to_string())),
            "query" => Ok(TokenLookup::Query(name.to_string())),
            "cookie" => Ok(TokenLookup::Cookie(name.to_string())),
            other => Err(TokenLookupError::UnsupportedSource(other.to_string())),
        }
    }
}

impl TokenLookup {
    /// Pull the raw token out of the request; absence of any usable token is `MissingToken`.
    pub fn extract(&self, parts: &Parts) -> AuthResult<String> {
        match self {
            TokenLookup::Header(name) => {
                let value = parts.headers.get(name).ok_or(AuthError::MissingToken)?;
                parse_bearer(value, *name == AUTHORIZATION)
            }
            TokenLookup::Query(name) => {
                let query = parts.uri.query().ok_or(AuthError::MissingToken)?;
                find_pair(query.split('&'), name)
            }
            TokenLookup::Cookie(name) => {
                let cookies = parts
                    .headers
                    .get_all(COOKIE)
                    .iter()
                    .filter_map(|value| value.to_str().ok())
                    .flat_map(|value| value.split(';'))
                    .collect::<Vec<_>>();
                find_pair(cookies.into_iter(), name)
            }
        }
    }
}

fn parse_bearer(value: &HeaderValue, scheme_required: bool) -> AuthResult<String> {
    let raw = value
        .to_str()
        .map_err(|_| AuthError::MissingToken)?
        .trim();

    let token = match raw.strip_prefix("Bearer ") {
        Some(token) => token.trim(),
        None if scheme_required => return Err(AuthError::MissingToken),
        None => raw,
    };

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }

    Ok(token.to_owned())
}

fn find_pair<'a>(pairs: impl Iterator<Item = &'a str>, name: &str) -> AuthResult<String> {
    pairs
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MissingToken)
}
