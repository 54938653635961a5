use anyhow::{anyhow, Context, Result};
use common_auth::{ForwardMap, JwtConfig, Predicate, TokenLookup};
use std::env;
use std::fmt;

use crate::tokens::TokenConfig;

pub const DEFAULT_SIGNING_SECRET: &str = "supersecret";
pub const DEFAULT_ISSUER: &str = "gate-service.local";
pub const DEFAULT_ACCESS_TTL_SECONDS: i64 = 30 * 60;
pub const MAX_ACCESS_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;
pub const DEFAULT_STANDARD_CLAIMS: &str = "Equals(`email_verified`, `true`) && OneOf(`user.role`, `admin`, `owner`, `user`) && Contains(`permissions`, `read`, `create`)";
pub const DEFAULT_ADMIN_CLAIMS: &str = "Equals(`email_verified`, `true`) && Equals(`user.role`, `admin`) && Contains(`permissions`, `read`, `create`, `delete`, `update`)";
pub const DEFAULT_FORWARD_CLAIMS: &str = "email=user.email,role=user.role,name=user.name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub signing_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_seconds: i64,
    pub leeway_seconds: u32,
    pub token_lookup: TokenLookup,
    pub standard_claims: Predicate,
    pub admin_claims: Predicate,
    pub forward_claims: ForwardMap,
    pub email_domain: String,
    pub log_format: LogFormat,
}

impl ServiceConfig {
    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig::new(&self.signing_secret, &self.issuer, &self.audience)
            .with_leeway(self.leeway_seconds)
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
            access_ttl_seconds: self.access_ttl_seconds,
            email_domain: self.email_domain.clone(),
        }
    }

    pub fn uses_default_secret(&self) -> bool {
        self.signing_secret == DEFAULT_SIGNING_SECRET
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("signing_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("leeway_seconds", &self.leeway_seconds)
            .field("token_lookup", &self.token_lookup)
            .field("standard_claims", &self.standard_claims.to_string())
            .field("admin_claims", &self.admin_claims.to_string())
            .field("forward_claims", &self.forward_claims)
            .field("email_domain", &self.email_domain)
            .field("log_format", &self.log_format)
            .finish()
    }
}

pub fn load_service_config() -> Result<ServiceConfig> {
    load_from(|key| env::var(key).ok())
}

/// Build the config from an arbitrary key lookup; `load_service_config` passes the process env.
pub fn load_from<F>(lookup: F) -> Result<ServiceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).and_then(|value| normalize_optional(&value));

    let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
    let port = var("PORT")
        .map(|value| value.parse::<u16>())
        .transpose()
        .context("Failed to parse PORT")?
        .unwrap_or(8080);

    let signing_secret =
        var("JWT_SIGNING_SECRET").unwrap_or_else(|| DEFAULT_SIGNING_SECRET.to_string());
    let issuer = var("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string());
    let audience = var("JWT_AUDIENCE").unwrap_or_else(|| issuer.clone());

    let access_ttl_seconds = var("JWT_ACCESS_TTL_SECONDS")
        .map(|value| value.parse::<i64>())
        .transpose()
        .context("Failed to parse JWT_ACCESS_TTL_SECONDS")?
        .unwrap_or(DEFAULT_ACCESS_TTL_SECONDS);
    if !(1..=MAX_ACCESS_TTL_SECONDS).contains(&access_ttl_seconds) {
        return Err(anyhow!(
            "JWT_ACCESS_TTL_SECONDS must be between 1 and {MAX_ACCESS_TTL_SECONDS}, got {access_ttl_seconds}"
        ));
    }

    let leeway_seconds = var("JWT_LEEWAY_SECONDS")
        .map(|value| value.parse::<u32>())
        .transpose()
        .context("Failed to parse JWT_LEEWAY_SECONDS")?
        .unwrap_or(0);

    let token_lookup = var("JWT_TOKEN_LOOKUP")
        .map(|value| value.parse::<TokenLookup>())
        .transpose()
        .context("Failed to parse JWT_TOKEN_LOOKUP")?
        .unwrap_or_default();

    let standard_claims = Predicate::parse(
        &var("GATE_STANDARD_CLAIMS").unwrap_or_else(|| DEFAULT_STANDARD_CLAIMS.to_string()),
    )
    .context("Failed to parse GATE_STANDARD_CLAIMS")?;
    let admin_claims = Predicate::parse(
        &var("GATE_ADMIN_CLAIMS").unwrap_or_else(|| DEFAULT_ADMIN_CLAIMS.to_string()),
    )
    .context("Failed to parse GATE_ADMIN_CLAIMS")?;
    let forward_claims = var("GATE_FORWARD_CLAIMS")
        .unwrap_or_else(|| DEFAULT_FORWARD_CLAIMS.to_string())
        .parse::<ForwardMap>()
        .context("Failed to parse GATE_FORWARD_CLAIMS")?;

    let email_domain = var("AUTH_EMAIL_DOMAIN")
        .map(|value| value.trim_start_matches('@').to_string())
        .unwrap_or_else(|| "example.com".to_string());

    let log_format = var("LOG_FORMAT")
        .map(|value| parse_log_format(&value))
        .transpose()
        .context("Failed to parse LOG_FORMAT")?
        .unwrap_or(LogFormat::Text);

    Ok(ServiceConfig {
        host,
        port,
        signing_secret,
        issuer,
        audience,
        access_ttl_seconds,
        leeway_seconds,
        token_lookup,
        standard_claims,
        admin_claims,
        forward_claims,
        email_domain,
        log_format,
    })
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat> {
    match value.trim().to_ascii_lowercase().as_str() {
        "text" | "pretty" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(anyhow!(
            "Unsupported log format '{other}'. Use text or json."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<ServiceConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        load_from(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).expect("defaults load");
        assert_eq!(config.port, 8080);
        assert_eq!(config.signing_secret, DEFAULT_SIGNING_SECRET);
        assert!(config.uses_default_secret());
        assert_eq!(config.issuer, DEFAULT_ISSUER);
        assert_eq!(config.audience, DEFAULT_ISSUER);
        assert_eq!(config.access_ttl_seconds, 1800);
        assert_eq!(config.leeway_seconds, 0);
        assert_eq!(config.token_lookup, TokenLookup::default());
        assert_eq!(config.email_domain, "example.com");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.forward_claims.entries().count(), 3);
    }

    #[test]
    fn blank_secret_counts_as_unset() {
        let config = load(&[("JWT_SIGNING_SECRET", "   ")]).unwrap();
        assert!(config.uses_default_secret());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("PORT", "9000"),
            ("JWT_SIGNING_SECRET", "s3cr3t"),
            ("JWT_ISSUER", "issuer.test"),
            ("JWT_AUDIENCE", "audience.test"),
            ("JWT_ACCESS_TTL_SECONDS", "60"),
            ("JWT_TOKEN_LOOKUP", "cookie:jwt"),
            ("GATE_ADMIN_CLAIMS", "Equals(`user.role`, `root`)"),
            ("GATE_FORWARD_CLAIMS", "email=user.email"),
            ("AUTH_EMAIL_DOMAIN", "@corp.test"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert!(!config.uses_default_secret());
        assert_eq!(config.audience, "audience.test");
        assert_eq!(config.access_ttl_seconds, 60);
        assert_eq!(config.token_lookup, TokenLookup::Cookie("jwt".into()));
        assert_eq!(config.admin_claims, Predicate::equals("user.role", "root"));
        assert_eq!(config.forward_claims.entries().count(), 1);
        assert_eq!(config.email_domain, "corp.test");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.jwt_config().issuer, "issuer.test");
        assert_eq!(config.token_config().access_ttl_seconds, 60);
    }

    #[test]
    fn invalid_values_fail_fast() {
        assert!(load(&[("JWT_ACCESS_TTL_SECONDS", "0")]).is_err());
        assert!(load(&[("JWT_ACCESS_TTL_SECONDS", "9223372036854775807")]).is_err());
        assert!(load(&[("JWT_ACCESS_TTL_SECONDS", "31536001")]).is_err());
        assert!(load(&[("JWT_ACCESS_TTL_SECONDS", "31536000")]).is_ok());
        assert!(load(&[("PORT", "http")]).is_err());
        assert!(load(&[("GATE_STANDARD_CLAIMS", "Equals(`a`)")]).is_err());
        assert!(load(&[("GATE_FORWARD_CLAIMS", "email")]).is_err());
        assert!(load(&[("JWT_TOKEN_LOOKUP", "body:token")]).is_err());
        assert!(load(&[("LOG_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn debug_output_hides_secret() {
        let config = load(&[("JWT_SIGNING_SECRET", "s3cr3t")]).unwrap();
        assert!(!format!("{config:?}").contains("s3cr3t"));
    }
}
