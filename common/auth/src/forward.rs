use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::claims::resolve_path;

/// Ordered projection of claim paths onto context keys, applied after a
/// token passes its gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardMap {
    entries: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid forward claim entry '{0}', expected key=claim.path")]
pub struct ForwardMapError(pub String);

impl ForwardMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward the claim at `claim_path` under `key`. A repeated key replaces the earlier path.
    pub fn forward(mut self, key: impl Into<String>, claim_path: impl Into<String>) -> Self {
        let key = key.into();
        let claim_path = claim_path.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = claim_path,
            None => self.entries.push((key, claim_path)),
        }
        self
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, path)| (key.as_str(), path.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Project `claims` through the map. Paths that do not resolve are skipped.
    pub fn project(&self, claims: &Value) -> ForwardedClaims {
        let values = self
            .entries
            .iter()
            .filter_map(|(key, path)| {
                resolve_path(claims, path).map(|value| (key.clone(), value.clone()))
            })
            .collect();
        ForwardedClaims { values }
    }
}

impl FromStr for ForwardMap {
    type Err = ForwardMapError;

    /// Parses `email=user.email,role=user.role`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut map = ForwardMap::new();
        for item in s.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (key, path) = item
                .split_once('=')
                .map(|(key, path)| (key.trim(), path.trim()))
                .filter(|(key, path)| !key.is_empty() && !path.is_empty())
                .ok_or_else(|| ForwardMapError(item.to_string()))?;
            map = map.forward(key, path);
        }
        Ok(map)
    }
}

/// Claim values exposed to downstream handlers under their forwarded keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ForwardedClaims {
    values: BTreeMap<String, Value>,
}

impl ForwardedClaims {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String view of a forwarded value; non-string values are rendered as JSON.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims() -> Value {
        json!({
            "user": { "name": "ADMIN", "role": "admin", "email": "admin@example.com" },
            "email_verified": true
        })
    }

    #[test]
    fn project_renames_claims() {
        let map = ForwardMap::new()
            .forward("email", "user.email")
            .forward("role", "user.role")
            .forward("verified", "email_verified");
        let forwarded = map.project(&claims());

        assert_eq!(forwarded.len(), 3);
        assert_eq!(forwarded.get_string("email").as_deref(), Some("admin@example.com"));
        assert_eq!(forwarded.get_string("role").as_deref(), Some("admin"));
        assert_eq!(forwarded.get_string("verified").as_deref(), Some("true"));
    }

    #[test]
    fn project_skips_missing_paths() {
        let map = ForwardMap::new()
            .forward("name", "user.name")
            .forward("tenant", "tenant.id");
        let forwarded = map.project(&claims());

        assert_eq!(forwarded.len(), 1);
        assert!(forwarded.get("tenant").is_none());
    }

    #[test]
    fn parses_env_style_list() {
        let map: ForwardMap = "email=user.email, role = user.role,,name=user.name"
            .parse()
            .expect("parses");
        let entries: Vec<_> = map.entries().collect();
        assert_eq!(
            entries,
            vec![
                ("email", "user.email"),
                ("role", "user.role"),
                ("name", "user.name")
            ]
        );
    }

    #[test]
    fn rejects_entries_without_path() {
        let err = "email=".parse::<ForwardMap>().expect_err("should reject");
        assert_eq!(err, ForwardMapError("email=".into()));
        assert!("role".parse::<ForwardMap>().is_err());
    }

    #[test]
    fn repeated_key_replaces_path() {
        let map = ForwardMap::new()
            .forward("role", "role")
            .forward("role", "user.role");
        assert_eq!(map.entries().collect::<Vec<_>>(), vec![("role", "user.role")]);
    }

    #[test]
    fn forwarded_claims_serialize_as_flat_object() {
        let forwarded = ForwardMap::new()
            .forward("email", "user.email")
            .project(&claims());
        assert_eq!(
            serde_json::to_value(&forwarded).unwrap(),
            json!({ "email": "admin@example.com" })
        );
    }
}
