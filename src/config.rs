use std::env;
use std::str::FromStr;

use anyhow::{Context, anyhow};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Leave workflow
    pub allow_half_day: bool,
    pub leave_type_cache_ttl_secs: u64,

    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,

            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            allow_half_day: parse_or(&lookup, "ALLOW_HALF_DAY", true)?,
            leave_type_cache_ttl_secs: parse_or(&lookup, "LEAVE_TYPE_CACHE_TTL_SECS", 300)?, // 5 min

            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
        })
    }

    #[cfg(test)]
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: "mysql://localhost/test".to_string(),
            jwt_secret: jwt_secret.to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            allow_half_day: true,
            leave_type_cache_ttl_secs: 300,
            log_dir: "logs".to_string(),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("SERVER_ADDR", "0.0.0.0:8080"),
        ("DATABASE_URL", "mysql://u:p@db/hrm"),
        ("JWT_SECRET", "s3cret"),
    ];

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();
        assert_eq!(config.api_prefix, "/api");
        assert!(config.allow_half_day);
        assert_eq!(config.rate_protected_per_min, 1000);
        assert_eq!(config.leave_type_cache_ttl_secs, 300);
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = BASE.to_vec();
        pairs.push(("ALLOW_HALF_DAY", "false"));
        pairs.push(("API_PREFIX", "/api/v1"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert!(!config.allow_half_day);
        assert_eq!(config.api_prefix, "/api/v1");
    }

    #[test]
    fn missing_required_key_is_named() {
        let err = Config::from_lookup(lookup(&BASE[..2])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn invalid_number_is_reported() {
        let mut pairs = BASE.to_vec();
        pairs.push(("RATE_PROTECTED_PER_MIN", "lots"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("RATE_PROTECTED_PER_MIN"));
    }
}
