//! Configuration management.
//!
//! Configuration is read from environment variables:
//! - `REPLAY_GATEWAY_URL` - Optional. OpenAI-compatible gateway. Defaults to `http://localhost:4000/v1`.
//! - `REPLAY_GATEWAY_API_KEY` - Optional. Bearer token for the gateway.
//! - `REPLAY_PRICING_URL` - Optional. Pricing API base. Defaults to Portkey's public endpoint.
//! - `REPLAY_MAX_CONCURRENCY` - Optional. Calls in flight at once. Defaults to `8`.
//! - `REPLAY_CALL_TIMEOUT_SECS` - Optional. Per-call timeout. Defaults to `30`.
//! - `REPLAY_AUDIT_DB` - Optional. SQLite file for the audit trail. Disabled when unset.
//! - `REPLAY_ALLOWED_MODELS` - Optional. Comma-separated models the gateway may route. Unrestricted when unset.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::pricing::DEFAULT_PORTKEY_URL;

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:4000/v1";
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Runtime settings for the replay binary.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub gateway_url: String,
    pub gateway_api_key: Option<String>,
    pub pricing_url: String,
    pub max_concurrency: usize,
    pub call_timeout: Duration,
    pub audit_db: Option<PathBuf>,
    /// Models the gateway may route; `None` allows any.
    pub allowed_models: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            gateway_api_key: None,
            pricing_url: DEFAULT_PORTKEY_URL.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            audit_db: None,
            allowed_models: None,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let max_concurrency = match var("REPLAY_MAX_CONCURRENCY") {
            Some(raw) => parse_positive("REPLAY_MAX_CONCURRENCY", &raw)? as usize,
            None => defaults.max_concurrency,
        };
        let call_timeout = match var("REPLAY_CALL_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_positive("REPLAY_CALL_TIMEOUT_SECS", &raw)?),
            None => defaults.call_timeout,
        };

        Ok(Self {
            gateway_url: var("REPLAY_GATEWAY_URL").unwrap_or(defaults.gateway_url),
            gateway_api_key: var("REPLAY_GATEWAY_API_KEY"),
            pricing_url: var("REPLAY_PRICING_URL").unwrap_or(defaults.pricing_url),
            max_concurrency,
            call_timeout,
            audit_db: var("REPLAY_AUDIT_DB").map(PathBuf::from),
            allowed_models: var("REPLAY_ALLOWED_MODELS").map(|raw| {
                raw.split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect()
            }),
        })
    }
}

fn parse_positive(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let value: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: raw.to_string(),
        reason: "expected a whole number",
    })?;
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            name,
            value: raw.to_string(),
            reason: "must be at least 1",
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(load(&[]).unwrap(), Config::default());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("REPLAY_GATEWAY_URL", "https://gateway.internal/v1"),
            ("REPLAY_GATEWAY_API_KEY", "sk-test"),
            ("REPLAY_MAX_CONCURRENCY", "16"),
            ("REPLAY_CALL_TIMEOUT_SECS", " 5 "),
            ("REPLAY_AUDIT_DB", "/tmp/audit.db"),
            ("REPLAY_ALLOWED_MODELS", "gpt-4o, gpt-4o-mini,"),
        ])
        .unwrap();

        assert_eq!(config.gateway_url, "https://gateway.internal/v1");
        assert_eq!(config.gateway_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.max_concurrency, 16);
        assert_eq!(config.call_timeout, Duration::from_secs(5));
        assert_eq!(config.audit_db, Some(PathBuf::from("/tmp/audit.db")));
        assert_eq!(
            config.allowed_models,
            Some(vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()])
        );
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let err = load(&[("REPLAY_MAX_CONCURRENCY", "lots")]).unwrap_err();
        assert!(err.to_string().contains("REPLAY_MAX_CONCURRENCY"));
        assert!(load(&[("REPLAY_CALL_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = load(&[("REPLAY_GATEWAY_API_KEY", "  ")]).unwrap();
        assert!(config.gateway_api_key.is_none());
    }
}
