//! Configuration Types
//!
//! Token lifetime defaults and store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigurationError;

/// Default request token time to live: 10 minutes.
pub const DEFAULT_REQUEST_TOKEN_TTL_MS: i64 = 10 * 60 * 1000;

/// Default access token time to live: 5 years.
pub const DEFAULT_ACCESS_TOKEN_TTL_MS: i64 = 5 * 365 * 24 * 60 * 60 * 1000;

/// Margin a session outlives its access token by: 30 days.
pub const SESSION_TTL_MARGIN_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Default session time to live.
pub const DEFAULT_SESSION_TTL_MS: i64 = DEFAULT_ACCESS_TOKEN_TTL_MS + SESSION_TTL_MARGIN_MS;

/// Default interval between expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default token store file name.
pub const DEFAULT_TOKEN_STORE_FILE: &str = "oauth-tokens.json";

pub const REQUEST_TOKEN_TTL_ENV: &str = "OAUTH_REQUEST_TOKEN_TTL_MS";
pub const ACCESS_TOKEN_TTL_ENV: &str = "OAUTH_ACCESS_TOKEN_TTL_MS";
pub const SESSION_TTL_ENV: &str = "OAUTH_SESSION_TTL_MS";

/// Default lifetimes applied to tokens and sessions, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenLifetimes {
    /// Request token time to live.
    pub request_token_ttl_ms: i64,
    /// Access token time to live.
    pub access_token_ttl_ms: i64,
    /// Session time to live, measured from the last renewal.
    pub session_ttl_ms: i64,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            request_token_ttl_ms: DEFAULT_REQUEST_TOKEN_TTL_MS,
            access_token_ttl_ms: DEFAULT_ACCESS_TOKEN_TTL_MS,
            session_ttl_ms: DEFAULT_SESSION_TTL_MS,
        }
    }
}

impl TokenLifetimes {
    /// Load lifetimes from `OAUTH_*_TTL_MS` environment variables.
    ///
    /// Unset variables keep their defaults. If the access token TTL is set but
    /// the session TTL is not, the session TTL follows the access TTL plus the
    /// 30 day margin.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load lifetimes from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let request_token_ttl_ms = parse_positive(REQUEST_TOKEN_TTL_ENV, lookup(REQUEST_TOKEN_TTL_ENV))?
            .unwrap_or(defaults.request_token_ttl_ms);
        let access_token_ttl_ms = parse_positive(ACCESS_TOKEN_TTL_ENV, lookup(ACCESS_TOKEN_TTL_ENV))?
            .unwrap_or(defaults.access_token_ttl_ms);
        let session_ttl_ms = match parse_positive(SESSION_TTL_ENV, lookup(SESSION_TTL_ENV))? {
            Some(ttl) => ttl,
            None => access_token_ttl_ms.saturating_add(SESSION_TTL_MARGIN_MS),
        };

        let lifetimes = Self {
            request_token_ttl_ms,
            access_token_ttl_ms,
            session_ttl_ms,
        };
        lifetimes.validate()?;
        Ok(lifetimes)
    }

    /// Check every lifetime is positive.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("request_token_ttl_ms", self.request_token_ttl_ms),
            ("access_token_ttl_ms", self.access_token_ttl_ms),
            ("session_ttl_ms", self.session_ttl_ms),
        ] {
            if value <= 0 {
                return Err(ConfigurationError::InvalidValue {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse_positive(name: &str, raw: Option<String>) -> Result<Option<i64>, ConfigurationError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ConfigurationError::InvalidValue {
            name: name.to_string(),
            value: raw,
        }),
    }
}

/// Service provider token subsystem configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProviderConfig {
    /// Default token and session lifetimes.
    pub lifetimes: TokenLifetimes,
    /// File the token store persists to.
    pub token_store_path: PathBuf,
    /// Interval between expiry sweeps.
    pub sweep_interval: Duration,
}

impl Default for ServiceProviderConfig {
    fn default() -> Self {
        Self {
            lifetimes: TokenLifetimes::default(),
            token_store_path: PathBuf::from(DEFAULT_TOKEN_STORE_FILE),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let lifetimes = TokenLifetimes::default();
        assert_eq!(lifetimes.request_token_ttl_ms, 600_000);
        assert_eq!(lifetimes.access_token_ttl_ms, 157_680_000_000);
        assert_eq!(
            lifetimes.session_ttl_ms,
            lifetimes.access_token_ttl_ms + 2_592_000_000
        );
    }

    #[test]
    fn test_lookup_overrides() {
        let lifetimes = TokenLifetimes::from_lookup(lookup_from(&[
            (REQUEST_TOKEN_TTL_ENV, "1000"),
            (SESSION_TTL_ENV, "5000"),
        ]))
        .unwrap();

        assert_eq!(lifetimes.request_token_ttl_ms, 1000);
        assert_eq!(lifetimes.access_token_ttl_ms, DEFAULT_ACCESS_TOKEN_TTL_MS);
        assert_eq!(lifetimes.session_ttl_ms, 5000);
    }

    #[test]
    fn test_session_follows_access_override() {
        let lifetimes =
            TokenLifetimes::from_lookup(lookup_from(&[(ACCESS_TOKEN_TTL_ENV, "60000")])).unwrap();

        assert_eq!(lifetimes.access_token_ttl_ms, 60_000);
        assert_eq!(lifetimes.session_ttl_ms, 60_000 + SESSION_TTL_MARGIN_MS);
    }

    #[test]
    fn test_rejects_non_positive_values() {
        let result = TokenLifetimes::from_lookup(lookup_from(&[(REQUEST_TOKEN_TTL_ENV, "0")]));
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidValue { ref name, .. }) if name == REQUEST_TOKEN_TTL_ENV
        ));

        let result = TokenLifetimes::from_lookup(lookup_from(&[(ACCESS_TOKEN_TTL_ENV, "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let lifetimes: TokenLifetimes =
            serde_json::from_str(r#"{"request_token_ttl_ms": 42}"#).unwrap();
        assert_eq!(lifetimes.request_token_ttl_ms, 42);
        assert_eq!(lifetimes.session_ttl_ms, DEFAULT_SESSION_TTL_MS);
    }
}
