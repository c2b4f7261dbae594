//! Configuration Builder
//!
//! Fluent builder for service provider configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigurationError, ServiceProviderError};
use crate::types::{ServiceProviderConfig, TokenLifetimes, SESSION_TTL_MARGIN_MS};

/// Service provider configuration builder.
#[derive(Default)]
pub struct ServiceProviderConfigBuilder {
    request_token_ttl_ms: Option<i64>,
    access_token_ttl_ms: Option<i64>,
    session_ttl_ms: Option<i64>,
    token_store_path: Option<PathBuf>,
    sweep_interval: Option<Duration>,
}

impl ServiceProviderConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing lifetimes (e.g. from [`TokenLifetimes::from_env`]).
    pub fn lifetimes(mut self, lifetimes: TokenLifetimes) -> Self {
        self.request_token_ttl_ms = Some(lifetimes.request_token_ttl_ms);
        self.access_token_ttl_ms = Some(lifetimes.access_token_ttl_ms);
        self.session_ttl_ms = Some(lifetimes.session_ttl_ms);
        self
    }

    /// Set request token time to live.
    pub fn request_token_ttl(mut self, ttl: Duration) -> Self {
        self.request_token_ttl_ms = Some(duration_ms(ttl));
        self
    }

    /// Set access token time to live.
    pub fn access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl_ms = Some(duration_ms(ttl));
        self
    }

    /// Set session time to live.
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl_ms = Some(duration_ms(ttl));
        self
    }

    /// Set the token store file.
    pub fn token_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_store_path = Some(path.into());
        self
    }

    /// Set the interval between expiry sweeps.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<ServiceProviderConfig, ServiceProviderError> {
        let defaults = ServiceProviderConfig::default();

        let access_token_ttl_ms = self
            .access_token_ttl_ms
            .unwrap_or(defaults.lifetimes.access_token_ttl_ms);
        let lifetimes = TokenLifetimes {
            request_token_ttl_ms: self
                .request_token_ttl_ms
                .unwrap_or(defaults.lifetimes.request_token_ttl_ms),
            access_token_ttl_ms,
            session_ttl_ms: self
                .session_ttl_ms
                .unwrap_or_else(|| access_token_ttl_ms.saturating_add(SESSION_TTL_MARGIN_MS)),
        };
        lifetimes.validate()?;

        if lifetimes.session_ttl_ms <= lifetimes.access_token_ttl_ms {
            tracing::warn!(
                session_ttl_ms = lifetimes.session_ttl_ms,
                access_token_ttl_ms = lifetimes.access_token_ttl_ms,
                "Session TTL does not outlive the access token TTL; sessions may expire before their tokens"
            );
        }

        let sweep_interval = self.sweep_interval.unwrap_or(defaults.sweep_interval);
        if sweep_interval.is_zero() {
            return Err(ConfigurationError::InvalidValue {
                name: "sweep_interval".to_string(),
                value: "0s".to_string(),
            }
            .into());
        }

        let token_store_path = self.token_store_path.unwrap_or(defaults.token_store_path);
        if token_store_path.as_os_str().is_empty() {
            return Err(ConfigurationError::MissingRequired {
                field: "token_store_path".to_string(),
            }
            .into());
        }

        Ok(ServiceProviderConfig {
            lifetimes,
            token_store_path,
            sweep_interval,
        })
    }
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Create a new service provider configuration builder.
pub fn service_provider_config() -> ServiceProviderConfigBuilder {
    ServiceProviderConfigBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DEFAULT_REQUEST_TOKEN_TTL_MS, DEFAULT_SWEEP_INTERVAL};

    #[test]
    fn test_builder_defaults() {
        let config = service_provider_config().build().unwrap();
        assert_eq!(config, ServiceProviderConfig::default());
    }

    #[test]
    fn test_builder_overrides() {
        let config = service_provider_config()
            .request_token_ttl(Duration::from_secs(60))
            .access_token_ttl(Duration::from_secs(3600))
            .token_store_path("/var/lib/oauth/tokens.json")
            .sweep_interval(Duration::from_secs(30))
            .build()
            .unwrap();

        assert_eq!(config.lifetimes.request_token_ttl_ms, 60_000);
        assert_eq!(config.lifetimes.access_token_ttl_ms, 3_600_000);
        assert_eq!(
            config.lifetimes.session_ttl_ms,
            3_600_000 + SESSION_TTL_MARGIN_MS
        );
        assert_eq!(config.token_store_path, PathBuf::from("/var/lib/oauth/tokens.json"));
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_builder_from_lifetimes() {
        let lifetimes = TokenLifetimes {
            request_token_ttl_ms: 1,
            access_token_ttl_ms: 2,
            session_ttl_ms: 3,
        };
        let config = service_provider_config().lifetimes(lifetimes).build().unwrap();
        assert_eq!(config.lifetimes, lifetimes);
        assert_eq!(config.sweep_interval, DEFAULT_SWEEP_INTERVAL);
    }

    #[test]
    fn test_builder_rejects_zero_ttl() {
        let result = service_provider_config()
            .request_token_ttl(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(ServiceProviderError::Configuration(_))));
    }

    #[test]
    fn test_builder_rejects_zero_sweep_interval() {
        let result = service_provider_config()
            .sweep_interval(Duration::ZERO)
            .build();
        assert!(result.is_err());
        assert_eq!(
            service_provider_config().build().unwrap().lifetimes.request_token_ttl_ms,
            DEFAULT_REQUEST_TOKEN_TTL_MS
        );
    }
}
