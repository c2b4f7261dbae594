//! Builders
//!
//! Fluent builder patterns for tokens, sessions and configuration.

pub mod config;
pub mod token;

pub use config::{service_provider_config, ServiceProviderConfigBuilder};
pub use token::{ServiceProviderTokenBuilder, SessionBuilder};
