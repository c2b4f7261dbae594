//! Token Types
//!
//! Fields shared by request and access tokens.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::Consumer;

/// Kind of token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    /// Short-lived token exchanged for an access token once authorized.
    Request,
    /// Long-lived token acting on behalf of a user.
    Access,
}

/// Base token value.
///
/// Holds the opaque token value, the shared secret used when signing, the
/// consumer the token was issued to and caller-defined properties. Never
/// mutated after construction.
///
/// The consumer key is kept even when the consumer itself could not be
/// resolved, so tokens of a deregistered consumer can still be found and
/// removed.
#[derive(Clone)]
pub struct Token {
    pub(crate) token_type: TokenType,
    pub(crate) value: String,
    pub(crate) secret: SecretString,
    pub(crate) consumer: Option<Consumer>,
    pub(crate) consumer_key: Option<String>,
    pub(crate) properties: HashMap<String, String>,
}

impl Token {
    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    /// Opaque value identifying the token.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Shared secret (for signing).
    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }

    /// Consumer the token was issued to.
    pub fn consumer(&self) -> Option<&Consumer> {
        self.consumer.as_ref()
    }

    /// Key of the consumer the token was issued to. Present even when
    /// [`Token::consumer`] is not.
    pub fn consumer_key(&self) -> Option<&str> {
        self.consumer
            .as_ref()
            .map(Consumer::key)
            .or(self.consumer_key.as_deref())
    }

    pub fn is_request_token(&self) -> bool {
        self.token_type == TokenType::Request
    }

    pub fn is_access_token(&self) -> bool {
        self.token_type == TokenType::Access
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.token_type == other.token_type
            && self.value == other.value
            && self.secret.expose_secret() == other.secret.expose_secret()
            && self.consumer == other.consumer
            && self.consumer_key() == other.consumer_key()
            && self.properties == other.properties
    }
}

impl Eq for Token {}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("token_type", &self.token_type)
            .field("value", &token_fingerprint(&self.value))
            .field("secret", &"[REDACTED]")
            .field("consumer", &self.consumer_key())
            .field("properties", &self.properties)
            .finish()
    }
}

/// Short prefix of a token value, safe to log.
pub fn token_fingerprint(value: &str) -> String {
    let prefix: String = value.chars().take(8).collect();
    format!("{}...", prefix)
}
