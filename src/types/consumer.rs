//! Consumer Types
//!
//! Third-party applications that tokens are issued to.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ValidationError;

/// Request signing method registered for a consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureMethod {
    /// HMAC-SHA1 with a shared consumer secret.
    HmacSha1,
    /// RSA-SHA1 with a registered public key.
    RsaSha1,
}

/// A registered third-party application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    key: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    signature_method: SignatureMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    callback: Option<Url>,
}

impl Consumer {
    /// Start building a consumer with the given key.
    pub fn builder(key: impl Into<String>) -> ConsumerBuilder {
        ConsumerBuilder::new(key.into())
    }

    /// Stable key identifying the consumer.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn signature_method(&self) -> SignatureMethod {
        self.signature_method
    }

    /// PEM encoded public key, present for RSA-SHA1 consumers.
    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    /// Default callback registered for the consumer.
    pub fn callback(&self) -> Option<&Url> {
        self.callback.as_ref()
    }
}

/// Builder for [`Consumer`].
#[derive(Debug)]
pub struct ConsumerBuilder {
    key: String,
    name: Option<String>,
    description: Option<String>,
    signature_method: SignatureMethod,
    public_key: Option<String>,
    callback: Option<Url>,
}

impl ConsumerBuilder {
    fn new(key: String) -> Self {
        Self {
            key,
            name: None,
            description: None,
            signature_method: SignatureMethod::HmacSha1,
            public_key: None,
            callback: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn signature_method(mut self, method: SignatureMethod) -> Self {
        self.signature_method = method;
        self
    }

    /// Set the public key. Switches the signature method to RSA-SHA1.
    pub fn public_key(mut self, pem: impl Into<String>) -> Self {
        self.signature_method = SignatureMethod::RsaSha1;
        self.public_key = Some(pem.into());
        self
    }

    pub fn callback(mut self, callback: Url) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn build(self) -> Result<Consumer, ValidationError> {
        if self.key.trim().is_empty() {
            return Err(ValidationError::missing("key"));
        }

        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ValidationError::missing("name"))?;

        if self.signature_method == SignatureMethod::RsaSha1 && self.public_key.is_none() {
            return Err(ValidationError::invalid(
                "publicKey must be set when the signature method is RSA-SHA1",
            ));
        }

        Ok(Consumer {
            key: self.key,
            name,
            description: self.description,
            signature_method: self.signature_method,
            public_key: self.public_key,
            callback: self.callback,
        })
    }
}
