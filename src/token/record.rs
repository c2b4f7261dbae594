//! Token Records
//!
//! Persisted shape of a token and its conversion across the encryption
//! boundary. Token values, secrets, verifiers and session handles are
//! encrypted; the remaining fields are stored in the clear.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

use crate::core::{decrypt_field, encrypt_field, ConsumerStore, SecretCipher};
use crate::error::StorageError;
use crate::types::{Authorization, ServiceProviderToken, Session};

/// Persisted token. Unknown fields are ignored when reading.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub is_access_token: bool,
    /// Encrypted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_value: Option<String>,
    /// Encrypted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_key: Option<String>,
    #[serde(default)]
    pub authorization: Authorization,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Encrypted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionRecord>,
}

/// Persisted session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Encrypted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_renewal_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<i64>,
}

/// Converts tokens to records and back.
#[derive(Clone)]
pub struct TokenRecordCodec {
    cipher: Arc<dyn SecretCipher>,
    consumers: Arc<dyn ConsumerStore>,
}

impl TokenRecordCodec {
    pub fn new(cipher: Arc<dyn SecretCipher>, consumers: Arc<dyn ConsumerStore>) -> Self {
        Self { cipher, consumers }
    }

    /// Convert a token into its persisted form.
    pub fn encode(&self, token: &ServiceProviderToken) -> Result<TokenRecord, StorageError> {
        let cipher = self.cipher.as_ref();

        let session = match token.session() {
            Some(session) => Some(SessionRecord {
                handle: encrypt_field(cipher, Some(session.handle()))?,
                creation_time: Some(session.creation_time()),
                last_renewal_time: Some(session.last_renewal_time()),
                time_to_live: Some(session.time_to_live()),
            }),
            None => None,
        };

        let properties = token.token().properties();

        Ok(TokenRecord {
            is_access_token: token.is_access_token(),
            token_value: encrypt_field(cipher, Some(token.value()))?,
            token_secret: encrypt_field(cipher, Some(token.secret()))?,
            consumer_key: token.consumer_key().map(str::to_string),
            authorization: token.authorization(),
            user: token.user().map(str::to_string),
            verifier: encrypt_field(cipher, token.verifier())?,
            callback: token.callback().map(|url| url.to_string()),
            creation_time: Some(token.creation_time()),
            time_to_live: Some(token.time_to_live()),
            properties: (!properties.is_empty()).then(|| properties.clone()),
            session,
        })
    }

    /// Rebuild a token from its persisted form.
    ///
    /// Fails on anything that cannot round-trip: missing value or secret,
    /// undecryptable fields, or a record that breaks the token invariants. A
    /// session without a handle is dropped. A consumer that is no longer
    /// registered leaves the token without a consumer but with its key, so
    /// it can still be removed by consumer.
    pub fn decode(&self, record: &TokenRecord) -> Result<ServiceProviderToken, StorageError> {
        let cipher = self.cipher.as_ref();

        let value = decrypt_field(cipher, record.token_value.as_deref())?
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| StorageError::corrupted("token record is missing its value"))?;
        let secret = decrypt_field(cipher, record.token_secret.as_deref())?
            .filter(|secret| !secret.trim().is_empty())
            .ok_or_else(|| StorageError::corrupted("token record is missing its secret"))?;
        let verifier = decrypt_field(cipher, record.verifier.as_deref())?;

        let creation_time = record
            .creation_time
            .ok_or_else(|| StorageError::corrupted("token record is missing its creation time"))?;
        let time_to_live = record
            .time_to_live
            .ok_or_else(|| StorageError::corrupted("token record is missing its time to live"))?;

        let callback = match &record.callback {
            Some(raw) => Some(Url::parse(raw).map_err(|e| {
                StorageError::corrupted(format!("token record has an invalid callback: {}", e))
            })?),
            None => None,
        };

        let consumer = match &record.consumer_key {
            Some(key) => {
                let consumer = self.consumers.get(key)?;
                if consumer.is_none() {
                    tracing::warn!(
                        consumer_key = key.as_str(),
                        "Stored token belongs to a consumer that is no longer registered"
                    );
                }
                consumer
            }
            None => None,
        };

        let session = match &record.session {
            Some(session) => self.decode_session(session)?,
            None => None,
        };

        let mut builder = if record.is_access_token {
            ServiceProviderToken::new_access_token(value)
        } else {
            ServiceProviderToken::new_request_token(value)
        }
        .secret(secret)
        .authorization(record.authorization)
        .user(record.user.clone())
        .maybe_verifier(verifier)
        .maybe_callback(callback)
        .maybe_session(session)
        .creation_time(creation_time)
        .time_to_live(time_to_live)
        .properties(record.properties.clone().unwrap_or_default())
        .unresolved_consumer_key(record.consumer_key.clone());
        if let Some(consumer) = consumer {
            builder = builder.consumer(consumer);
        }

        builder
            .build()
            .map_err(|e| StorageError::corrupted(format!("token record is invalid: {}", e)))
    }

    fn decode_session(&self, record: &SessionRecord) -> Result<Option<Session>, StorageError> {
        let handle = decrypt_field(self.cipher.as_ref(), record.handle.as_deref())?
            .filter(|handle| !handle.trim().is_empty());
        let Some(handle) = handle else {
            tracing::debug!("Dropping persisted session without a handle");
            return Ok(None);
        };

        let mut builder = Session::builder(handle);
        if let Some(creation_time) = record.creation_time {
            builder = builder.creation_time(creation_time);
        }
        if let Some(last_renewal_time) = record.last_renewal_time {
            builder = builder.last_renewal_time(last_renewal_time);
        }
        if let Some(time_to_live) = record.time_to_live {
            builder = builder.time_to_live(time_to_live);
        }

        builder
            .build()
            .map(Some)
            .map_err(|e| StorageError::corrupted(format!("session record is invalid: {}", e)))
    }
}
