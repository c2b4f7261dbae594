//! Token Builders
//!
//! Fluent builders for service provider tokens and sessions.

use secrecy::SecretString;
use std::collections::HashMap;
use url::Url;

use crate::core::{Clock, SystemClock};
use crate::error::ValidationError;
use crate::types::{
    is_valid_callback, Authorization, Consumer, ServiceProviderToken, Session, Token,
    TokenLifetimes, TokenType,
};

/// Builder for [`ServiceProviderToken`].
///
/// Obtained from [`ServiceProviderToken::new_request_token`] or
/// [`ServiceProviderToken::new_access_token`]. Defaults depend on the token
/// type: request tokens start unauthorized with the request TTL, access tokens
/// are always authorized and get the access TTL. The creation time is stamped
/// at build time unless set explicitly.
pub struct ServiceProviderTokenBuilder {
    token_type: TokenType,
    value: String,
    secret: Option<String>,
    consumer: Option<Consumer>,
    consumer_key: Option<String>,
    properties: HashMap<String, String>,
    authorization: Authorization,
    user: Option<String>,
    verifier: Option<String>,
    creation_time: Option<i64>,
    time_to_live: Option<i64>,
    lifetimes: TokenLifetimes,
    callback: Option<Url>,
    unparsed_callback: Option<String>,
    session: Option<Session>,
}

impl ServiceProviderTokenBuilder {
    pub(crate) fn new(token_type: TokenType, value: String) -> Self {
        let authorization = match token_type {
            TokenType::Access => Authorization::Authorized,
            TokenType::Request => Authorization::None,
        };
        Self {
            token_type,
            value,
            secret: None,
            consumer: None,
            consumer_key: None,
            properties: HashMap::new(),
            authorization,
            user: None,
            verifier: None,
            creation_time: None,
            time_to_live: None,
            lifetimes: TokenLifetimes::default(),
            callback: None,
            unparsed_callback: None,
            session: None,
        }
    }

    /// Set the shared secret.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Set the consumer the token is issued to.
    pub fn consumer(mut self, consumer: Consumer) -> Self {
        self.consumer = Some(consumer);
        self
    }

    /// Key of a consumer that is no longer registered. Ignored when a
    /// consumer is set.
    pub(crate) fn unresolved_consumer_key(mut self, consumer_key: Option<String>) -> Self {
        self.consumer_key = consumer_key;
        self
    }

    /// Replace all properties.
    pub fn properties(mut self, properties: HashMap<String, String>) -> Self {
        self.properties = properties;
        self
    }

    /// Add a single property.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Mark the token as authorized by `user`.
    pub fn authorized_by(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.authorization = Authorization::Authorized;
        self
    }

    /// Mark the token as denied by `user`.
    pub fn denied_by(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.authorization = Authorization::Denied;
        self
    }

    /// Set the verifier binding authorization to the token exchange.
    pub fn verifier(mut self, verifier: impl Into<String>) -> Self {
        self.verifier = Some(verifier.into());
        self
    }

    pub(crate) fn authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = authorization;
        self
    }

    pub(crate) fn user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    pub(crate) fn maybe_verifier(mut self, verifier: Option<String>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Set the creation time in epoch milliseconds.
    pub fn creation_time(mut self, creation_time: i64) -> Self {
        self.creation_time = Some(creation_time);
        self
    }

    /// Set the time to live in milliseconds.
    pub fn time_to_live(mut self, time_to_live: i64) -> Self {
        self.time_to_live = Some(time_to_live);
        self
    }

    /// Use these lifetimes for the default TTL.
    pub fn lifetimes(mut self, lifetimes: TokenLifetimes) -> Self {
        self.lifetimes = lifetimes;
        self
    }

    /// Set the callback.
    pub fn callback(mut self, callback: Url) -> Self {
        self.callback = Some(callback);
        self.unparsed_callback = None;
        self
    }

    /// Set the callback from a string, parsed at build time.
    pub fn callback_str(mut self, callback: impl Into<String>) -> Self {
        self.callback = None;
        self.unparsed_callback = Some(callback.into());
        self
    }

    pub(crate) fn maybe_callback(mut self, callback: Option<Url>) -> Self {
        self.callback = callback;
        self.unparsed_callback = None;
        self
    }

    /// Attach a session.
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub(crate) fn maybe_session(mut self, session: Option<Session>) -> Self {
        self.session = session;
        self
    }

    /// Build the token, stamping the creation time from the system clock if
    /// it was not set.
    pub fn build(self) -> Result<ServiceProviderToken, ValidationError> {
        self.build_with_clock(&SystemClock)
    }

    /// Build the token, stamping the creation time from `clock` if it was not
    /// set.
    pub fn build_with_clock(self, clock: &dyn Clock) -> Result<ServiceProviderToken, ValidationError> {
        if self.value.trim().is_empty() {
            return Err(ValidationError::missing("token"));
        }

        let secret = self
            .secret
            .filter(|secret| !secret.trim().is_empty())
            .ok_or_else(|| ValidationError::missing("secret"))?;

        let callback = match (self.callback, self.unparsed_callback) {
            (Some(callback), _) => Some(callback),
            (None, Some(raw)) => Some(Url::parse(&raw).map_err(|_| {
                ValidationError::invalid(format!("callback '{}' is not an absolute URI", raw))
            })?),
            (None, None) => None,
        };
        if let Some(callback) = &callback {
            if !is_valid_callback(callback) {
                return Err(ValidationError::invalid(
                    "callback must be null or a valid, absolute URI using either the http or https scheme",
                ));
            }
        }

        let user_is_blank = self.user.as_deref().map_or(true, |u| u.trim().is_empty());
        let verifier_is_blank = self.verifier.as_deref().map_or(true, |v| v.trim().is_empty());

        match self.token_type {
            TokenType::Access => {
                if self.authorization != Authorization::Authorized {
                    return Err(ValidationError::invalid("access tokens are always authorized"));
                }
                if user_is_blank {
                    return Err(ValidationError::invalid("user must be set for access tokens"));
                }
            }
            TokenType::Request => match self.authorization {
                Authorization::Authorized if user_is_blank => {
                    return Err(ValidationError::invalid(
                        "user must be set if the request token has been authorized",
                    ));
                }
                Authorization::Authorized if verifier_is_blank => {
                    return Err(ValidationError::invalid(
                        "verifier MUST NOT be blank if the request token has been authorized",
                    ));
                }
                Authorization::Denied if user_is_blank => {
                    return Err(ValidationError::invalid(
                        "user must be set if the request token has been denied",
                    ));
                }
                _ => {}
            },
        }

        let time_to_live = self.time_to_live.unwrap_or(match self.token_type {
            TokenType::Request => self.lifetimes.request_token_ttl_ms,
            TokenType::Access => self.lifetimes.access_token_ttl_ms,
        });
        if time_to_live < 0 {
            return Err(ValidationError::invalid("timeToLive must not be negative"));
        }

        let creation_time = self.creation_time.unwrap_or_else(|| clock.now_millis());
        if creation_time < 0 {
            return Err(ValidationError::invalid("creationTime must not be negative"));
        }

        let consumer_key = match &self.consumer {
            Some(consumer) => Some(consumer.key().to_string()),
            None => self.consumer_key,
        };

        Ok(ServiceProviderToken {
            token: Token {
                token_type: self.token_type,
                value: self.value,
                secret: SecretString::new(secret),
                consumer: self.consumer,
                consumer_key,
                properties: self.properties,
            },
            authorization: self.authorization,
            user: self.user,
            verifier: self.verifier,
            creation_time,
            time_to_live,
            callback,
            session: self.session,
        })
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    handle: String,
    creation_time: Option<i64>,
    last_renewal_time: Option<i64>,
    time_to_live: Option<i64>,
    lifetimes: TokenLifetimes,
}

impl SessionBuilder {
    pub(crate) fn new(handle: String) -> Self {
        Self {
            handle,
            creation_time: None,
            last_renewal_time: None,
            time_to_live: None,
            lifetimes: TokenLifetimes::default(),
        }
    }

    /// Set when the session was first created.
    pub fn creation_time(mut self, creation_time: i64) -> Self {
        self.creation_time = Some(creation_time);
        self
    }

    /// Set when the session was last renewed.
    pub fn last_renewal_time(mut self, last_renewal_time: i64) -> Self {
        self.last_renewal_time = Some(last_renewal_time);
        self
    }

    /// Set how long the session stays valid after a renewal.
    pub fn time_to_live(mut self, time_to_live: i64) -> Self {
        self.time_to_live = Some(time_to_live);
        self
    }

    /// Use these lifetimes for the default TTL.
    pub fn lifetimes(mut self, lifetimes: TokenLifetimes) -> Self {
        self.lifetimes = lifetimes;
        self
    }

    pub fn build(self) -> Result<Session, ValidationError> {
        self.build_with_clock(&SystemClock)
    }

    /// Build the session. Creation time defaults to now and the last renewal
    /// time defaults to the creation time.
    pub fn build_with_clock(self, clock: &dyn Clock) -> Result<Session, ValidationError> {
        if self.handle.trim().is_empty() {
            return Err(ValidationError::missing("handle"));
        }

        let time_to_live = self.time_to_live.unwrap_or(self.lifetimes.session_ttl_ms);
        if time_to_live < 0 {
            return Err(ValidationError::invalid("timeToLive must not be negative"));
        }

        let creation_time = self.creation_time.unwrap_or_else(|| clock.now_millis());
        let last_renewal_time = self.last_renewal_time.unwrap_or(creation_time);
        if creation_time < 0 || last_renewal_time < 0 {
            return Err(ValidationError::invalid(
                "session creationTime and lastRenewalTime must not be negative",
            ));
        }

        Ok(Session {
            handle: self.handle,
            creation_time,
            last_renewal_time,
            time_to_live,
        })
    }
}
