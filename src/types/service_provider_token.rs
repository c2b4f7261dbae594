//! Service Provider Token
//!
//! Request and access tokens as held by the service provider.
//!
//! Tokens are immutable. State changes (`authorize`, `deny`) return a new
//! token that keeps the value, secret, consumer, timing, callback and
//! properties of the original; the caller replaces the stored token with it.
//!
//! ```rust,ignore
//! let request = ServiceProviderToken::new_request_token("bb6dd1391ce33b5bd3ecad1175139a39")
//!     .secret("29c3005cc5fbe5d431f27b29d6191ea3")
//!     .consumer(consumer)
//!     .build()?;
//!
//! let authorized = request.authorize("fred", "verifier")?;
//! ```

use serde::{Deserialize, Serialize};
use url::Url;

use crate::builders::ServiceProviderTokenBuilder;
use crate::core::Clock;
use crate::error::TransitionError;
use crate::types::{Consumer, Session, Token, TokenType};

/// Authorization status of a token.
///
/// Access tokens are always `Authorized`. Request tokens start as `None` and
/// move to `Authorized` or `Denied` exactly once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Authorization {
    /// The user has neither approved nor denied access.
    #[default]
    None,
    /// The user has approved access.
    Authorized,
    /// The user has denied access.
    Denied,
}

/// OAuth token issued by this service provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceProviderToken {
    pub(crate) token: Token,
    pub(crate) authorization: Authorization,
    pub(crate) user: Option<String>,
    pub(crate) verifier: Option<String>,
    pub(crate) creation_time: i64,
    pub(crate) time_to_live: i64,
    pub(crate) callback: Option<Url>,
    pub(crate) session: Option<Session>,
}

impl ServiceProviderToken {
    /// Start building a request token with the given value.
    pub fn new_request_token(value: impl Into<String>) -> ServiceProviderTokenBuilder {
        ServiceProviderTokenBuilder::new(TokenType::Request, value.into())
    }

    /// Start building an access token with the given value.
    pub fn new_access_token(value: impl Into<String>) -> ServiceProviderTokenBuilder {
        ServiceProviderTokenBuilder::new(TokenType::Access, value.into())
    }

    /// Authorize this request token on behalf of `user`.
    ///
    /// `verifier` proves that whoever swaps the token for an access token is
    /// the party that authorized it.
    pub fn authorize(
        &self,
        user: impl Into<String>,
        verifier: impl Into<String>,
    ) -> crate::error::ServiceProviderResult<ServiceProviderToken> {
        self.check_undecided()?;
        let token = self
            .rebuild()
            .authorized_by(user)
            .verifier(verifier)
            .build()?;
        Ok(token)
    }

    /// Deny this request token on behalf of `user`.
    pub fn deny(
        &self,
        user: impl Into<String>,
    ) -> crate::error::ServiceProviderResult<ServiceProviderToken> {
        self.check_undecided()?;
        let token = self.rebuild().denied_by(user).build()?;
        Ok(token)
    }

    fn check_undecided(&self) -> Result<(), TransitionError> {
        if !self.is_request_token() {
            return Err(TransitionError::NotRequestToken);
        }
        match self.authorization {
            Authorization::Authorized => Err(TransitionError::AlreadyAuthorized),
            Authorization::Denied => Err(TransitionError::AlreadyDenied),
            Authorization::None => Ok(()),
        }
    }

    fn rebuild(&self) -> ServiceProviderTokenBuilder {
        let mut builder = Self::new_request_token(self.value())
            .secret(self.secret())
            .properties(self.token.properties.clone())
            .creation_time(self.creation_time)
            .time_to_live(self.time_to_live)
            .unresolved_consumer_key(self.token.consumer_key.clone());
        if let Some(consumer) = &self.token.consumer {
            builder = builder.consumer(consumer.clone());
        }
        if let Some(callback) = &self.callback {
            builder = builder.callback(callback.clone());
        }
        builder
    }

    /// Base token fields.
    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn token_type(&self) -> TokenType {
        self.token.token_type
    }

    pub fn value(&self) -> &str {
        self.token.value()
    }

    pub fn secret(&self) -> &str {
        self.token.secret()
    }

    pub fn consumer(&self) -> Option<&Consumer> {
        self.token.consumer()
    }

    pub fn consumer_key(&self) -> Option<&str> {
        self.token.consumer_key()
    }

    pub fn is_request_token(&self) -> bool {
        self.token.is_request_token()
    }

    pub fn is_access_token(&self) -> bool {
        self.token.is_access_token()
    }

    pub fn authorization(&self) -> Authorization {
        self.authorization
    }

    /// Always `true` for access tokens.
    pub fn has_been_authorized(&self) -> bool {
        self.authorization == Authorization::Authorized
    }

    /// Always `false` for access tokens.
    pub fn has_been_denied(&self) -> bool {
        self.authorization == Authorization::Denied
    }

    /// User that authorized or denied a request token, or that an access
    /// token acts on behalf of.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn verifier(&self) -> Option<&str> {
        self.verifier.as_deref()
    }

    /// Epoch milliseconds the token was created.
    pub fn creation_time(&self) -> i64 {
        self.creation_time
    }

    /// Milliseconds after creation the token stays valid.
    pub fn time_to_live(&self) -> i64 {
        self.time_to_live
    }

    pub fn has_expired(&self, clock: &dyn Clock) -> bool {
        clock.now_millis().saturating_sub(self.creation_time) > self.time_to_live
    }

    /// Milliseconds until the token expires, zero once it has.
    pub fn remaining_lifetime(&self, clock: &dyn Clock) -> i64 {
        self.creation_time
            .saturating_add(self.time_to_live)
            .saturating_sub(clock.now_millis())
            .max(0)
    }

    /// Where the consumer is sent after authorization. `None` when the
    /// callback was agreed out-of-band.
    pub fn callback(&self) -> Option<&Url> {
        self.callback.as_ref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// `true` when the token carries a session that has expired.
    pub fn has_expired_session(&self, clock: &dyn Clock) -> bool {
        self.session
            .as_ref()
            .map(|session| session.has_expired(clock))
            .unwrap_or(false)
    }
}

/// Check a callback is absolute and uses http or https.
pub fn is_valid_callback(callback: &Url) -> bool {
    !callback.cannot_be_a_base() && matches!(callback.scheme(), "http" | "https")
}

impl std::fmt::Debug for ServiceProviderToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProviderToken")
            .field("token", &self.token)
            .field("authorization", &self.authorization)
            .field("user", &self.user)
            .field("verifier", &self.verifier.as_ref().map(|_| "[REDACTED]"))
            .field("creation_time", &self.creation_time)
            .field("time_to_live", &self.time_to_live)
            .field("callback", &self.callback.as_ref().map(Url::as_str))
            .field("session", &self.session)
            .finish()
    }
}
