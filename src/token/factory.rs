//! Token Factory
//!
//! Issues request tokens and exchanges authorized request tokens for access
//! tokens. The factory holds no mutable state and never touches the store.

use std::sync::Arc;
use url::Url;

use crate::core::{Clock, Randomizer, SecureRandomizer, SystemClock};
use crate::error::{ServiceProviderResult, TokenError, ValidationError};
use crate::telemetry::{Logger, TokenLogContext, TracingLogger};
use crate::types::{Consumer, ServiceProviderToken, Session, TokenLifetimes};

/// Random bytes behind each secret and session handle.
pub const SECRET_BYTE_LENGTH: usize = 80;

/// Token factory interface.
pub trait ServiceProviderTokenFactory: Send + Sync {
    /// Issue a new unauthorized request token for `consumer`.
    fn generate_request_token(
        &self,
        consumer: &Consumer,
        callback: Option<Url>,
    ) -> ServiceProviderResult<ServiceProviderToken>;

    /// Exchange an authorized request token for an access token.
    ///
    /// Also used to renew an access token's session: if `request_token`
    /// carries a session, the new session keeps its creation time.
    fn generate_access_token(
        &self,
        request_token: &ServiceProviderToken,
    ) -> ServiceProviderResult<ServiceProviderToken>;
}

/// Factory generating token values, secrets and session handles from a
/// [`Randomizer`].
pub struct RandomValueTokenFactory {
    randomizer: Arc<dyn Randomizer>,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
    lifetimes: TokenLifetimes,
}

impl RandomValueTokenFactory {
    pub fn new(
        randomizer: Arc<dyn Randomizer>,
        clock: Arc<dyn Clock>,
        logger: Arc<dyn Logger>,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            randomizer,
            clock,
            logger,
            lifetimes,
        }
    }

    pub fn lifetimes(&self) -> &TokenLifetimes {
        &self.lifetimes
    }

    fn generate_secret(&self) -> String {
        self.randomizer.random_url_safe_string(SECRET_BYTE_LENGTH)
    }

    fn check_exchangeable(&self, token: &ServiceProviderToken) -> Result<(), TokenError> {
        if !token.is_request_token() {
            return Err(TokenError::NotRequestToken);
        }
        let has_user = token.user().map_or(false, |user| !user.trim().is_empty());
        let has_verifier = token
            .verifier()
            .map_or(false, |verifier| !verifier.trim().is_empty());
        if !token.has_been_authorized() || !has_user || !has_verifier {
            return Err(TokenError::NotAuthorized);
        }
        Ok(())
    }

    fn new_session(&self, previous: Option<&Session>) -> Result<Session, ValidationError> {
        let handle = self.generate_secret();
        match previous {
            Some(previous) => previous.renew(handle, self.clock.as_ref()),
            None => Session::builder(handle)
                .lifetimes(self.lifetimes)
                .build_with_clock(self.clock.as_ref()),
        }
    }
}

impl Default for RandomValueTokenFactory {
    fn default() -> Self {
        Self::new(
            Arc::new(SecureRandomizer),
            Arc::new(SystemClock),
            Arc::new(TracingLogger),
            TokenLifetimes::default(),
        )
    }
}

impl ServiceProviderTokenFactory for RandomValueTokenFactory {
    fn generate_request_token(
        &self,
        consumer: &Consumer,
        callback: Option<Url>,
    ) -> ServiceProviderResult<ServiceProviderToken> {
        if consumer.key().trim().is_empty() {
            return Err(ValidationError::missing("consumer").into());
        }

        let mut builder = ServiceProviderToken::new_request_token(self.randomizer.random_identifier())
            .secret(self.generate_secret())
            .consumer(consumer.clone())
            .lifetimes(self.lifetimes);
        if let Some(callback) = callback {
            builder = builder.callback(callback);
        }
        let token = builder.build_with_clock(self.clock.as_ref())?;

        self.logger.debug(
            "Generated request token",
            &TokenLogContext::new()
                .operation("generate_request_token")
                .consumer_key(consumer.key())
                .token(token.value()),
        );
        Ok(token)
    }

    fn generate_access_token(
        &self,
        request_token: &ServiceProviderToken,
    ) -> ServiceProviderResult<ServiceProviderToken> {
        let mut context = TokenLogContext::new()
            .operation("generate_access_token")
            .token(request_token.value());
        if let Some(consumer_key) = request_token.consumer_key() {
            context = context.consumer_key(consumer_key);
        }

        if let Err(e) = self.check_exchangeable(request_token) {
            self.logger
                .warn(&format!("Refusing to issue access token: {}", e), &context);
            return Err(e.into());
        }

        let session = self.new_session(request_token.session())?;
        let user = request_token.user().unwrap_or_default();

        let mut builder = ServiceProviderToken::new_access_token(self.randomizer.random_identifier())
            .secret(self.generate_secret())
            .authorized_by(user)
            .maybe_verifier(request_token.verifier().map(str::to_string))
            .maybe_callback(request_token.callback().cloned())
            .lifetimes(self.lifetimes)
            .session(session)
            .unresolved_consumer_key(request_token.consumer_key().map(str::to_string));
        if let Some(consumer) = request_token.consumer() {
            builder = builder.consumer(consumer.clone());
        }
        let token = builder.build_with_clock(self.clock.as_ref())?;

        self.logger.debug(
            "Generated access token",
            &context.user(user).extra("renewal", request_token.has_session()),
        );
        Ok(token)
    }
}

/// Create a factory using the system clock, secure randomness and the given
/// lifetimes.
pub fn create_token_factory(lifetimes: TokenLifetimes) -> RandomValueTokenFactory {
    RandomValueTokenFactory::new(
        Arc::new(SecureRandomizer),
        Arc::new(SystemClock),
        Arc::new(TracingLogger),
        lifetimes,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{is_url_safe, MockClock, MockRandomizer};
    use crate::error::ServiceProviderError;
    use crate::telemetry::{InMemoryLogger, LogLevel};
    use crate::types::{Authorization, DEFAULT_ACCESS_TOKEN_TTL_MS, DEFAULT_REQUEST_TOKEN_TTL_MS};

    const NOW: i64 = 1_700_000_000_000;

    struct Fixture {
        factory: RandomValueTokenFactory,
        clock: Arc<MockClock>,
        logger: Arc<InMemoryLogger>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(MockClock::new(NOW));
        let logger = Arc::new(InMemoryLogger::new());
        let factory = RandomValueTokenFactory::new(
            Arc::new(SecureRandomizer),
            clock.clone(),
            logger.clone(),
            TokenLifetimes::default(),
        );
        Fixture {
            factory,
            clock,
            logger,
        }
    }

    fn consumer() -> Consumer {
        Consumer::builder("consumer-x").name("Consumer X").build().unwrap()
    }

    #[test]
    fn test_generate_request_token() {
        let f = fixture();
        let callback = Url::parse("https://consumer.example.com/cb").unwrap();
        let token = f
            .factory
            .generate_request_token(&consumer(), Some(callback.clone()))
            .unwrap();

        assert!(token.is_request_token());
        assert_eq!(token.authorization(), Authorization::None);
        assert_eq!(token.consumer(), Some(&consumer()));
        assert_eq!(token.callback(), Some(&callback));
        assert_eq!(token.creation_time(), NOW);
        assert_eq!(token.time_to_live(), DEFAULT_REQUEST_TOKEN_TTL_MS);
        assert!(!token.has_expired(f.clock.as_ref()));
        assert!(uuid::Uuid::parse_str(token.value()).is_ok());
    }

    #[test]
    fn test_secret_has_80_bytes_of_entropy() {
        let f = fixture();
        let token = f.factory.generate_request_token(&consumer(), None).unwrap();

        assert_eq!(token.secret().len(), 107);
        assert!(is_url_safe(token.secret()));
    }

    #[test]
    fn test_generated_values_are_unique() {
        let f = fixture();
        let a = f.factory.generate_request_token(&consumer(), None).unwrap();
        let b = f.factory.generate_request_token(&consumer(), None).unwrap();

        assert_ne!(a.value(), b.value());
        assert_ne!(a.secret(), b.secret());
    }

    #[test]
    fn test_generate_access_token() {
        let f = fixture();
        let request = f
            .factory
            .generate_request_token(
                &consumer(),
                Some(Url::parse("https://consumer.example.com/cb").unwrap()),
            )
            .unwrap()
            .authorize("alice", "v1")
            .unwrap();

        f.clock.advance(1_000);
        let access = f.factory.generate_access_token(&request).unwrap();

        assert!(access.is_access_token());
        assert!(access.has_been_authorized());
        assert_eq!(access.user(), Some("alice"));
        assert_eq!(access.verifier(), Some("v1"));
        assert_eq!(access.consumer(), request.consumer());
        assert_eq!(access.callback(), request.callback());
        assert_ne!(access.value(), request.value());
        assert_ne!(access.secret(), request.secret());
        assert_eq!(access.creation_time(), NOW + 1_000);
        assert_eq!(access.time_to_live(), DEFAULT_ACCESS_TOKEN_TTL_MS);

        let session = access.session().unwrap();
        assert_eq!(session.creation_time(), NOW + 1_000);
        assert_eq!(session.last_renewal_time(), session.creation_time());
        assert_eq!(session.handle().len(), 107);
    }

    #[test]
    fn test_renewal_keeps_session_creation_time() {
        let f = fixture();
        let request = f
            .factory
            .generate_request_token(&consumer(), None)
            .unwrap()
            .authorize("alice", "v1")
            .unwrap();
        let first = f.factory.generate_access_token(&request).unwrap();
        let first_session = first.session().unwrap().clone();

        // A renewal presents a request token that already carries the session.
        let renewal_request = ServiceProviderToken::new_request_token("renewal")
            .secret("secret")
            .consumer(consumer())
            .authorized_by("alice")
            .verifier("v2")
            .session(first_session.clone())
            .build()
            .unwrap();

        f.clock.advance(60_000);
        let renewed = f.factory.generate_access_token(&renewal_request).unwrap();
        let session = renewed.session().unwrap();

        assert_eq!(session.creation_time(), first_session.creation_time());
        assert_eq!(session.last_renewal_time(), NOW + 60_000);
        assert_eq!(session.time_to_live(), first_session.time_to_live());
        assert_ne!(session.handle(), first_session.handle());
    }

    #[test]
    fn test_unauthorized_request_token_rejected() {
        let f = fixture();
        let request = f.factory.generate_request_token(&consumer(), None).unwrap();

        let result = f.factory.generate_access_token(&request);
        assert!(matches!(
            result,
            Err(ServiceProviderError::Token(TokenError::NotAuthorized))
        ));
        assert_eq!(f.logger.get_entries_by_level(LogLevel::Warn).len(), 1);
    }

    #[test]
    fn test_denied_request_token_rejected() {
        let f = fixture();
        let denied = f
            .factory
            .generate_request_token(&consumer(), None)
            .unwrap()
            .deny("bob")
            .unwrap();

        assert!(matches!(
            f.factory.generate_access_token(&denied),
            Err(ServiceProviderError::Token(TokenError::NotAuthorized))
        ));
    }

    #[test]
    fn test_access_token_rejected() {
        let f = fixture();
        let request = f
            .factory
            .generate_request_token(&consumer(), None)
            .unwrap()
            .authorize("alice", "v1")
            .unwrap();
        let access = f.factory.generate_access_token(&request).unwrap();

        assert!(matches!(
            f.factory.generate_access_token(&access),
            Err(ServiceProviderError::Token(TokenError::NotRequestToken))
        ));
    }

    #[test]
    fn test_blank_consumer_key_rejected() {
        let f = fixture();
        let consumer: Consumer = serde_json::from_str(
            r#"{"key": " ", "name": "Blank", "signature_method": "HMAC_SHA1"}"#,
        )
        .unwrap();

        assert!(matches!(
            f.factory.generate_request_token(&consumer, None),
            Err(ServiceProviderError::Validation(ValidationError::MissingArgument { .. }))
        ));
    }

    #[test]
    fn test_invalid_callback_rejected() {
        let f = fixture();
        let result = f
            .factory
            .generate_request_token(&consumer(), Some(Url::parse("ftp://example.com").unwrap()));
        assert!(matches!(result, Err(ServiceProviderError::Validation(_))));
    }

    #[test]
    fn test_mock_randomizer_values() {
        let randomizer = Arc::new(MockRandomizer::new());
        randomizer.push_identifier("request-value");
        randomizer.push_string("request-secret");

        let factory = RandomValueTokenFactory::new(
            randomizer.clone(),
            Arc::new(MockClock::new(NOW)),
            Arc::new(InMemoryLogger::new()),
            TokenLifetimes::default(),
        );
        let token = factory.generate_request_token(&consumer(), None).unwrap();

        assert_eq!(token.value(), "request-value");
        assert_eq!(token.secret(), "request-secret");
        assert_eq!(randomizer.get_string_history(), vec![SECRET_BYTE_LENGTH]);
    }

    #[test]
    fn test_logs_fingerprints_only() {
        let f = fixture();
        let token = f.factory.generate_request_token(&consumer(), None).unwrap();

        let entries = f.logger.get_entries();
        assert_eq!(entries.len(), 1);
        let logged = format!("{:?}", entries[0]);
        assert!(!logged.contains(token.value()));
        assert!(!logged.contains(token.secret()));
    }
}
