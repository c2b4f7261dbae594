//! Integration tests for the token lifecycle: issuing, authorizing, denying
//! and exchanging tokens.

use oauth1_service_provider::{
    Authorization, Consumer, InMemoryConsumerStore, InMemoryLogger, InMemoryPersistence,
    MockClock, PersistentTokenStore, PlaintextCipher, RandomValueTokenFactory,
    SecureRandomizer, ServiceProviderError, ServiceProviderToken, ServiceProviderTokenFactory,
    ServiceProviderTokenStore, Session, TokenError, TokenLifetimes, TokenRecordCodec,
    TransitionError, ValidationError,
};
use std::sync::Arc;
use url::Url;

const NOW: i64 = 1_700_000_000_000;

struct Harness {
    factory: RandomValueTokenFactory,
    store: PersistentTokenStore,
    clock: Arc<MockClock>,
    consumer: Consumer,
}

fn consumer(key: &str) -> Consumer {
    Consumer::builder(key)
        .name(format!("Consumer {key}"))
        .build()
        .unwrap()
}

fn harness() -> Harness {
    let clock = Arc::new(MockClock::new(NOW));
    let consumer = consumer("consumer-x");
    let consumers = Arc::new(InMemoryConsumerStore::with_consumers([
        consumer.clone(),
        self::consumer("consumer-y"),
    ]));

    let factory = RandomValueTokenFactory::new(
        Arc::new(SecureRandomizer),
        clock.clone(),
        Arc::new(InMemoryLogger::new()),
        TokenLifetimes::default(),
    );
    let store = PersistentTokenStore::new(
        Arc::new(InMemoryPersistence::new()),
        TokenRecordCodec::new(Arc::new(PlaintextCipher), consumers),
        clock.clone(),
        Arc::new(InMemoryLogger::new()),
    );

    Harness {
        factory,
        store,
        clock,
        consumer,
    }
}

#[test]
fn test_scenario_request_token_issued() {
    // Arrange
    let h = harness();

    // Act
    let token = h.factory.generate_request_token(&h.consumer, None).unwrap();

    // Assert
    assert!(token.is_request_token());
    assert_eq!(token.authorization(), Authorization::None);
    assert!(!token.secret().trim().is_empty());
    assert!(!token.has_expired(h.clock.as_ref()));
}

#[test]
fn test_scenario_authorize_once() {
    // Arrange
    let h = harness();
    let token = h.factory.generate_request_token(&h.consumer, None).unwrap();

    // Act
    let authorized = token.authorize("alice", "v1").unwrap();

    // Assert
    assert_eq!(authorized.authorization(), Authorization::Authorized);
    assert_eq!(authorized.user(), Some("alice"));
    assert_eq!(authorized.verifier(), Some("v1"));
    assert!(matches!(
        authorized.authorize("alice", "v1"),
        Err(ServiceProviderError::Transition(TransitionError::AlreadyAuthorized))
    ));
}

#[test]
fn test_scenario_exchange_unauthorized_token_fails() {
    // Arrange
    let h = harness();
    let token = h.factory.generate_request_token(&h.consumer, None).unwrap();

    // Act
    let result = h.factory.generate_access_token(&token);

    // Assert
    assert!(matches!(
        result,
        Err(ServiceProviderError::Token(TokenError::NotAuthorized))
    ));
}

#[test]
fn test_scenario_first_access_token_starts_session() {
    // Arrange
    let h = harness();
    let authorized = h
        .factory
        .generate_request_token(&h.consumer, None)
        .unwrap()
        .authorize("alice", "v1")
        .unwrap();

    // Act
    let access = h.factory.generate_access_token(&authorized).unwrap();

    // Assert
    assert!(access.is_access_token());
    assert_eq!(access.user(), Some("alice"));
    let session = access.session().unwrap();
    assert_eq!(session.creation_time(), session.last_renewal_time());
    assert!(!session.has_expired(h.clock.as_ref()));
}

#[test]
fn test_scenario_remove_by_consumer() {
    // Arrange
    let h = harness();
    let other = consumer("consumer-y");
    let first = h.factory.generate_request_token(&h.consumer, None).unwrap();
    let second = h.factory.generate_request_token(&h.consumer, None).unwrap();
    let unrelated = h.factory.generate_request_token(&other, None).unwrap();
    for token in [&first, &second, &unrelated] {
        h.store.put(token.clone()).unwrap();
    }

    // Act
    let removed = h.store.remove_by_consumer("consumer-x").unwrap();

    // Assert
    assert_eq!(removed, 2);
    assert!(h.store.get(first.value()).unwrap().is_none());
    assert!(h.store.get(second.value()).unwrap().is_none());
    assert_eq!(h.store.get(unrelated.value()).unwrap(), Some(unrelated));
}

#[test]
fn test_full_flow_through_store() {
    let h = harness();
    let callback = Url::parse("https://consumer.example.com/return").unwrap();

    // Consumer obtains a request token.
    let request = h
        .store
        .put(
            h.factory
                .generate_request_token(&h.consumer, Some(callback.clone()))
                .unwrap(),
        )
        .unwrap();

    // User approves; the store now holds the authorized token under the same value.
    let stored = h.store.get(request.value()).unwrap().unwrap();
    h.store.put(stored.authorize("alice", "v1").unwrap()).unwrap();
    let authorized = h.store.get(request.value()).unwrap().unwrap();
    assert!(authorized.has_been_authorized());

    // Consumer exchanges it.
    let access = h.factory.generate_access_token(&authorized).unwrap();
    assert!(h.store.remove(authorized.value()).unwrap());
    h.store.put(access.clone()).unwrap();

    assert_eq!(h.store.get_access_tokens_for_user("alice").unwrap(), vec![access.clone()]);
    assert_eq!(access.callback(), Some(&callback));
    assert_eq!(access.consumer(), Some(&h.consumer));
}

#[test]
fn test_denied_token_cannot_be_exchanged() {
    let h = harness();
    let denied = h
        .factory
        .generate_request_token(&h.consumer, None)
        .unwrap()
        .deny("bob")
        .unwrap();

    assert!(denied.has_been_denied());
    assert!(matches!(
        denied.authorize("bob", "v1"),
        Err(ServiceProviderError::Transition(TransitionError::AlreadyDenied))
    ));
    assert!(matches!(
        h.factory.generate_access_token(&denied),
        Err(ServiceProviderError::Token(TokenError::NotAuthorized))
    ));
}

#[test]
fn test_session_renewal_chain() {
    let h = harness();
    let authorized = h
        .factory
        .generate_request_token(&h.consumer, None)
        .unwrap()
        .authorize("alice", "v1")
        .unwrap();
    let first = h.factory.generate_access_token(&authorized).unwrap();
    let first_session = first.session().unwrap().clone();

    h.clock.advance(24 * 60 * 60 * 1000);
    let renewal = ServiceProviderToken::new_request_token("renewal-request")
        .secret("renewal-secret")
        .consumer(h.consumer.clone())
        .authorized_by("alice")
        .verifier("v2")
        .session(first_session.clone())
        .build()
        .unwrap();
    let second = h.factory.generate_access_token(&renewal).unwrap();
    let second_session = second.session().unwrap();

    assert_eq!(second_session.creation_time(), first_session.creation_time());
    assert!(second_session.last_renewal_time() > first_session.last_renewal_time());
    assert_ne!(second_session.handle(), first_session.handle());
}

#[test]
fn test_access_tokens_are_always_authorized_with_user() {
    let attempts = vec![
        ServiceProviderToken::new_access_token("a").secret("s").build(),
        ServiceProviderToken::new_access_token("b")
            .secret("s")
            .authorized_by("alice")
            .build(),
        ServiceProviderToken::new_access_token("c")
            .secret("s")
            .denied_by("alice")
            .build(),
        ServiceProviderToken::new_access_token("d")
            .secret("s")
            .authorized_by("")
            .build(),
    ];

    let built: Vec<_> = attempts.into_iter().filter_map(Result::ok).collect();
    assert_eq!(built.len(), 1);
    for token in built {
        assert_eq!(token.authorization(), Authorization::Authorized);
        assert!(token.user().is_some());
    }
}

#[test]
fn test_authorized_request_tokens_carry_verifier() {
    let missing = ServiceProviderToken::new_request_token("r")
        .secret("s")
        .authorized_by("alice")
        .build();
    assert!(matches!(missing, Err(ValidationError::InvalidArgument { .. })));

    let token = ServiceProviderToken::new_request_token("r")
        .secret("s")
        .build()
        .unwrap();
    assert!(matches!(
        token.authorize("alice", ""),
        Err(ServiceProviderError::Validation(_))
    ));
}

#[test]
fn test_expiry_boundary() {
    let h = harness();
    let token = h.factory.generate_request_token(&h.consumer, None).unwrap();
    let ttl = token.time_to_live();

    h.clock.set(NOW + ttl);
    assert!(!token.has_expired(h.clock.as_ref()));

    h.clock.advance(1);
    assert!(token.has_expired(h.clock.as_ref()));
}

#[test]
fn test_session_expiry_is_independent_of_token_expiry() {
    let clock = MockClock::new(NOW);
    let session = Session::builder("handle")
        .creation_time(NOW)
        .time_to_live(10_000)
        .build()
        .unwrap();
    let token = ServiceProviderToken::new_access_token("access")
        .secret("secret")
        .authorized_by("alice")
        .creation_time(NOW)
        .time_to_live(1_000)
        .session(session)
        .build()
        .unwrap();

    clock.advance(5_000);
    assert!(token.has_expired(&clock));
    assert!(!token.has_expired_session(&clock));

    let renewed = token.session().unwrap().renew("next-handle", &clock).unwrap();
    assert_eq!(renewed.creation_time(), NOW);
    assert_eq!(renewed.last_renewal_time(), NOW + 5_000);
    clock.advance(9_000);
    assert!(!renewed.has_expired(&clock));
    assert!(token.has_expired_session(&clock));
}
