//! OAuth 1.0a Service Provider Tokens
//!
//! Token lifecycle for an OAuth 1.0a service provider: issuing request
//! tokens, recording the user's decision, exchanging authorized request tokens
//! for access tokens with renewable sessions, and keeping every issued token in
//! a persistent store with secret fields encrypted at rest.
//!
//! # Features
//!
//! - Immutable request and access tokens with validated construction
//! - Authorize/deny transitions returning new tokens
//! - Sessions allowing access tokens to be renewed
//! - Persistent token store with atomic, encrypted JSON persistence
//! - Periodic sweeping of expired tokens and sessions
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oauth1_service_provider::{
//!     create_persistent_token_store, create_token_factory, service_provider_config,
//!     AesGcmCipher, Consumer, InMemoryConsumerStore, ServiceProviderTokenFactory,
//!     ServiceProviderTokenStore,
//! };
//!
//! let config = service_provider_config()
//!     .token_store_path("/var/lib/oauth/tokens.json")
//!     .build()?;
//!
//! let consumer = Consumer::builder("jenkins").name("Jenkins").build()?;
//! let consumers = Arc::new(InMemoryConsumerStore::with_consumers([consumer.clone()]));
//! let cipher = Arc::new(AesGcmCipher::new(&key)?);
//!
//! let factory = create_token_factory(config.lifetimes);
//! let store = create_persistent_token_store(&config, cipher, consumers);
//!
//! // Consumer asks for a request token.
//! let request = store.put(factory.generate_request_token(&consumer, None)?)?;
//!
//! // User approves it.
//! let authorized = store.put(request.authorize("alice", "verifier")?)?;
//!
//! // Consumer swaps it for an access token.
//! let access = factory.generate_access_token(&authorized)?;
//! store.remove(authorized.value())?;
//! store.put(access)?;
//! ```
//!
//! # Architecture
//!
//! - `types`: Tokens, sessions, consumers and configuration
//! - `error`: Error hierarchy
//! - `core`: Injectable collaborators (clock, randomness, encryption, consumer lookup)
//! - `builders`: Fluent builders for tokens, sessions and configuration
//! - `token`: Token factory, store, persistence and sweeping
//! - `telemetry`: Structured logging

pub mod builders;
pub mod core;
pub mod error;
pub mod telemetry;
pub mod token;
pub mod types;

// Re-export builders
pub use builders::{
    service_provider_config, ServiceProviderConfigBuilder, ServiceProviderTokenBuilder,
    SessionBuilder,
};

// Re-export errors
pub use error::{
    ConfigurationError, ServiceProviderError, ServiceProviderResult, StorageError, TokenError,
    TransitionError, ValidationError,
};

// Re-export types
pub use types::{
    // Config
    ServiceProviderConfig, TokenLifetimes,
    // Consumer
    Consumer, ConsumerBuilder, SignatureMethod,
    // Token
    is_valid_callback, token_fingerprint, Authorization, ServiceProviderToken, Session, Token,
    TokenType,
};

// Re-export core components
pub use core::{
    // Clock
    Clock, MockClock, SystemClock,
    // Randomness
    MockRandomizer, Randomizer, SecureRandomizer,
    // Encryption
    AesGcmCipher, PlaintextCipher, SecretCipher,
    // Consumers
    ConsumerStore, InMemoryConsumerStore,
};

// Re-export token management
pub use token::{
    // Factory
    create_token_factory, RandomValueTokenFactory, ServiceProviderTokenFactory,
    // Store
    create_mock_token_store, create_persistent_token_store, MockTokenStore,
    PersistentTokenStore, ServiceProviderTokenStore,
    // Persistence
    InMemoryPersistence, JsonFilePersistence, SessionRecord, TokenPersistence, TokenRecord,
    TokenRecordCodec,
    // Sweeper
    sweep_expired, SweepReport, SweeperHandle, TokenSweeper,
};

// Re-export telemetry
pub use telemetry::{
    create_in_memory_logger, create_tracing_logger, no_op_logger, InMemoryLogger, LogEntry,
    LogLevel, Logger, NoOpLogger, TokenLogContext, TracingLogger,
};
