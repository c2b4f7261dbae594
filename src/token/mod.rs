//! Token Management
//!
//! Token issuance, persistence and expiry.
//!
//! This module provides:
//!
//! - **Token Factory**: Issues request tokens and exchanges them for access tokens
//! - **Token Store**: Process-wide persistent collection of issued tokens
//! - **Token Records**: Persisted token shape with encrypted secret fields
//! - **Sweeper**: Periodic removal of expired tokens and sessions

pub mod factory;
pub mod persistence;
pub mod record;
pub mod store;
pub mod sweeper;

// Token Factory
pub use factory::{
    create_token_factory, RandomValueTokenFactory, ServiceProviderTokenFactory,
    SECRET_BYTE_LENGTH,
};

// Persistence
pub use persistence::{
    InMemoryPersistence, JsonFilePersistence, TokenPersistence, TOKEN_DOCUMENT_VERSION,
};
pub use record::{SessionRecord, TokenRecord, TokenRecordCodec};

// Token Store
pub use store::{
    create_mock_token_store, create_persistent_token_store, MockTokenStore,
    PersistentTokenStore, ServiceProviderTokenStore,
};

// Sweeper
pub use sweeper::{sweep_expired, SweepReport, SweeperHandle, TokenSweeper};
