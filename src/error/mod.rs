//! Service Provider Error Types
//!
//! Error hierarchy for token construction, token exchange and persistence.

use thiserror::Error;

/// Root error type for the service provider token subsystem.
#[derive(Error, Debug)]
pub enum ServiceProviderError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Illegal state: {0}")]
    Transition(#[from] TransitionError),

    #[error("Invalid token: {0}")]
    Token(#[from] TokenError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl ServiceProviderError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "OAUTH1_INVALID_ARGUMENT",
            Self::Transition(_) => "OAUTH1_ILLEGAL_STATE",
            Self::Token(_) => "OAUTH1_INVALID_TOKEN",
            Self::Storage(_) => "OAUTH1_STORE",
            Self::Configuration(_) => "OAUTH1_CONFIG",
        }
    }

    /// Nothing in this subsystem is retried automatically. Retrying with the
    /// same input cannot succeed for validation or token errors, and storage
    /// retries are the caller's decision.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Check if the error was caused by a bad argument from the caller.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Transition(_))
    }
}

/// Bad constructor or operation argument.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Missing required argument: {name}")]
    MissingArgument { name: String },
}

impl ValidationError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn missing(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }
}

/// Transition attempted from a state that does not allow it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("token is not a request token")]
    NotRequestToken,

    #[error("token has already been authorized")]
    AlreadyAuthorized,

    #[error("token has already been denied")]
    AlreadyDenied,
}

/// Token misuse when exchanging a request token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is not a request token")]
    NotRequestToken,

    #[error("Request token is not authorized")]
    NotAuthorized,
}

/// Persistence layer failure.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Corrupted data: {message}")]
    CorruptedData { message: String },

    #[error("Encryption failed: {message}")]
    EncryptionFailed { message: String },

    #[error("Decryption failed: {message}")]
    DecryptionFailed { message: String },

    #[error("Consumer already exists: {key}")]
    ConsumerExists { key: String },

    #[error("No consumer with key: {key}")]
    ConsumerNotFound { key: String },
}

impl StorageError {
    pub(crate) fn corrupted(message: impl Into<String>) -> Self {
        Self::CorruptedData {
            message: message.into(),
        }
    }
}

/// Configuration error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },
}

/// Result type for service provider operations.
pub type ServiceProviderResult<T> = Result<T, ServiceProviderError>;
