//! Token Store
//!
//! Process-wide collection of issued tokens, keyed by token value.
//!
//! Every mutation is a single critical section: the store takes its write
//! lock, applies the change to a copy of the in-memory map, persists the copy
//! and only then swaps it in. A failed save leaves the previous state both on
//! disk and in memory. Reads share the lock and never see a half-applied
//! mutation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::core::{Clock, ConsumerStore, SecretCipher, SystemClock};
use crate::error::StorageError;
use crate::telemetry::{Logger, TokenLogContext, TracingLogger};
use crate::token::{JsonFilePersistence, TokenPersistence, TokenRecordCodec};
use crate::types::{ServiceProviderConfig, ServiceProviderToken};

type TokenMap = HashMap<String, ServiceProviderToken>;

/// Token store interface.
pub trait ServiceProviderTokenStore: Send + Sync {
    /// Look up a token by value.
    fn get(&self, value: &str) -> Result<Option<ServiceProviderToken>, StorageError>;

    /// All tokens, of either type, belonging to `user`.
    fn get_access_tokens_for_user(
        &self,
        user: &str,
    ) -> Result<Vec<ServiceProviderToken>, StorageError>;

    /// Insert or replace the token stored under its value.
    fn put(&self, token: ServiceProviderToken) -> Result<ServiceProviderToken, StorageError>;

    /// Remove a token. Returns `false` if there was nothing to remove.
    fn remove(&self, value: &str) -> Result<bool, StorageError>;

    /// Remove expired tokens that do not carry a session. Session-bearing
    /// tokens are only reaped by [`remove_expired_sessions`].
    ///
    /// [`remove_expired_sessions`]: ServiceProviderTokenStore::remove_expired_sessions
    fn remove_expired_tokens(&self) -> Result<usize, StorageError>;

    /// Remove tokens whose session has expired.
    fn remove_expired_sessions(&self) -> Result<usize, StorageError>;

    /// Remove every token issued to the given consumer.
    fn remove_by_consumer(&self, consumer_key: &str) -> Result<usize, StorageError>;
}

/// Token store backed by a [`TokenPersistence`].
///
/// The backing records are loaded on first use and mirrored in memory from
/// then on. Only one instance should exist per backing store.
pub struct PersistentTokenStore {
    persistence: Arc<dyn TokenPersistence>,
    codec: TokenRecordCodec,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
    tokens: RwLock<Option<TokenMap>>,
}

impl PersistentTokenStore {
    pub fn new(
        persistence: Arc<dyn TokenPersistence>,
        codec: TokenRecordCodec,
        clock: Arc<dyn Clock>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            persistence,
            codec,
            clock,
            logger,
            tokens: RwLock::new(None),
        }
    }

    /// Discard the in-memory mirror and load the backing records again.
    /// Returns the number of tokens loaded.
    pub fn reload(&self) -> Result<usize, StorageError> {
        let mut guard = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        let tokens = self.load("reload")?;
        let count = tokens.len();
        *guard = Some(tokens);
        Ok(count)
    }

    fn load(&self, operation: &str) -> Result<TokenMap, StorageError> {
        let loaded = self.persistence.load().and_then(|records| {
            records
                .iter()
                .map(|record| {
                    self.codec
                        .decode(record)
                        .map(|token| (token.value().to_string(), token))
                })
                .collect::<Result<TokenMap, StorageError>>()
        });

        match loaded {
            Ok(tokens) => {
                self.logger.debug(
                    "Loaded tokens",
                    &TokenLogContext::new()
                        .operation(operation)
                        .extra("count", tokens.len()),
                );
                Ok(tokens)
            }
            Err(e) => {
                self.logger.error(
                    &format!("Failed to load tokens: {}", e),
                    &TokenLogContext::new().operation(operation),
                );
                Err(e)
            }
        }
    }

    fn save(&self, operation: &str, tokens: &TokenMap) -> Result<(), StorageError> {
        let mut values: Vec<&String> = tokens.keys().collect();
        values.sort();

        let result = values
            .into_iter()
            .filter_map(|value| tokens.get(value))
            .map(|token| self.codec.encode(token))
            .collect::<Result<Vec<_>, StorageError>>()
            .and_then(|records| self.persistence.save(&records));

        if let Err(e) = &result {
            self.logger.error(
                &format!("Failed to persist tokens: {}", e),
                &TokenLogContext::new().operation(operation),
            );
        }
        result
    }

    fn read<R>(&self, operation: &str, f: impl FnOnce(&TokenMap) -> R) -> Result<R, StorageError> {
        {
            let guard = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(tokens) = guard.as_ref() {
                return Ok(f(tokens));
            }
        }

        let mut guard = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        let tokens = match guard.take() {
            Some(tokens) => tokens,
            None => self.load(operation)?,
        };
        let result = f(&tokens);
        *guard = Some(tokens);
        Ok(result)
    }

    /// Apply `f` to a copy of the tokens. The copy is persisted and committed
    /// when `f` reports a change.
    fn mutate<R>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut TokenMap) -> (R, bool),
    ) -> Result<R, StorageError> {
        let mut guard = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        let mut tokens = match guard.as_ref() {
            Some(tokens) => tokens.clone(),
            None => self.load(operation)?,
        };

        let (result, changed) = f(&mut tokens);
        if changed {
            self.save(operation, &tokens)?;
        }
        *guard = Some(tokens);
        Ok(result)
    }

    fn retain(
        &self,
        operation: &str,
        keep: impl Fn(&ServiceProviderToken) -> bool,
    ) -> Result<usize, StorageError> {
        let removed = self.mutate(operation, |tokens| {
            let before = tokens.len();
            tokens.retain(|_, token| keep(token));
            let removed = before - tokens.len();
            (removed, removed > 0)
        })?;

        if removed > 0 {
            self.logger.info(
                "Removed tokens",
                &TokenLogContext::new()
                    .operation(operation)
                    .extra("removed", removed),
            );
        }
        Ok(removed)
    }
}

impl ServiceProviderTokenStore for PersistentTokenStore {
    fn get(&self, value: &str) -> Result<Option<ServiceProviderToken>, StorageError> {
        self.read("get", |tokens| tokens.get(value).cloned())
    }

    fn get_access_tokens_for_user(
        &self,
        user: &str,
    ) -> Result<Vec<ServiceProviderToken>, StorageError> {
        self.read("get_access_tokens_for_user", |tokens| {
            tokens
                .values()
                .filter(|token| token.user() == Some(user))
                .cloned()
                .collect()
        })
    }

    fn put(&self, token: ServiceProviderToken) -> Result<ServiceProviderToken, StorageError> {
        let context = TokenLogContext::new()
            .operation("put")
            .token(token.value())
            .consumer_key(token.consumer_key().unwrap_or_default());

        let stored = token.clone();
        self.mutate("put", |tokens| {
            tokens.insert(token.value().to_string(), token);
            ((), true)
        })?;

        self.logger.debug("Stored token", &context);
        Ok(stored)
    }

    fn remove(&self, value: &str) -> Result<bool, StorageError> {
        let removed = self.mutate("remove", |tokens| {
            let removed = tokens.remove(value).is_some();
            (removed, removed)
        })?;

        if removed {
            self.logger.debug(
                "Removed token",
                &TokenLogContext::new().operation("remove").token(value),
            );
        }
        Ok(removed)
    }

    fn remove_expired_tokens(&self) -> Result<usize, StorageError> {
        let clock = self.clock.as_ref();
        self.retain("remove_expired_tokens", |token| {
            token.has_session() || !token.has_expired(clock)
        })
    }

    fn remove_expired_sessions(&self) -> Result<usize, StorageError> {
        let clock = self.clock.as_ref();
        self.retain("remove_expired_sessions", |token| {
            !token.has_expired_session(clock)
        })
    }

    fn remove_by_consumer(&self, consumer_key: &str) -> Result<usize, StorageError> {
        self.retain("remove_by_consumer", |token| {
            token.consumer_key() != Some(consumer_key)
        })
    }
}

/// Create a file-backed token store from configuration.
pub fn create_persistent_token_store(
    config: &ServiceProviderConfig,
    cipher: Arc<dyn SecretCipher>,
    consumers: Arc<dyn ConsumerStore>,
) -> PersistentTokenStore {
    PersistentTokenStore::new(
        Arc::new(JsonFilePersistence::new(&config.token_store_path)),
        TokenRecordCodec::new(cipher, consumers),
        Arc::new(SystemClock),
        Arc::new(TracingLogger),
    )
}

/// Mock token store for testing.
pub struct MockTokenStore {
    tokens: Mutex<TokenMap>,
    clock: Arc<dyn Clock>,
    put_history: Mutex<Vec<String>>,
    remove_history: Mutex<Vec<String>>,
    next_error: Mutex<Option<StorageError>>,
    should_fail: Mutex<bool>,
}

impl MockTokenStore {
    /// Create new mock token store.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create mock token store using `clock` for expiry checks.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
            clock,
            put_history: Mutex::new(Vec::new()),
            remove_history: Mutex::new(Vec::new()),
            next_error: Mutex::new(None),
            should_fail: Mutex::new(false),
        }
    }

    /// Set next error to return.
    pub fn set_next_error(&self, error: StorageError) -> &Self {
        *self.next_error.lock().unwrap() = Some(error);
        self
    }

    /// Set store to fail all operations.
    pub fn set_should_fail(&self, should_fail: bool) -> &Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    /// Pre-populate a token without recording history.
    pub fn add_token(&self, token: ServiceProviderToken) -> &Self {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.value().to_string(), token);
        self
    }

    /// Values passed to `put`.
    pub fn get_put_history(&self) -> Vec<String> {
        self.put_history.lock().unwrap().clone()
    }

    /// Values passed to `remove`, plus every token removed by a sweep.
    pub fn get_remove_history(&self) -> Vec<String> {
        self.remove_history.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_error(&self) -> Result<(), StorageError> {
        if *self.should_fail.lock().unwrap() {
            return Err(StorageError::WriteFailed {
                message: "Mock store failure".to_string(),
            });
        }

        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }

        Ok(())
    }

    fn retain(&self, keep: impl Fn(&ServiceProviderToken) -> bool) -> Result<usize, StorageError> {
        self.check_error()?;

        let mut tokens = self.tokens.lock().unwrap();
        let removed: Vec<String> = tokens
            .iter()
            .filter(|(_, token)| !keep(token))
            .map(|(value, _)| value.clone())
            .collect();
        for value in &removed {
            tokens.remove(value);
        }
        self.remove_history.lock().unwrap().extend(removed.iter().cloned());
        Ok(removed.len())
    }
}

impl Default for MockTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceProviderTokenStore for MockTokenStore {
    fn get(&self, value: &str) -> Result<Option<ServiceProviderToken>, StorageError> {
        self.check_error()?;
        Ok(self.tokens.lock().unwrap().get(value).cloned())
    }

    fn get_access_tokens_for_user(
        &self,
        user: &str,
    ) -> Result<Vec<ServiceProviderToken>, StorageError> {
        self.check_error()?;
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .values()
            .filter(|token| token.user() == Some(user))
            .cloned()
            .collect())
    }

    fn put(&self, token: ServiceProviderToken) -> Result<ServiceProviderToken, StorageError> {
        self.check_error()?;

        self.put_history
            .lock()
            .unwrap()
            .push(token.value().to_string());
        self.tokens
            .lock()
            .unwrap()
            .insert(token.value().to_string(), token.clone());
        Ok(token)
    }

    fn remove(&self, value: &str) -> Result<bool, StorageError> {
        self.check_error()?;

        self.remove_history.lock().unwrap().push(value.to_string());
        Ok(self.tokens.lock().unwrap().remove(value).is_some())
    }

    fn remove_expired_tokens(&self) -> Result<usize, StorageError> {
        let clock = self.clock.as_ref();
        self.retain(|token| token.has_session() || !token.has_expired(clock))
    }

    fn remove_expired_sessions(&self) -> Result<usize, StorageError> {
        let clock = self.clock.as_ref();
        self.retain(|token| !token.has_expired_session(clock))
    }

    fn remove_by_consumer(&self, consumer_key: &str) -> Result<usize, StorageError> {
        self.retain(|token| token.consumer_key() != Some(consumer_key))
    }
}

/// Create mock token store for testing.
pub fn create_mock_token_store() -> MockTokenStore {
    MockTokenStore::new()
}
