//! Consumer Store
//!
//! Lookup of registered consumers by key, used to rehydrate the consumer of a
//! persisted token.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::StorageError;
use crate::types::Consumer;

/// Consumer store interface.
pub trait ConsumerStore: Send + Sync {
    /// Register a new consumer. Fails if the key is already taken.
    fn add(&self, consumer: Consumer) -> Result<(), StorageError>;

    /// Look up a consumer by key.
    fn get(&self, key: &str) -> Result<Option<Consumer>, StorageError>;

    /// All registered consumers.
    fn get_all(&self) -> Result<Vec<Consumer>, StorageError>;

    /// Replace an existing consumer. Fails if the key is unknown.
    fn update(&self, consumer: Consumer) -> Result<(), StorageError>;

    /// Remove a consumer. No-op if the key is unknown.
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory consumer store.
#[derive(Default)]
pub struct InMemoryConsumerStore {
    consumers: RwLock<HashMap<String, Consumer>>,
}

impl InMemoryConsumerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `consumers`.
    pub fn with_consumers(consumers: impl IntoIterator<Item = Consumer>) -> Self {
        let consumers = consumers
            .into_iter()
            .map(|consumer| (consumer.key().to_string(), consumer))
            .collect();
        Self {
            consumers: RwLock::new(consumers),
        }
    }
}

impl ConsumerStore for InMemoryConsumerStore {
    fn add(&self, consumer: Consumer) -> Result<(), StorageError> {
        let mut consumers = self.consumers.write().unwrap_or_else(PoisonError::into_inner);
        if consumers.contains_key(consumer.key()) {
            tracing::warn!(consumer_key = consumer.key(), "Consumer already exists");
            return Err(StorageError::ConsumerExists {
                key: consumer.key().to_string(),
            });
        }
        consumers.insert(consumer.key().to_string(), consumer);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Consumer>, StorageError> {
        let consumers = self.consumers.read().unwrap_or_else(PoisonError::into_inner);
        Ok(consumers.get(key).cloned())
    }

    fn get_all(&self) -> Result<Vec<Consumer>, StorageError> {
        let consumers = self.consumers.read().unwrap_or_else(PoisonError::into_inner);
        Ok(consumers.values().cloned().collect())
    }

    fn update(&self, consumer: Consumer) -> Result<(), StorageError> {
        let mut consumers = self.consumers.write().unwrap_or_else(PoisonError::into_inner);
        match consumers.get_mut(consumer.key()) {
            Some(existing) => {
                *existing = consumer;
                Ok(())
            }
            None => {
                tracing::warn!(consumer_key = consumer.key(), "Consumer does not exist");
                Err(StorageError::ConsumerNotFound {
                    key: consumer.key().to_string(),
                })
            }
        }
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.consumers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumer(key: &str, name: &str) -> Consumer {
        Consumer::builder(key).name(name).build().unwrap()
    }

    #[test]
    fn test_add_and_get() {
        let store = InMemoryConsumerStore::new();
        store.add(consumer("jenkins", "Jenkins")).unwrap();

        assert_eq!(store.get("jenkins").unwrap().unwrap().name(), "Jenkins");
        assert!(store.get("unknown").unwrap().is_none());
        assert_eq!(store.get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_add_duplicate_fails() {
        let store = InMemoryConsumerStore::with_consumers([consumer("jenkins", "Jenkins")]);
        let result = store.add(consumer("jenkins", "Other"));
        assert!(matches!(result, Err(StorageError::ConsumerExists { .. })));
    }

    #[test]
    fn test_update() {
        let store = InMemoryConsumerStore::with_consumers([consumer("jenkins", "Jenkins")]);
        store.update(consumer("jenkins", "Renamed")).unwrap();
        assert_eq!(store.get("jenkins").unwrap().unwrap().name(), "Renamed");

        let result = store.update(consumer("missing", "Missing"));
        assert!(matches!(result, Err(StorageError::ConsumerNotFound { .. })));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = InMemoryConsumerStore::with_consumers([consumer("jenkins", "Jenkins")]);
        store.delete("jenkins").unwrap();
        store.delete("jenkins").unwrap();
        assert!(store.get("jenkins").unwrap().is_none());
    }
}
