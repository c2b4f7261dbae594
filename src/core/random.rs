//! Random Values
//!
//! Cryptographically secure generation of token values, secrets and session
//! handles.

use base64::Engine;
use rand::RngCore;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Randomizer interface (for dependency injection).
pub trait Randomizer: Send + Sync {
    /// URL-safe string encoding `byte_len` random bytes.
    fn random_url_safe_string(&self, byte_len: usize) -> String;

    /// Random unique identifier for a token value.
    fn random_identifier(&self) -> String;
}

/// Default randomizer backed by the thread-local CSPRNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct SecureRandomizer;

impl SecureRandomizer {
    pub fn new() -> Self {
        Self
    }
}

impl Randomizer for SecureRandomizer {
    fn random_url_safe_string(&self, byte_len: usize) -> String {
        let mut bytes = vec![0u8; byte_len];
        rand::thread_rng().fill_bytes(&mut bytes);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&bytes)
    }

    fn random_identifier(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Mock randomizer for testing.
#[derive(Default)]
pub struct MockRandomizer {
    next_strings: Mutex<VecDeque<String>>,
    next_identifiers: Mutex<VecDeque<String>>,
    string_history: Mutex<Vec<usize>>,
    counter: Mutex<u64>,
}

impl MockRandomizer {
    /// Create new mock randomizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next value returned by `random_url_safe_string`.
    pub fn push_string(&self, value: impl Into<String>) -> &Self {
        self.next_strings.lock().unwrap().push_back(value.into());
        self
    }

    /// Queue the next value returned by `random_identifier`.
    pub fn push_identifier(&self, value: impl Into<String>) -> &Self {
        self.next_identifiers.lock().unwrap().push_back(value.into());
        self
    }

    /// Byte lengths requested so far.
    pub fn get_string_history(&self) -> Vec<usize> {
        self.string_history.lock().unwrap().clone()
    }

    fn next_counter(&self) -> u64 {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        *counter
    }
}

impl Randomizer for MockRandomizer {
    fn random_url_safe_string(&self, byte_len: usize) -> String {
        self.string_history.lock().unwrap().push(byte_len);
        let queued = self.next_strings.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| format!("mock-random-{}", self.next_counter()))
    }

    fn random_identifier(&self) -> String {
        let queued = self.next_identifiers.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| format!("mock-id-{}", self.next_counter()))
    }
}

/// Check a value only uses the URL-safe base64 alphabet.
#[cfg(test)]
pub(crate) fn is_url_safe(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
