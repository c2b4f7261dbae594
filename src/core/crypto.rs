//! Secret Field Encryption
//!
//! Encryption at rest for token values, secrets, verifiers and session
//! handles. The persistence layer calls through [`SecretCipher`] for each of
//! those fields; everything else is stored as-is.

use base64::Engine;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, Secret};

use crate::error::StorageError;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Cipher interface (for dependency injection).
pub trait SecretCipher: Send + Sync {
    /// Encrypt a single field value.
    fn encrypt(&self, plaintext: &str) -> Result<String, StorageError>;

    /// Decrypt a single field value.
    fn decrypt(&self, ciphertext: &str) -> Result<String, StorageError>;
}

/// Cipher that stores values unencrypted. For tests only.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlaintextCipher;

impl SecretCipher for PlaintextCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, StorageError> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, StorageError> {
        Ok(ciphertext.to_string())
    }
}

/// AES-256-GCM cipher.
///
/// Output is URL-safe base64 of `nonce || ciphertext || tag` with a fresh
/// random 96-bit nonce per value.
pub struct AesGcmCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl AesGcmCipher {
    /// Create cipher from a 32 byte key.
    pub fn new(key: &Secret<Vec<u8>>) -> Result<Self, StorageError> {
        let bytes = key.expose_secret();
        if bytes.len() != KEY_LEN {
            return Err(StorageError::EncryptionFailed {
                message: format!("key must be {} bytes, got {}", KEY_LEN, bytes.len()),
            });
        }

        let unbound = UnboundKey::new(&AES_256_GCM, bytes).map_err(|_| {
            StorageError::EncryptionFailed {
                message: "invalid AES-256-GCM key".to_string(),
            }
        })?;

        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Generate a new random key.
    pub fn generate_key() -> Result<Secret<Vec<u8>>, StorageError> {
        let mut key = vec![0u8; KEY_LEN];
        SystemRandom::new()
            .fill(&mut key)
            .map_err(|_| StorageError::EncryptionFailed {
                message: "system randomness unavailable".to_string(),
            })?;
        Ok(Secret::new(key))
    }
}

impl std::fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl SecretCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, StorageError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| StorageError::EncryptionFailed {
                message: "system randomness unavailable".to_string(),
            })?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| StorageError::EncryptionFailed {
                message: "seal failed".to_string(),
            })?;

        let mut output = Vec::with_capacity(NONCE_LEN + in_out.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&in_out);
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(output))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, StorageError> {
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(ciphertext)
            .map_err(|e| StorageError::DecryptionFailed {
                message: format!("invalid encoding: {}", e),
            })?;

        if decoded.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(StorageError::DecryptionFailed {
                message: "ciphertext too short".to_string(),
            });
        }

        let (nonce_bytes, sealed) = decoded.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| {
            StorageError::DecryptionFailed {
                message: "invalid nonce".to_string(),
            }
        })?;

        let mut in_out = sealed.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| StorageError::DecryptionFailed {
                message: "authentication failed".to_string(),
            })?;

        String::from_utf8(plaintext.to_vec()).map_err(|_| StorageError::DecryptionFailed {
            message: "plaintext is not UTF-8".to_string(),
        })
    }
}

/// Encrypt an optional field. Blank values are stored as-is.
pub fn encrypt_field(
    cipher: &dyn SecretCipher,
    value: Option<&str>,
) -> Result<Option<String>, StorageError> {
    match value {
        Some(value) if !value.trim().is_empty() => cipher.encrypt(value).map(Some),
        other => Ok(other.map(str::to_string)),
    }
}

/// Decrypt an optional field. Blank values are returned as-is.
pub fn decrypt_field(
    cipher: &dyn SecretCipher,
    value: Option<&str>,
) -> Result<Option<String>, StorageError> {
    match value {
        Some(value) if !value.trim().is_empty() => cipher.decrypt(value).map(Some),
        other => Ok(other.map(str::to_string)),
    }
}
