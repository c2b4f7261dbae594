//! Token Persistence
//!
//! Backing storage for token records.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::StorageError;
use crate::token::TokenRecord;

/// Current version of the persisted document.
pub const TOKEN_DOCUMENT_VERSION: u32 = 1;

/// Persistence interface (for dependency injection).
///
/// `save` replaces the whole persisted set.
pub trait TokenPersistence: Send + Sync {
    /// Load every persisted record. An absent backing store loads as empty.
    fn load(&self) -> Result<Vec<TokenRecord>, StorageError>;

    /// Replace the persisted records.
    fn save(&self, records: &[TokenRecord]) -> Result<(), StorageError>;
}

#[derive(Serialize)]
struct TokenDocumentRef<'a> {
    version: u32,
    tokens: &'a [TokenRecord],
}

#[derive(Deserialize)]
struct TokenDocument {
    version: u32,
    #[serde(default)]
    tokens: Vec<TokenRecord>,
}

fn serialize(records: &[TokenRecord]) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec_pretty(&TokenDocumentRef {
        version: TOKEN_DOCUMENT_VERSION,
        tokens: records,
    })
    .map_err(|e| StorageError::WriteFailed {
        message: format!("failed to serialize tokens: {}", e),
    })
}

fn deserialize(bytes: &[u8]) -> Result<Vec<TokenRecord>, StorageError> {
    let document: TokenDocument = serde_json::from_slice(bytes)
        .map_err(|e| StorageError::corrupted(format!("failed to parse tokens: {}", e)))?;
    if document.version > TOKEN_DOCUMENT_VERSION {
        return Err(StorageError::corrupted(format!(
            "unsupported token document version {}",
            document.version
        )));
    }
    Ok(document.tokens)
}

/// JSON file persistence.
///
/// Writes go to a sibling temp file which is then renamed over the target, so
/// readers never see a partial document.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_temp(&self, temp: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(temp)?;
        file.write_all(bytes)?;
        file.sync_all()
    }
}

impl TokenPersistence for JsonFilePersistence {
    fn load(&self) -> Result<Vec<TokenRecord>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => deserialize(&bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StorageError::ReadFailed {
                message: format!("{}: {}", self.path.display(), e),
            }),
        }
    }

    fn save(&self, records: &[TokenRecord]) -> Result<(), StorageError> {
        let bytes = serialize(records)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::WriteFailed {
                message: format!("{}: {}", parent.display(), e),
            })?;
        }

        let temp = self.temp_path();
        let result = self
            .write_temp(&temp, &bytes)
            .and_then(|_| fs::rename(&temp, &self.path));
        if let Err(e) = result {
            let _ = fs::remove_file(&temp);
            return Err(StorageError::WriteFailed {
                message: format!("{}: {}", self.path.display(), e),
            });
        }
        Ok(())
    }
}

/// In-memory persistence.
///
/// Keeps the serialized document so loads go through the same parsing as the
/// file backend.
#[derive(Default)]
pub struct InMemoryPersistence {
    document: Mutex<Option<Vec<u8>>>,
    should_fail: Mutex<bool>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a raw document.
    pub fn with_document(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            document: Mutex::new(Some(bytes.into())),
            should_fail: Mutex::new(false),
        }
    }

    /// Raw persisted document, if anything was saved.
    pub fn document(&self) -> Option<Vec<u8>> {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make every subsequent save fail.
    pub fn set_should_fail(&self, should_fail: bool) -> &Self {
        *self.should_fail.lock().unwrap_or_else(PoisonError::into_inner) = should_fail;
        self
    }
}

impl TokenPersistence for InMemoryPersistence {
    fn load(&self) -> Result<Vec<TokenRecord>, StorageError> {
        match self.document().as_deref() {
            Some(bytes) => deserialize(bytes),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, records: &[TokenRecord]) -> Result<(), StorageError> {
        if *self.should_fail.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(StorageError::WriteFailed {
                message: "in-memory persistence failure".to_string(),
            });
        }

        let bytes = serialize(records)?;
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = Some(bytes);
        Ok(())
    }
}
