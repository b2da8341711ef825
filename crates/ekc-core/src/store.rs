//! Persistent storage for key records.
//!
//! The custodian's keypair survives reboots through a small name-to-bytes
//! store. Records are opaque fixed-length byte strings and must round-trip
//! byte-exact, including embedded zero bytes: key material never passes
//! through a text API.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur during store operations.
///
/// A missing record is not an error: `get` returns `Ok(None)` so first-boot
/// detection stays on the happy path.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage corrupt: {0}")]
    Corrupt(String),
}

/// Storage abstraction for persisted key records.
///
/// Values are stored and retrieved verbatim. Implementations must not
/// truncate, pad, or re-encode them.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Retrieve a record. `Ok(None)` means the record does not exist.
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store a record, replacing any previous value.
    async fn put(&self, name: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Check whether a record exists.
    async fn exists(&self, name: &str) -> bool;
}

/// Thread-safe in-memory store for tests and ephemeral runs.
#[derive(Default, Clone)]
pub struct MemoryKeyStore {
    records: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryKeyStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(name).cloned())
    }

    async fn put(&self, name: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.insert(name.to_string(), value.to_vec());
        Ok(())
    }

    async fn exists(&self, name: &str) -> bool {
        let records = self.records.read().await;
        records.contains_key(name)
    }
}

/// File-backed store: one `<name>.key` file per record.
pub struct FileKeyStore {
    key_dir: PathBuf,
}

impl FileKeyStore {
    /// Create a store rooted at `key_dir`. The directory is created on the
    /// first write, not here.
    pub fn new(key_dir: PathBuf) -> Self {
        Self { key_dir }
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.key_dir.join(format!("{name}.key"))
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.record_path(name);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read(path)?))
    }

    async fn put(&self, name: &str, value: &[u8]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.key_dir)?;

        // Write atomically using a temp file, then rename over the target.
        let path = self.record_path(name);
        let temp_path = path.with_extension("tmp");
        {
            use std::io::Write;
            let mut file = std::fs::File::create(&temp_path)?;
            file.write_all(value)?;
            file.sync_all()?;
        }
        std::fs::rename(&temp_path, &path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    async fn exists(&self, name: &str) -> bool {
        self.record_path(name).exists()
    }
}
