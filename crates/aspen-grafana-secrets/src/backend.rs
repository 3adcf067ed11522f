//! Storage backend trait for the Grafana secrets engine.
//!
//! The engine persists exactly two kinds of entries: the mount configuration and
//! role definitions. Issued tokens are never stored. The host decides where
//! entries live; [`InMemorySecretsBackend`] covers tests and embedded use.

use std::collections::HashMap;
use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::error::SecretsError;

/// Storage backend for the secrets engine.
///
/// Paths are relative to the engine's mount point.
#[async_trait]
pub trait SecretsBackend: Send + Sync {
    /// Store a value at the given path.
    async fn put(&self, path: &str, value: &[u8]) -> Result<()>;

    /// Get a value at the given path.
    ///
    /// Returns `None` if the path doesn't exist.
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a value at the given path.
    ///
    /// Returns `true` if the value existed and was deleted.
    async fn delete(&self, path: &str) -> Result<bool>;

    /// List all keys under a prefix.
    ///
    /// Returns relative paths from the prefix.
    /// Keys ending in `/` represent "directories" (prefixes with children).
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check if a path exists.
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.get(path).await?.is_some())
    }
}

/// Whether a write creates a new entry or updates an existing one.
///
/// The host's routing layer decides this with an existence check. Updates only
/// replace the fields supplied in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Start from defaults when no entry exists.
    #[default]
    Create,
    /// Merge into the stored entry; fails if there is none.
    Update,
}

/// Load and decode a JSON entry.
pub(crate) async fn load_json<T: DeserializeOwned>(backend: &dyn SecretsBackend, path: &str) -> Result<Option<T>> {
    match backend.get(path).await? {
        Some(bytes) => {
            let value = serde_json::from_slice(&bytes).map_err(|e| SecretsError::Serialization {
                reason: format!("corrupted entry at '{path}': {e}"),
            })?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Encode and store a JSON entry.
pub(crate) async fn store_json<T: Serialize>(backend: &dyn SecretsBackend, path: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value).map_err(|e| SecretsError::Serialization { reason: e.to_string() })?;
    backend.put(path, &bytes).await
}

/// In-memory secrets backend for testing.
///
/// Thread-safe and deterministic.
#[derive(Default)]
pub struct InMemorySecretsBackend {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemorySecretsBackend {
    /// Create a new in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Whether the backend holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait]
impl SecretsBackend for InMemorySecretsBackend {
    async fn put(&self, path: &str, value: &[u8]) -> Result<()> {
        let mut data = self.data.write().await;
        data.insert(path.to_string(), value.to_vec());
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let data = self.data.read().await;
        Ok(data.get(path).cloned())
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let mut data = self.data.write().await;
        Ok(data.remove(path).is_some())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let data = self.data.read().await;
        let mut keys = HashSet::new();

        for key in data.keys() {
            if let Some(relative) = key.strip_prefix(prefix) {
                if let Some(slash_pos) = relative.find('/') {
                    keys.insert(format!("{}/", &relative[..slash_pos]));
                } else if !relative.is_empty() {
                    keys.insert(relative.to_string());
                }
            }
        }

        let mut result: Vec<String> = keys.into_iter().collect();
        result.sort();
        Ok(result)
    }
}
