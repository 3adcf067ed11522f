//! Configuration store implementation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::backend::SecretsBackend;
use crate::backend::WriteMode;
use crate::backend::load_json;
use crate::backend::store_json;
use crate::config::types::GrafanaConfig;
use crate::config::types::WriteConfigRequest;
use crate::constants::CONFIG_STORAGE_PATH;
use crate::error::Result;
use crate::error::SecretsError;

/// Persistence for the singleton mount configuration.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Read the configuration, if one has been written.
    async fn read_config(&self) -> Result<Option<GrafanaConfig>>;

    /// Validate and persist a configuration write. Returns the stored value.
    ///
    /// Nothing is written when validation fails.
    async fn write_config(&self, request: WriteConfigRequest) -> Result<GrafanaConfig>;

    /// Delete the configuration. Returns `true` if one existed.
    async fn delete_config(&self) -> Result<bool>;

    /// Whether a configuration has been written.
    async fn config_exists(&self) -> Result<bool>;
}

/// Default configuration store using SecretsBackend.
pub struct DefaultConfigStore {
    /// Storage backend.
    backend: Arc<dyn SecretsBackend>,
}

impl DefaultConfigStore {
    /// Create a new configuration store with the given backend.
    pub fn new(backend: Arc<dyn SecretsBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ConfigStore for DefaultConfigStore {
    async fn read_config(&self) -> Result<Option<GrafanaConfig>> {
        load_json(self.backend.as_ref(), CONFIG_STORAGE_PATH).await
    }

    async fn write_config(&self, request: WriteConfigRequest) -> Result<GrafanaConfig> {
        let existing = self.read_config().await?;
        if existing.is_none() && request.mode == WriteMode::Update {
            return Err(SecretsError::ConfigMissing);
        }

        let config = request.apply(existing.as_ref())?;
        store_json(self.backend.as_ref(), CONFIG_STORAGE_PATH, &config).await?;

        debug!(kind = %config.kind, url = %config.url, "stored mount configuration");
        Ok(config)
    }

    async fn delete_config(&self) -> Result<bool> {
        self.backend.delete(CONFIG_STORAGE_PATH).await
    }

    async fn config_exists(&self) -> Result<bool> {
        self.backend.exists(CONFIG_STORAGE_PATH).await
    }
}
