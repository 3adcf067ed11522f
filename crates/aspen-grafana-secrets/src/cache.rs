//! Lazily built, shared remote client.
//!
//! The first credential operation after startup (or after a configuration
//! change) builds a client from the stored configuration. Every later request
//! reuses it until a configuration write or delete invalidates it.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::client::ClientResult;
use crate::client::GrafanaApi;
use crate::client::GrafanaClient;
use crate::config::ConfigStore;
use crate::config::GrafanaConfig;
use crate::config::PlatformKind;
use crate::error::Result;
use crate::error::SecretsError;

/// Builds a remote client for a configuration.
pub trait ClientFactory: Send + Sync {
    /// Build a client bound to `config.url` and `config.token`.
    fn build(&self, config: &GrafanaConfig) -> ClientResult<Arc<dyn GrafanaApi>>;
}

/// Factory producing HTTPS clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn build(&self, config: &GrafanaConfig) -> ClientResult<Arc<dyn GrafanaApi>> {
        let client = GrafanaClient::new(&config.url, config.token.clone())?;
        Ok(Arc::new(client))
    }
}

/// A client together with the platform kind of the configuration it was built from.
///
/// Workflows must be selected from `kind` rather than from a separate
/// configuration read, which may already see a newer configuration.
#[derive(Clone)]
pub struct BoundClient {
    /// Platform kind the client talks to.
    pub kind: PlatformKind,
    /// The client.
    pub api: Arc<dyn GrafanaApi>,
}

/// Holds at most one client, built on demand.
///
/// Readers share the cached client under a read lock. Building happens under
/// the write lock with a re-check, so concurrent first requests build once.
/// The configuration is read while the write lock is held; invalidation also
/// takes the write lock, so a client built from a stale configuration can never
/// outlive the invalidation that follows a configuration write.
pub struct ClientCache {
    factory: Arc<dyn ClientFactory>,
    client: RwLock<Option<BoundClient>>,
}

impl ClientCache {
    /// Create an empty cache.
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            client: RwLock::new(None),
        }
    }

    /// Return the cached client, building it from the stored configuration if needed.
    pub async fn get_or_build(&self, configs: &dyn ConfigStore) -> Result<BoundClient> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut slot = self.client.write().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let config = configs.read_config().await?.ok_or(SecretsError::ConfigMissing)?;
        let api = self.factory.build(&config).map_err(|source| SecretsError::Remote {
            operation: "creating client".to_string(),
            source,
        })?;

        debug!(kind = %config.kind, url = %config.url, "built grafana client");
        let client = BoundClient { kind: config.kind, api };
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Drop the cached client. The next request rebuilds it.
    pub async fn invalidate(&self) {
        let mut slot = self.client.write().await;
        if slot.take().is_some() {
            debug!("invalidated grafana client");
        }
    }

    /// Whether a client is currently cached.
    pub async fn is_cached(&self) -> bool {
        self.client.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemorySecretsBackend;
    use crate::config::DefaultConfigStore;
    use crate::config::WriteConfigRequest;
    use crate::testing::CountingClientFactory;

    fn setup() -> (Arc<CountingClientFactory>, ClientCache, DefaultConfigStore) {
        let factory = Arc::new(CountingClientFactory::new());
        let cache = ClientCache::new(factory.clone());
        let configs = DefaultConfigStore::new(Arc::new(InMemorySecretsBackend::new()));
        (factory, cache, configs)
    }

    #[tokio::test]
    async fn test_requires_config() {
        let (factory, cache, configs) = setup();

        let err = cache.get_or_build(&configs).await.err().unwrap();
        assert!(matches!(err, SecretsError::ConfigMissing));
        assert_eq!(factory.builds(), 0);
        assert!(!cache.is_cached().await);
    }

    #[tokio::test]
    async fn test_builds_once() {
        let (factory, cache, configs) = setup();
        configs.write_config(WriteConfigRequest::create("cloud", "T")).await.unwrap();

        cache.get_or_build(&configs).await.unwrap();
        cache.get_or_build(&configs).await.unwrap();
        assert_eq!(factory.builds(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_builds_once() {
        let (factory, cache, configs) = setup();
        configs.write_config(WriteConfigRequest::create("cloud", "T")).await.unwrap();

        let cache = Arc::new(cache);
        let configs = Arc::new(configs);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let configs = configs.clone();
            handles.push(tokio::spawn(async move { cache.get_or_build(configs.as_ref()).await.is_ok() }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(factory.builds(), 1);
    }

    #[tokio::test]
    async fn test_kind_matches_built_client() {
        let (factory, cache, configs) = setup();
        configs.write_config(WriteConfigRequest::create("cloud", "T")).await.unwrap();
        assert_eq!(cache.get_or_build(&configs).await.unwrap().kind, PlatformKind::Cloud);

        // Stored config moves on before invalidation: the cached pair stays consistent.
        configs
            .write_config(WriteConfigRequest::update().with_kind("grafana").with_url("http://localhost:3000"))
            .await
            .unwrap();
        assert_eq!(cache.get_or_build(&configs).await.unwrap().kind, PlatformKind::Cloud);
        assert_eq!(factory.builds(), 1);

        cache.invalidate().await;
        assert_eq!(cache.get_or_build(&configs).await.unwrap().kind, PlatformKind::Instance);
        assert_eq!(factory.builds(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_rebuilds_with_new_config() {
        let (factory, cache, configs) = setup();
        configs.write_config(WriteConfigRequest::create("cloud", "T")).await.unwrap();
        cache.get_or_build(&configs).await.unwrap();

        configs.write_config(WriteConfigRequest::update().with_token("U")).await.unwrap();
        cache.invalidate().await;
        assert!(!cache.is_cached().await);

        cache.get_or_build(&configs).await.unwrap();
        assert_eq!(factory.builds(), 2);
        assert_eq!(factory.last_token().as_deref(), Some("U"));
    }
}
