//! Engine facade for one mount.
//!
//! Wires the configuration store, role store and client cache together and
//! exposes the administrative operations plus the credential lifecycle
//! (issue, revoke, renew).

use std::sync::Arc;

use tracing::info;

use crate::backend::SecretsBackend;
use crate::cache::ClientCache;
use crate::cache::ClientFactory;
use crate::cache::HttpClientFactory;
use crate::config::ConfigStore;
use crate::config::DefaultConfigStore;
use crate::config::GrafanaConfig;
use crate::config::WriteConfigRequest;
use crate::credentials;
use crate::credentials::InternalData;
use crate::credentials::IssuedCredential;
use crate::credentials::Lease;
use crate::credentials::TrackedResource;
use crate::credentials::Workflow;
use crate::error::Result;
use crate::error::SecretsError;
use crate::role::DefaultRoleStore;
use crate::role::RoleEntry;
use crate::role::RoleStore;
use crate::role::WriteRoleRequest;

/// The Grafana secrets engine for one mount.
///
/// Cheap to share behind an `Arc`; every operation takes `&self`.
pub struct GrafanaSecretsEngine {
    configs: Arc<dyn ConfigStore>,
    roles: Arc<dyn RoleStore>,
    clients: ClientCache,
}

impl GrafanaSecretsEngine {
    /// Create an engine that talks to Grafana over HTTPS.
    pub fn new(backend: Arc<dyn SecretsBackend>) -> Self {
        Self::with_client_factory(backend, Arc::new(HttpClientFactory))
    }

    /// Create an engine with a custom client factory.
    pub fn with_client_factory(backend: Arc<dyn SecretsBackend>, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            configs: Arc::new(DefaultConfigStore::new(Arc::clone(&backend))),
            roles: Arc::new(DefaultRoleStore::new(backend)),
            clients: ClientCache::new(factory),
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Read the mount configuration.
    pub async fn read_config(&self) -> Result<Option<GrafanaConfig>> {
        self.configs.read_config().await
    }

    /// Create or update the mount configuration.
    ///
    /// The cached client is dropped after every successful write so the next
    /// credential request uses the new URL and token.
    pub async fn write_config(&self, request: WriteConfigRequest) -> Result<GrafanaConfig> {
        let config = self.configs.write_config(request).await?;
        self.clients.invalidate().await;
        info!(kind = %config.kind, url = %config.url, "mount configuration written");
        Ok(config)
    }

    /// Delete the mount configuration. Returns `true` if one existed.
    pub async fn delete_config(&self) -> Result<bool> {
        let deleted = self.configs.delete_config().await?;
        self.clients.invalidate().await;
        if deleted {
            info!("mount configuration deleted");
        }
        Ok(deleted)
    }

    /// Whether a configuration exists.
    pub async fn config_exists(&self) -> Result<bool> {
        self.configs.config_exists().await
    }

    // ========================================================================
    // Roles
    // ========================================================================

    /// Read a role.
    pub async fn read_role(&self, name: &str) -> Result<Option<RoleEntry>> {
        self.roles.read_role(name).await
    }

    /// Create or update a role, validated against the current configuration.
    pub async fn write_role(&self, request: WriteRoleRequest) -> Result<RoleEntry> {
        let platform = self.configs.read_config().await?.map(|c| c.kind);
        self.roles.write_role(request, platform).await
    }

    /// Delete a role. Deleting a missing role succeeds.
    ///
    /// Credentials already issued from the role stay valid until revoked.
    pub async fn delete_role(&self, name: &str) -> Result<()> {
        self.roles.delete_role(name).await?;
        Ok(())
    }

    /// List role names.
    pub async fn list_roles(&self) -> Result<Vec<String>> {
        self.roles.list_roles().await
    }

    /// Whether a role exists.
    pub async fn role_exists(&self, name: &str) -> Result<bool> {
        self.roles.role_exists(name).await
    }

    // ========================================================================
    // Credential lifecycle
    // ========================================================================

    /// Issue a credential from `role_name`.
    ///
    /// Missing role, missing configuration and incompatible pairings are all
    /// reported before any remote call.
    pub async fn issue_credentials(&self, role_name: &str) -> Result<IssuedCredential> {
        let role = self.roles.read_role(role_name).await?.ok_or_else(|| SecretsError::RoleNotFound {
            name: role_name.to_string(),
        })?;

        // The workflow follows the configuration the client was built from.
        let client = self.clients.get_or_build(self.configs.as_ref()).await?;
        let workflow = Workflow::select(client.kind, &role)?;

        let name = credentials::credential_name();
        let provisioned = credentials::provision(client.api.as_ref(), workflow, &role, &name).await?;

        let internal = InternalData::new(&provisioned.resource, &role.name);
        info!(role = %role.name, credential = %name, resource = ?provisioned.resource, "issued grafana credential");

        Ok(IssuedCredential::new(provisioned.token, internal, Lease::for_role(&role)))
    }

    /// Revoke the credential described by `internal`.
    pub async fn revoke(&self, internal: &InternalData) -> Result<()> {
        let resource = TrackedResource::try_from(internal)?;
        let client = self.clients.get_or_build(self.configs.as_ref()).await?;

        credentials::revoke_resource(client.api.as_ref(), &resource).await?;
        info!(role = %internal.vault_role, resource = ?resource, "revoked grafana credential");
        Ok(())
    }

    /// Renew the lease of the credential described by `internal`.
    ///
    /// Returns the new lease; the caller keeps `lease` unchanged on error.
    pub async fn renew(&self, internal: &InternalData, lease: Lease) -> Result<Lease> {
        if internal.vault_role.is_empty() {
            return Err(SecretsError::InvalidTracking {
                reason: "missing vault_role".to_string(),
            });
        }

        let role = self.roles.read_role(&internal.vault_role).await?;
        credentials::renew_lease(&internal.vault_role, role.as_ref(), lease)
    }
}
