//! Role store implementation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::backend::SecretsBackend;
use crate::backend::WriteMode;
use crate::backend::load_json;
use crate::backend::store_json;
use crate::config::PlatformKind;
use crate::constants::ROLE_STORAGE_PREFIX;
use crate::error::Result;
use crate::error::SecretsError;
use crate::role::types::RoleEntry;
use crate::role::types::WriteRoleRequest;
use crate::role::types::validate_role_name;

/// Persistence for role definitions.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Read a role by name.
    async fn read_role(&self, name: &str) -> Result<Option<RoleEntry>>;

    /// Validate and persist a role write. Returns the stored role.
    ///
    /// `platform` is the kind of the current configuration, if any.
    async fn write_role(&self, request: WriteRoleRequest, platform: Option<PlatformKind>) -> Result<RoleEntry>;

    /// Delete a role. Returns `true` if it existed.
    async fn delete_role(&self, name: &str) -> Result<bool>;

    /// List role names, sorted.
    async fn list_roles(&self) -> Result<Vec<String>>;

    /// Whether a role exists.
    async fn role_exists(&self, name: &str) -> Result<bool>;
}

/// Default role store using SecretsBackend.
pub struct DefaultRoleStore {
    /// Storage backend.
    backend: Arc<dyn SecretsBackend>,
}

impl DefaultRoleStore {
    /// Create a new role store with the given backend.
    pub fn new(backend: Arc<dyn SecretsBackend>) -> Self {
        Self { backend }
    }

    /// Get storage path for a role.
    fn role_path(name: &str) -> String {
        format!("{ROLE_STORAGE_PREFIX}{name}")
    }
}

#[async_trait]
impl RoleStore for DefaultRoleStore {
    async fn read_role(&self, name: &str) -> Result<Option<RoleEntry>> {
        let name = validate_role_name(name)?;
        load_json(self.backend.as_ref(), &Self::role_path(&name)).await
    }

    async fn write_role(&self, request: WriteRoleRequest, platform: Option<PlatformKind>) -> Result<RoleEntry> {
        let name = validate_role_name(&request.name)?;

        let existing = self.read_role(&name).await?;
        if existing.is_none() && request.mode == WriteMode::Update {
            return Err(SecretsError::RoleNotFound { name });
        }

        let role = request.apply(&name, existing)?;
        role.validate(platform)?;

        store_json(self.backend.as_ref(), &Self::role_path(&name), &role).await?;

        debug!(role = %name, kind = %role.kind, "stored role");
        Ok(role)
    }

    async fn delete_role(&self, name: &str) -> Result<bool> {
        let name = validate_role_name(name)?;
        let deleted = self.backend.delete(&Self::role_path(&name)).await?;
        if deleted {
            debug!(role = %name, "deleted role");
        }
        Ok(deleted)
    }

    async fn list_roles(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> =
            self.backend.list(ROLE_STORAGE_PREFIX).await?.into_iter().filter(|k| !k.ends_with('/')).collect();
        names.sort();
        Ok(names)
    }

    async fn role_exists(&self, name: &str) -> Result<bool> {
        let name = validate_role_name(name)?;
        self.backend.exists(&Self::role_path(&name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemorySecretsBackend;
    use crate::role::types::RoleKind;

    fn make_store() -> DefaultRoleStore {
        DefaultRoleStore::new(Arc::new(InMemorySecretsBackend::new()))
    }

    fn service_account(name: &str) -> WriteRoleRequest {
        WriteRoleRequest::create(name, RoleKind::ServiceAccount).with_stack("acme").with_role("Admin")
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let store = make_store();

        let role = store
            .write_role(service_account("Deploy").with_ttl_secs(120).with_max_ttl_secs(3600), Some(PlatformKind::Cloud))
            .await
            .unwrap();
        assert_eq!(role.name, "deploy");

        // Lookups are case-insensitive.
        let loaded = store.read_role("DEPLOY").await.unwrap().unwrap();
        assert_eq!(loaded, role);
        assert_eq!(loaded.ttl_secs, 120);
        assert_eq!(loaded.max_ttl_secs, 3600);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = make_store();
        store.write_role(service_account("sa").with_rbac_roles(vec!["custom".into()]), None).await.unwrap();

        let role = store.write_role(WriteRoleRequest::update("sa").with_role("Viewer"), None).await.unwrap();
        assert_eq!(role.role, "Viewer");
        assert_eq!(role.stack, "acme");
        assert_eq!(role.rbac_roles, vec!["custom".to_string()]);
    }

    #[tokio::test]
    async fn test_update_missing_role() {
        let store = make_store();
        let err = store.write_role(WriteRoleRequest::update("missing").with_role("Viewer"), None).await.unwrap_err();
        assert!(matches!(err, SecretsError::RoleNotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalid_write_is_not_stored() {
        let store = make_store();

        let request = WriteRoleRequest::create("policy", RoleKind::CloudAccessPolicy)
            .with_region("us-east-2")
            .with_scopes(vec!["logs:read".into()])
            .with_realms("test");
        assert!(store.write_role(request, Some(PlatformKind::Cloud)).await.is_err());
        assert!(!store.role_exists("policy").await.unwrap());

        let request = WriteRoleRequest::create("sa", RoleKind::ServiceAccount).with_role("Admin");
        assert!(store.write_role(request, Some(PlatformKind::Cloud)).await.is_err());
        assert!(!store.role_exists("sa").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let store = make_store();
        store.write_role(service_account("b"), None).await.unwrap();
        store.write_role(service_account("a"), None).await.unwrap();

        assert_eq!(store.list_roles().await.unwrap(), vec!["a".to_string(), "b".to_string()]);

        assert!(store.delete_role("a").await.unwrap());
        assert!(!store.delete_role("a").await.unwrap());
        assert_eq!(store.list_roles().await.unwrap(), vec!["b".to_string()]);
    }
}
