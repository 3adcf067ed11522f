//! Test doubles for the remote platform.
//!
//! [`MockGrafanaApi`] records every call in order, hands out sequential IDs and
//! unique tokens, and can be told to fail specific operations with an HTTP
//! status. [`CountingClientFactory`] hands the same mock to the client cache and
//! counts how often a client was built.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cache::ClientFactory;
use crate::client::ClientResult;
use crate::client::CloudAccessPolicy;
use crate::client::CloudAccessPolicyToken;
use crate::client::CreateCloudAccessPolicyInput;
use crate::client::CreateCloudAccessPolicyTokenInput;
use crate::client::CreateServiceAccountInput;
use crate::client::CreateServiceAccountTokenInput;
use crate::client::Dashboard;
use crate::client::GrafanaApi;
use crate::client::RbacRole;
use crate::client::ServiceAccount;
use crate::client::ServiceAccountRoleAssignmentsInput;
use crate::client::ServiceAccountToken;
use crate::config::GrafanaConfig;
use crate::error::ClientError;

/// One recorded call against [`MockGrafanaApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    CreateAccessPolicy {
        region: String,
        input: CreateCloudAccessPolicyInput,
    },
    DeleteAccessPolicy {
        region: String,
        access_policy_id: String,
    },
    CreateAccessPolicyToken {
        region: String,
        access_policy_id: String,
    },
    CreateCloudServiceAccount {
        stack: String,
        input: CreateServiceAccountInput,
    },
    CreateCloudServiceAccountToken {
        stack: String,
        service_account_id: i64,
    },
    DeleteCloudServiceAccount {
        stack: String,
        service_account_id: i64,
    },
    CreateServiceAccount {
        input: CreateServiceAccountInput,
    },
    CreateServiceAccountToken {
        service_account_id: i64,
    },
    DeleteServiceAccount {
        service_account_id: i64,
    },
    SetRoleAssignments {
        service_account_id: i64,
        role_uids: Vec<String>,
    },
    ListRoles,
    CreateCustomRole {
        name: String,
    },
    DeleteCustomRole {
        role_uid: String,
    },
    HomeDashboard,
}

impl ApiCall {
    /// Operation name, matching the [`GrafanaApi`] method name.
    pub fn operation(&self) -> &'static str {
        match self {
            ApiCall::CreateAccessPolicy { .. } => "create_access_policy",
            ApiCall::DeleteAccessPolicy { .. } => "delete_access_policy",
            ApiCall::CreateAccessPolicyToken { .. } => "create_access_policy_token",
            ApiCall::CreateCloudServiceAccount { .. } => "create_cloud_service_account",
            ApiCall::CreateCloudServiceAccountToken { .. } => "create_cloud_service_account_token",
            ApiCall::DeleteCloudServiceAccount { .. } => "delete_cloud_service_account",
            ApiCall::CreateServiceAccount { .. } => "create_service_account",
            ApiCall::CreateServiceAccountToken { .. } => "create_service_account_token",
            ApiCall::DeleteServiceAccount { .. } => "delete_service_account",
            ApiCall::SetRoleAssignments { .. } => "set_service_account_role_assignments",
            ApiCall::ListRoles => "list_roles",
            ApiCall::CreateCustomRole { .. } => "create_custom_role",
            ApiCall::DeleteCustomRole { .. } => "delete_custom_role",
            ApiCall::HomeDashboard => "home_dashboard",
        }
    }

    /// Whether the call deletes a remote resource.
    pub fn is_delete(&self) -> bool {
        self.operation().starts_with("delete_")
    }
}

#[derive(Default)]
struct MockState {
    calls: Vec<ApiCall>,
    failures: HashMap<String, u16>,
    next_id: i64,
    rbac_roles: Vec<RbacRole>,
}

impl MockState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Recording, in-process stand-in for the Grafana APIs.
#[derive(Default)]
pub struct MockGrafanaApi {
    state: Mutex<MockState>,
}

impl MockGrafanaApi {
    /// Create a mock with no RBAC roles and no injected failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a custom RBAC role visible to `list_roles`.
    pub fn with_rbac_role(mut self, name: &str, uid: &str) -> Self {
        self.state.get_mut().rbac_roles.push(RbacRole {
            uid: uid.to_string(),
            name: name.to_string(),
            ..Default::default()
        });
        self
    }

    /// Make every later call to `operation` fail with an API error carrying `status`.
    pub async fn fail_on(&self, operation: &str, status: u16) {
        self.state.lock().await.failures.insert(operation.to_string(), status);
    }

    /// Remove all injected failures.
    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().await.calls.clone()
    }

    /// Number of calls made so far.
    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls.len()
    }

    /// Deletion calls made so far, in order.
    pub async fn deletes(&self) -> Vec<ApiCall> {
        self.state.lock().await.calls.iter().filter(|c| c.is_delete()).cloned().collect()
    }

    /// Record `call`, then fail if a failure was injected for its operation.
    async fn record(&self, call: ApiCall) -> ClientResult<tokio::sync::MutexGuard<'_, MockState>> {
        let mut state = self.state.lock().await;
        let operation = call.operation();
        state.calls.push(call);

        if let Some(status) = state.failures.get(operation) {
            return Err(ClientError::Api {
                status: *status,
                body: format!("{{\"message\":\"injected failure for {operation}\"}}"),
            });
        }
        Ok(state)
    }
}

fn unique_token(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

#[async_trait]
impl GrafanaApi for MockGrafanaApi {
    async fn create_access_policy(
        &self,
        region: &str,
        input: &CreateCloudAccessPolicyInput,
    ) -> ClientResult<CloudAccessPolicy> {
        let mut state = self
            .record(ApiCall::CreateAccessPolicy {
                region: region.to_string(),
                input: input.clone(),
            })
            .await?;
        let id = state.next_id();
        Ok(CloudAccessPolicy {
            id: format!("ap-{id}"),
            name: input.name.clone(),
            display_name: input.display_name.clone(),
            scopes: input.scopes.clone(),
            realms: input.realms.clone(),
            ..Default::default()
        })
    }

    async fn delete_access_policy(&self, region: &str, access_policy_id: &str) -> ClientResult<()> {
        self.record(ApiCall::DeleteAccessPolicy {
            region: region.to_string(),
            access_policy_id: access_policy_id.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn create_access_policy_token(
        &self,
        region: &str,
        input: &CreateCloudAccessPolicyTokenInput,
    ) -> ClientResult<CloudAccessPolicyToken> {
        let mut state = self
            .record(ApiCall::CreateAccessPolicyToken {
                region: region.to_string(),
                access_policy_id: input.access_policy_id.clone(),
            })
            .await?;
        let id = state.next_id();
        Ok(CloudAccessPolicyToken {
            id: format!("tok-{id}"),
            access_policy_id: input.access_policy_id.clone(),
            name: input.name.clone(),
            token: unique_token("glc"),
            ..Default::default()
        })
    }

    async fn create_cloud_service_account(
        &self,
        stack: &str,
        input: &CreateServiceAccountInput,
    ) -> ClientResult<ServiceAccount> {
        let mut state = self
            .record(ApiCall::CreateCloudServiceAccount {
                stack: stack.to_string(),
                input: input.clone(),
            })
            .await?;
        Ok(ServiceAccount {
            id: state.next_id(),
            name: input.name.clone(),
            role: input.role.clone(),
            ..Default::default()
        })
    }

    async fn create_cloud_service_account_token(
        &self,
        stack: &str,
        input: &CreateServiceAccountTokenInput,
    ) -> ClientResult<ServiceAccountToken> {
        let mut state = self
            .record(ApiCall::CreateCloudServiceAccountToken {
                stack: stack.to_string(),
                service_account_id: input.service_account_id,
            })
            .await?;
        Ok(ServiceAccountToken {
            id: state.next_id(),
            name: input.name.clone(),
            key: unique_token("glsa"),
        })
    }

    async fn delete_cloud_service_account(&self, stack: &str, service_account_id: i64) -> ClientResult<()> {
        self.record(ApiCall::DeleteCloudServiceAccount {
            stack: stack.to_string(),
            service_account_id,
        })
        .await?;
        Ok(())
    }

    async fn create_service_account(&self, input: &CreateServiceAccountInput) -> ClientResult<ServiceAccount> {
        let mut state = self.record(ApiCall::CreateServiceAccount { input: input.clone() }).await?;
        Ok(ServiceAccount {
            id: state.next_id(),
            name: input.name.clone(),
            role: input.role.clone(),
            ..Default::default()
        })
    }

    async fn create_service_account_token(
        &self,
        input: &CreateServiceAccountTokenInput,
    ) -> ClientResult<ServiceAccountToken> {
        let mut state = self
            .record(ApiCall::CreateServiceAccountToken {
                service_account_id: input.service_account_id,
            })
            .await?;
        Ok(ServiceAccountToken {
            id: state.next_id(),
            name: input.name.clone(),
            key: unique_token("glsa"),
        })
    }

    async fn delete_service_account(&self, service_account_id: i64) -> ClientResult<()> {
        self.record(ApiCall::DeleteServiceAccount { service_account_id }).await?;
        Ok(())
    }

    async fn set_service_account_role_assignments(
        &self,
        input: &ServiceAccountRoleAssignmentsInput,
    ) -> ClientResult<()> {
        self.record(ApiCall::SetRoleAssignments {
            service_account_id: input.service_account_id,
            role_uids: input.role_uids.clone(),
        })
        .await?;
        Ok(())
    }

    async fn list_roles(&self) -> ClientResult<Vec<RbacRole>> {
        let state = self.record(ApiCall::ListRoles).await?;
        Ok(state.rbac_roles.clone())
    }

    async fn create_custom_role(&self, input: &RbacRole) -> ClientResult<RbacRole> {
        let mut state = self
            .record(ApiCall::CreateCustomRole {
                name: input.name.clone(),
            })
            .await?;
        let mut role = input.clone();
        if role.uid.is_empty() {
            role.uid = format!("role-{}", state.next_id());
        }
        state.rbac_roles.push(role.clone());
        Ok(role)
    }

    async fn delete_custom_role(&self, role_uid: &str) -> ClientResult<()> {
        let mut state = self
            .record(ApiCall::DeleteCustomRole {
                role_uid: role_uid.to_string(),
            })
            .await?;
        state.rbac_roles.retain(|r| r.uid != role_uid);
        Ok(())
    }

    async fn home_dashboard(&self) -> ClientResult<Dashboard> {
        self.record(ApiCall::HomeDashboard).await?;
        Ok(Dashboard::default())
    }
}

/// Client factory that always returns one shared [`MockGrafanaApi`].
pub struct CountingClientFactory {
    api: Arc<MockGrafanaApi>,
    builds: AtomicUsize,
    last_token: StdMutex<Option<String>>,
}

impl CountingClientFactory {
    /// Factory around a fresh mock.
    pub fn new() -> Self {
        Self::with_api(Arc::new(MockGrafanaApi::new()))
    }

    /// Factory around an existing mock.
    pub fn with_api(api: Arc<MockGrafanaApi>) -> Self {
        Self {
            api,
            builds: AtomicUsize::new(0),
            last_token: StdMutex::new(None),
        }
    }

    /// The shared mock.
    pub fn api(&self) -> Arc<MockGrafanaApi> {
        Arc::clone(&self.api)
    }

    /// How many clients were built.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Token of the configuration used for the most recent build.
    pub fn last_token(&self) -> Option<String> {
        self.last_token.lock().ok().and_then(|guard| guard.clone())
    }
}

impl Default for CountingClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientFactory for CountingClientFactory {
    fn build(&self, config: &GrafanaConfig) -> ClientResult<Arc<dyn GrafanaApi>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_token.lock() {
            *last = Some(config.token.clone());
        }
        let api: Arc<dyn GrafanaApi> = self.api.clone();
        Ok(api)
    }
}
