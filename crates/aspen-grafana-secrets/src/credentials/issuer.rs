//! Credential provisioning workflows.
//!
//! Three workflows, selected by platform kind and role kind:
//!
//! | platform | role kind           | remote steps                                         |
//! |----------|---------------------|------------------------------------------------------|
//! | cloud    | cloud_access_policy | create policy, create token                          |
//! | cloud    | service_account     | create stack service account, create token           |
//! | grafana  | service_account     | create service account, [assign rbac roles], token   |
//!
//! The first resource created is the unit of compensation: any later failure
//! deletes it exactly once before the error is returned.

use snafu::ResultExt;
use tracing::debug;
use uuid::Uuid;

use crate::client::AccessPolicyConditions;
use crate::client::CreateCloudAccessPolicyInput;
use crate::client::CreateCloudAccessPolicyTokenInput;
use crate::client::CreateServiceAccountInput;
use crate::client::CreateServiceAccountTokenInput;
use crate::client::GrafanaApi;
use crate::client::ServiceAccountRoleAssignmentsInput;
use crate::config::PlatformKind;
use crate::constants::CREDENTIAL_NAME_PREFIX;
use crate::credentials::tracking::TrackedResource;
use crate::error::ClientError;
use crate::error::RemoteSnafu;
use crate::error::Result;
use crate::error::SecretsError;
use crate::role::RoleEntry;
use crate::role::RoleKind;
use crate::rollback::Compensation;
use crate::rollback::RollbackStack;

/// Provisioning workflow for one (platform, role kind) pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    /// Grafana Cloud access policy plus policy token.
    CloudAccessPolicy,
    /// Service account inside a Grafana Cloud stack plus its token.
    CloudServiceAccount,
    /// Service account on a Grafana instance, optional RBAC roles, plus its token.
    InstanceServiceAccount,
}

impl Workflow {
    /// Pick the workflow for `role` under `platform`.
    ///
    /// Fails with [`SecretsError::IncompatibleRoleConfig`] for pairings that
    /// cannot issue, before anything touches the remote platform.
    pub fn select(platform: PlatformKind, role: &RoleEntry) -> Result<Self> {
        role.check_compatible(platform)?;

        Ok(match (platform, role.kind) {
            (PlatformKind::Cloud, RoleKind::CloudAccessPolicy) => Workflow::CloudAccessPolicy,
            (PlatformKind::Cloud, RoleKind::ServiceAccount) => Workflow::CloudServiceAccount,
            (PlatformKind::Instance, RoleKind::ServiceAccount) => Workflow::InstanceServiceAccount,
            (PlatformKind::Instance, RoleKind::CloudAccessPolicy) => {
                return Err(SecretsError::IncompatibleRoleConfig {
                    role: role.name.clone(),
                    reason: "cloud access policy roles require a 'cloud' mount configuration".to_string(),
                });
            }
        })
    }
}

/// Result of a successful provisioning run.
#[derive(Clone, PartialEq, Eq)]
pub struct ProvisionedToken {
    /// Token minted for the caller.
    pub token: String,
    /// Resource to delete on revocation.
    pub resource: TrackedResource,
}

impl std::fmt::Debug for ProvisionedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionedToken")
            .field("token", &"<redacted>")
            .field("resource", &self.resource)
            .finish()
    }
}

/// Fresh display name for the remote resources of one credential.
pub fn credential_name() -> String {
    format!("{CREDENTIAL_NAME_PREFIX}{}", Uuid::new_v4())
}

/// Run `workflow` for `role`, naming every created resource `name`.
pub async fn provision(
    api: &dyn GrafanaApi,
    workflow: Workflow,
    role: &RoleEntry,
    name: &str,
) -> Result<ProvisionedToken> {
    debug!(role = %role.name, workflow = ?workflow, credential = %name, "provisioning credential");

    match workflow {
        Workflow::CloudAccessPolicy => provision_access_policy(api, role, name).await,
        Workflow::CloudServiceAccount => provision_cloud_service_account(api, role, name).await,
        Workflow::InstanceServiceAccount => provision_instance_service_account(api, role, name).await,
    }
}

/// A create response without a token is a failed step.
fn require_token(token: String, operation: &str) -> Result<String> {
    if token.is_empty() {
        return Err(SecretsError::Remote {
            operation: operation.to_string(),
            source: ClientError::Decode {
                reason: "response did not include a token".to_string(),
            },
        });
    }
    Ok(token)
}

async fn provision_access_policy(api: &dyn GrafanaApi, role: &RoleEntry, name: &str) -> Result<ProvisionedToken> {
    // Decode before the first remote call so a bad document leaves nothing behind.
    let realms = role.parsed_realms()?;

    let input = CreateCloudAccessPolicyInput {
        name: name.to_string(),
        display_name: name.to_string(),
        scopes: role.scopes.clone(),
        realms,
        conditions: (!role.allowed_subnets.is_empty()).then(|| AccessPolicyConditions {
            allowed_subnets: role.allowed_subnets.clone(),
        }),
    };
    let policy = api.create_access_policy(&role.region, &input).await.context(RemoteSnafu {
        operation: "creating cloud access policy",
    })?;

    let mut rollback = RollbackStack::new(api);
    rollback.push(Compensation::DeleteAccessPolicy {
        region: role.region.clone(),
        access_policy_id: policy.id.clone(),
    });

    let token_input = CreateCloudAccessPolicyTokenInput {
        access_policy_id: policy.id.clone(),
        name: name.to_string(),
        display_name: name.to_string(),
        expires_at: None,
    };
    let token = rollback
        .step(async {
            let operation = "creating cloud access policy token";
            let token = api
                .create_access_policy_token(&role.region, &token_input)
                .await
                .context(RemoteSnafu { operation })?;
            require_token(token.token, operation)
        })
        .await?;

    rollback.commit();
    Ok(ProvisionedToken {
        token,
        resource: TrackedResource::CloudAccessPolicy {
            region: role.region.clone(),
            access_policy_id: policy.id,
        },
    })
}

async fn provision_cloud_service_account(
    api: &dyn GrafanaApi,
    role: &RoleEntry,
    name: &str,
) -> Result<ProvisionedToken> {
    let input = CreateServiceAccountInput {
        name: name.to_string(),
        role: role.role.clone(),
        is_disabled: None,
    };
    let account = api.create_cloud_service_account(&role.stack, &input).await.context(RemoteSnafu {
        operation: "creating service account",
    })?;

    let mut rollback = RollbackStack::new(api);
    rollback.push(Compensation::DeleteCloudServiceAccount {
        stack: role.stack.clone(),
        service_account_id: account.id,
    });

    let token_input = CreateServiceAccountTokenInput {
        name: name.to_string(),
        service_account_id: account.id,
        seconds_to_live: None,
    };
    let token = rollback
        .step(async {
            let operation = "creating service account token";
            let token = api
                .create_cloud_service_account_token(&role.stack, &token_input)
                .await
                .context(RemoteSnafu { operation })?;
            require_token(token.key, operation)
        })
        .await?;

    rollback.commit();
    Ok(ProvisionedToken {
        token,
        resource: TrackedResource::CloudServiceAccount {
            stack: role.stack.clone(),
            service_account_id: account.id,
        },
    })
}

async fn provision_instance_service_account(
    api: &dyn GrafanaApi,
    role: &RoleEntry,
    name: &str,
) -> Result<ProvisionedToken> {
    let input = CreateServiceAccountInput {
        name: name.to_string(),
        role: role.role.clone(),
        is_disabled: None,
    };
    let account = api.create_service_account(&input).await.context(RemoteSnafu {
        operation: "creating service account",
    })?;

    let mut rollback = RollbackStack::new(api);
    rollback.push(Compensation::DeleteServiceAccount {
        service_account_id: account.id,
    });

    if !role.rbac_roles.is_empty() {
        let role_uids = rollback.step(resolve_rbac_roles(api, &role.rbac_roles)).await?;

        let assignments = ServiceAccountRoleAssignmentsInput {
            service_account_id: account.id,
            global: false,
            role_uids,
            include_hidden: false,
        };
        rollback
            .step(async {
                api.set_service_account_role_assignments(&assignments).await.context(RemoteSnafu {
                    operation: "setting service account role assignments",
                })
            })
            .await?;
    }

    let token_input = CreateServiceAccountTokenInput {
        name: name.to_string(),
        service_account_id: account.id,
        seconds_to_live: None,
    };
    let token = rollback
        .step(async {
            let operation = "creating service account token";
            let token = api.create_service_account_token(&token_input).await.context(RemoteSnafu { operation })?;
            require_token(token.key, operation)
        })
        .await?;

    rollback.commit();
    Ok(ProvisionedToken {
        token,
        resource: TrackedResource::ServiceAccount {
            service_account_id: account.id,
        },
    })
}

/// Resolve custom RBAC role names to UIDs, preserving order.
async fn resolve_rbac_roles(api: &dyn GrafanaApi, names: &[String]) -> Result<Vec<String>> {
    let available = api.list_roles().await.context(RemoteSnafu {
        operation: "listing rbac roles",
    })?;

    names
        .iter()
        .map(|name| {
            available
                .iter()
                .find(|r| &r.name == name && !r.uid.is_empty())
                .map(|r| r.uid.clone())
                .ok_or_else(|| SecretsError::RbacRoleNotFound { name: name.clone() })
        })
        .collect()
}
