//! Remote platform client for Grafana Cloud and Grafana instances.
//!
//! [`GrafanaApi`] is the seam between the credential workflows and the network:
//! [`GrafanaClient`] implements it over HTTPS, while tests substitute the
//! recording stub in the `testing` module (behind the `testing` feature).
//!
//! The client performs no retries. Every call either succeeds or fails with a
//! [`ClientError`](crate::error::ClientError) that carries the HTTP status and
//! body when the server answered.

mod http;
mod types;

use async_trait::async_trait;
pub use http::GrafanaClient;
pub use types::AccessPolicyConditions;
pub use types::CloudAccessPolicy;
pub use types::CloudAccessPolicyToken;
pub use types::CreateCloudAccessPolicyInput;
pub use types::CreateCloudAccessPolicyTokenInput;
pub use types::CreateServiceAccountInput;
pub use types::CreateServiceAccountTokenInput;
pub use types::Dashboard;
pub use types::DashboardMeta;
pub use types::LabelPolicy;
pub use types::Permission;
pub use types::RbacRole;
pub use types::Realm;
pub use types::ServiceAccount;
pub use types::ServiceAccountRoleAssignmentsInput;
pub use types::ServiceAccountToken;

use crate::error::ClientError;

/// Result alias for remote calls.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Typed operations against the Grafana Cloud and Grafana HTTP APIs.
///
/// Implementations must be safe for concurrent use; a single instance is shared
/// by every request on a mount.
#[async_trait]
pub trait GrafanaApi: Send + Sync {
    // Grafana Cloud access policies

    /// Create an access policy in `region`.
    async fn create_access_policy(
        &self,
        region: &str,
        input: &CreateCloudAccessPolicyInput,
    ) -> ClientResult<CloudAccessPolicy>;

    /// Delete an access policy in `region`.
    async fn delete_access_policy(&self, region: &str, access_policy_id: &str) -> ClientResult<()>;

    /// Mint a token bound to an access policy.
    async fn create_access_policy_token(
        &self,
        region: &str,
        input: &CreateCloudAccessPolicyTokenInput,
    ) -> ClientResult<CloudAccessPolicyToken>;

    // Grafana Cloud stack service accounts

    /// Create a service account inside a cloud stack.
    async fn create_cloud_service_account(
        &self,
        stack: &str,
        input: &CreateServiceAccountInput,
    ) -> ClientResult<ServiceAccount>;

    /// Mint a token for a service account inside a cloud stack.
    async fn create_cloud_service_account_token(
        &self,
        stack: &str,
        input: &CreateServiceAccountTokenInput,
    ) -> ClientResult<ServiceAccountToken>;

    /// Delete a service account inside a cloud stack.
    async fn delete_cloud_service_account(&self, stack: &str, service_account_id: i64) -> ClientResult<()>;

    // Grafana instance service accounts

    /// Create a service account on the configured instance.
    async fn create_service_account(&self, input: &CreateServiceAccountInput) -> ClientResult<ServiceAccount>;

    /// Mint a token for a service account on the configured instance.
    async fn create_service_account_token(
        &self,
        input: &CreateServiceAccountTokenInput,
    ) -> ClientResult<ServiceAccountToken>;

    /// Delete a service account on the configured instance.
    async fn delete_service_account(&self, service_account_id: i64) -> ClientResult<()>;

    // RBAC

    /// Replace the role assignments of a service account.
    async fn set_service_account_role_assignments(&self, input: &ServiceAccountRoleAssignmentsInput)
    -> ClientResult<()>;

    /// List all built-in and custom roles.
    async fn list_roles(&self) -> ClientResult<Vec<RbacRole>>;

    /// Create a custom role.
    async fn create_custom_role(&self, input: &RbacRole) -> ClientResult<RbacRole>;

    /// Delete a custom role, detaching it from any assignees.
    async fn delete_custom_role(&self, role_uid: &str) -> ClientResult<()>;

    // Dashboards

    /// Fetch the home dashboard. Used as an authenticated liveness check.
    async fn home_dashboard(&self) -> ClientResult<Dashboard>;
}
