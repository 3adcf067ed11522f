//! Request and response types for the Grafana secrets mount.
//!
//! Field input is loosely typed the way it arrives from API callers: kinds are
//! strings and durations are either seconds or strings like `"5m"`. Parsing
//! into engine requests happens in the handlers.

use aspen_grafana_secrets::InternalData;
use aspen_grafana_secrets::Lease;
use serde::Deserialize;
use serde::Serialize;

/// Requests accepted by [`GrafanaSecretsHandler`](crate::GrafanaSecretsHandler).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GrafanaSecretsRequest {
    // config
    ConfigCreate { fields: ConfigFieldsInput },
    ConfigUpdate { fields: ConfigFieldsInput },
    ConfigRead,
    ConfigDelete,
    ConfigExists,

    // roles/<name>, roles/
    RoleCreate { name: String, fields: RoleFieldsInput },
    RoleUpdate { name: String, fields: RoleFieldsInput },
    RoleRead { name: String },
    RoleDelete { name: String },
    RoleList,
    RoleExists { name: String },

    // creds/<name>
    CredsRead { name: String },
    CredsUpdate { name: String },

    // secret contract callbacks from the host lease manager
    Revoke { internal: InternalData },
    Renew { internal: InternalData, lease: Lease },
}

impl GrafanaSecretsRequest {
    /// Short operation name for logs.
    pub fn operation(&self) -> &'static str {
        match self {
            GrafanaSecretsRequest::ConfigCreate { .. } => "config_create",
            GrafanaSecretsRequest::ConfigUpdate { .. } => "config_update",
            GrafanaSecretsRequest::ConfigRead => "config_read",
            GrafanaSecretsRequest::ConfigDelete => "config_delete",
            GrafanaSecretsRequest::ConfigExists => "config_exists",
            GrafanaSecretsRequest::RoleCreate { .. } => "role_create",
            GrafanaSecretsRequest::RoleUpdate { .. } => "role_update",
            GrafanaSecretsRequest::RoleRead { .. } => "role_read",
            GrafanaSecretsRequest::RoleDelete { .. } => "role_delete",
            GrafanaSecretsRequest::RoleList => "role_list",
            GrafanaSecretsRequest::RoleExists { .. } => "role_exists",
            GrafanaSecretsRequest::CredsRead { .. } => "creds_read",
            GrafanaSecretsRequest::CredsUpdate { .. } => "creds_update",
            GrafanaSecretsRequest::Revoke { .. } => "revoke",
            GrafanaSecretsRequest::Renew { .. } => "renew",
        }
    }
}

/// Configuration fields. Absent fields keep their stored value on update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFieldsInput {
    /// `cloud` or `grafana`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Root token.
    #[serde(default)]
    pub token: Option<String>,
    /// Base URL.
    #[serde(default)]
    pub url: Option<String>,
}

/// A duration given as whole seconds or as a human-readable string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationInput {
    Seconds(i64),
    Text(String),
}

/// Role fields. Absent fields keep their stored value on update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleFieldsInput {
    /// `cloud_access_policy` or `service_account`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    /// JSON array of realms, as a string.
    #[serde(default)]
    pub realms: Option<String>,
    #[serde(default)]
    pub allowed_subnets: Option<Vec<String>>,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub rbac_roles: Option<Vec<String>>,
    #[serde(default)]
    pub ttl: Option<DurationInput>,
    #[serde(default)]
    pub max_ttl: Option<DurationInput>,
}

/// Responses produced by [`GrafanaSecretsHandler`](crate::GrafanaSecretsHandler).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GrafanaSecretsResponse {
    ConfigResult(ConfigResultResponse),
    RoleResult(RoleResultResponse),
    ListResult(ListResultResponse),
    ExistsResult(ExistsResultResponse),
    DeleteResult(DeleteResultResponse),
    CredentialResult(CredentialResultResponse),
    RevokeResult(RevokeResultResponse),
    RenewResult(RenewResultResponse),
}

impl GrafanaSecretsResponse {
    /// Whether the operation succeeded.
    pub fn is_success(&self) -> bool {
        match self {
            GrafanaSecretsResponse::ConfigResult(r) => r.is_success,
            GrafanaSecretsResponse::RoleResult(r) => r.is_success,
            GrafanaSecretsResponse::ListResult(r) => r.is_success,
            GrafanaSecretsResponse::ExistsResult(r) => r.is_success,
            GrafanaSecretsResponse::DeleteResult(r) => r.is_success,
            GrafanaSecretsResponse::CredentialResult(r) => r.is_success,
            GrafanaSecretsResponse::RevokeResult(r) => r.is_success,
            GrafanaSecretsResponse::RenewResult(r) => r.is_success,
        }
    }

    /// Error message of a failed operation.
    pub fn error(&self) -> Option<&str> {
        let error = match self {
            GrafanaSecretsResponse::ConfigResult(r) => &r.error,
            GrafanaSecretsResponse::RoleResult(r) => &r.error,
            GrafanaSecretsResponse::ListResult(r) => &r.error,
            GrafanaSecretsResponse::ExistsResult(r) => &r.error,
            GrafanaSecretsResponse::DeleteResult(r) => &r.error,
            GrafanaSecretsResponse::CredentialResult(r) => &r.error,
            GrafanaSecretsResponse::RevokeResult(r) => &r.error,
            GrafanaSecretsResponse::RenewResult(r) => &r.error,
        };
        error.as_deref()
    }
}

/// Configuration as returned to authorized callers. The token is included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigView {
    #[serde(rename = "type")]
    pub kind: String,
    pub token: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResultResponse {
    pub is_success: bool,
    pub config: Option<ConfigView>,
    pub error: Option<String>,
}

/// Role as returned to callers. TTLs are in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleView {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub region: String,
    pub scopes: Vec<String>,
    pub realms: String,
    pub allowed_subnets: Vec<String>,
    pub stack: String,
    pub role: String,
    pub rbac_roles: Vec<String>,
    pub ttl: u64,
    pub max_ttl: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleResultResponse {
    pub is_success: bool,
    pub role: Option<RoleView>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResultResponse {
    pub is_success: bool,
    pub items: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistsResultResponse {
    pub is_success: bool,
    pub exists: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResultResponse {
    pub is_success: bool,
    pub error: Option<String>,
}

/// An issued secret as handed to the host lease manager.
///
/// `data` goes to the caller; `internal` stays with the lease and is passed
/// back on revoke and renew.
#[derive(Clone, Serialize, Deserialize)]
pub struct IssuedSecret {
    pub secret_type: String,
    pub data: CredentialData,
    pub internal: InternalData,
    pub lease: Lease,
}

impl std::fmt::Debug for IssuedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedSecret")
            .field("secret_type", &self.secret_type)
            .field("data", &"<redacted>")
            .field("internal", &self.internal)
            .field("lease", &self.lease)
            .finish()
    }
}

/// Public part of an issued secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialData {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialResultResponse {
    pub is_success: bool,
    pub secret: Option<IssuedSecret>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeResultResponse {
    pub is_success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewResultResponse {
    pub is_success: bool,
    pub lease: Option<Lease>,
    pub error: Option<String>,
}
