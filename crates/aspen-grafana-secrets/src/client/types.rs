//! Wire types for the Grafana and Grafana Cloud APIs.
//!
//! Field names follow the remote API (camelCase). Response types default every
//! field so that additions on the remote side never break decoding.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// Cloud Access Policies
// ============================================================================

/// Label selector restricting a realm.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPolicy {
    /// Label selector, e.g. `{namespace="prod"}`.
    pub selector: String,
}

/// Scope of an access policy (an org or a stack).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Realm {
    /// Realm type: `org` or `stack`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Org or stack identifier.
    pub identifier: String,
    /// Optional label restrictions.
    #[serde(default)]
    pub label_policies: Vec<LabelPolicy>,
}

/// Network conditions attached to an access policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicyConditions {
    /// CIDR ranges tokens may be used from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_subnets: Vec<String>,
}

/// Body of `POST /api/v1/accesspolicies`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCloudAccessPolicyInput {
    pub name: String,
    pub display_name: String,
    pub scopes: Vec<String>,
    pub realms: Vec<Realm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<AccessPolicyConditions>,
}

/// An access policy as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CloudAccessPolicy {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub display_name: String,
    pub scopes: Vec<String>,
    pub realms: Vec<Realm>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body of `POST /api/v1/tokens`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCloudAccessPolicyTokenInput {
    pub access_policy_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// An access policy token. `token` is only populated in the create response.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CloudAccessPolicyToken {
    pub id: String,
    pub access_policy_id: String,
    pub name: String,
    pub display_name: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub first_used_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
}

impl std::fmt::Debug for CloudAccessPolicyToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudAccessPolicyToken")
            .field("id", &self.id)
            .field("access_policy_id", &self.access_policy_id)
            .field("name", &self.name)
            .field("expires_at", &self.expires_at)
            .field("token", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Service Accounts
// ============================================================================

/// Body of `POST /api/serviceaccounts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceAccountInput {
    pub name: String,
    /// Basic role: `Viewer`, `Editor`, `Admin` or `None`.
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_disabled: Option<bool>,
}

/// Body of `POST /api/serviceaccounts/{id}/tokens`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceAccountTokenInput {
    pub name: String,
    /// Path parameter, not part of the body.
    #[serde(skip)]
    pub service_account_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_to_live: Option<i64>,
}

/// A service account as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceAccount {
    pub id: i64,
    pub name: String,
    pub login: String,
    pub org_id: i64,
    pub is_disabled: bool,
    pub role: String,
    pub avatar_url: String,
    pub teams: Vec<String>,
}

/// A service account token. `key` is only populated in the create response.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceAccountToken {
    pub id: i64,
    pub name: String,
    pub key: String,
}

impl std::fmt::Debug for ServiceAccountToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountToken")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("key", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// RBAC
// ============================================================================

/// Body of `PUT /api/access-control/users/{id}/roles`.
///
/// Replaces the full set of role assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountRoleAssignmentsInput {
    /// Path parameter, not part of the body.
    #[serde(skip)]
    pub service_account_id: i64,
    pub global: bool,
    pub role_uids: Vec<String>,
    pub include_hidden: bool,
}

/// A single RBAC permission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub action: String,
    pub scope: String,
}

/// A built-in or custom RBAC role. Also used as the create body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RbacRole {
    pub version: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,
    pub name: String,
    pub description: String,
    pub global: bool,
    pub group: String,
    pub display_name: String,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
}

// ============================================================================
// Dashboards
// ============================================================================

/// Read-only dashboard metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardMeta {
    pub is_starred: bool,
    pub slug: String,
    #[serde(rename = "folderId")]
    pub folder: i64,
    pub folder_uid: String,
    pub url: String,
}

/// Response of `GET /api/dashboards/home`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Dashboard {
    #[serde(rename = "dashboard")]
    pub model: serde_json::Value,
    pub folder_id: i64,
    pub meta: DashboardMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_policy_input_wire_names() {
        let input = CreateCloudAccessPolicyInput {
            name: "vault-x".into(),
            display_name: "vault-x".into(),
            scopes: vec!["logs:read".into()],
            realms: vec![Realm {
                kind: "org".into(),
                identifier: "123456".into(),
                label_policies: vec![],
            }],
            conditions: Some(AccessPolicyConditions {
                allowed_subnets: vec!["10.0.0.0/8".into()],
            }),
        };

        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["displayName"], "vault-x");
        assert_eq!(json["realms"][0]["type"], "org");
        assert_eq!(json["realms"][0]["labelPolicies"], serde_json::json!([]));
        assert_eq!(json["conditions"]["allowedSubnets"][0], "10.0.0.0/8");
    }

    #[test]
    fn test_path_parameters_not_serialized() {
        let input = CreateServiceAccountTokenInput {
            name: "vault-x".into(),
            service_account_id: 42,
            seconds_to_live: None,
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "vault-x" }));

        let assignments = ServiceAccountRoleAssignmentsInput {
            service_account_id: 42,
            global: false,
            role_uids: vec!["abc".into()],
            include_hidden: false,
        };
        let json = serde_json::to_value(&assignments).unwrap();
        assert_eq!(json, serde_json::json!({ "global": false, "roleUids": ["abc"], "includeHidden": false }));
    }

    #[test]
    fn test_decode_tolerates_unknown_and_missing_fields() {
        let account: ServiceAccount =
            serde_json::from_str(r#"{"id": 7, "name": "vault-x", "createdAt": "2024-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(account.id, 7);
        assert!(account.teams.is_empty());

        let token: CloudAccessPolicyToken =
            serde_json::from_str(r#"{"id": "t1", "accessPolicyId": "p1", "token": "glc_secret"}"#).unwrap();
        assert_eq!(token.token, "glc_secret");
        assert!(!format!("{token:?}").contains("glc_secret"));
    }
}
