//! Tracking data recorded at issue time and replayed at revoke and renew time.

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

use crate::constants::GRAFANA_TOKEN_TYPE;
use crate::error::Result;
use crate::error::SecretsError;
use crate::rollback::Compensation;
use crate::role::RoleEntry;

/// Flat tracking record, wire-compatible with the host's lease store.
///
/// Which fields are meaningful depends on the credential shape; see
/// [`TrackedResource`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalData {
    /// Issued against a Grafana Cloud mount.
    #[serde(default)]
    pub is_cloud: bool,
    /// Cloud stack of a cloud service account.
    #[serde(default)]
    pub stack: String,
    /// Region of a cloud access policy.
    #[serde(default)]
    pub region: String,
    /// ID of a cloud access policy.
    #[serde(default)]
    pub access_policy_id: String,
    /// ID of a service account (cloud stack or instance).
    #[serde(default, deserialize_with = "deserialize_id")]
    pub service_account_id: i64,
    /// Name of the role the credential was issued from.
    #[serde(default)]
    pub vault_role: String,
}

/// Lease stores may hand numbers back as floats.
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where D: Deserializer<'de> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Int(i64),
        Float(f64),
    }

    match Id::deserialize(deserializer)? {
        Id::Int(id) => Ok(id),
        Id::Float(id) if id.fract() == 0.0 && id >= i64::MIN as f64 && id <= i64::MAX as f64 => Ok(id as i64),
        Id::Float(id) => Err(serde::de::Error::custom(format!("service_account_id is not an integer: {id}"))),
    }
}

impl InternalData {
    /// Tracking record for a freshly provisioned resource.
    pub fn new(resource: &TrackedResource, vault_role: &str) -> Self {
        let mut data = InternalData {
            is_cloud: resource.is_cloud(),
            vault_role: vault_role.to_string(),
            ..Default::default()
        };
        match resource {
            TrackedResource::CloudAccessPolicy {
                region,
                access_policy_id,
            } => {
                data.region = region.clone();
                data.access_policy_id = access_policy_id.clone();
            }
            TrackedResource::CloudServiceAccount {
                stack,
                service_account_id,
            } => {
                data.stack = stack.clone();
                data.service_account_id = *service_account_id;
            }
            TrackedResource::ServiceAccount { service_account_id } => {
                data.service_account_id = *service_account_id;
            }
        }
        data
    }
}

/// The remote resource a credential lives and dies with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackedResource {
    /// Access policy in a Grafana Cloud region. Its token dies with it.
    CloudAccessPolicy { region: String, access_policy_id: String },
    /// Service account inside a Grafana Cloud stack.
    CloudServiceAccount { stack: String, service_account_id: i64 },
    /// Service account on a Grafana instance.
    ServiceAccount { service_account_id: i64 },
}

impl TrackedResource {
    /// Whether the resource lives on Grafana Cloud.
    pub fn is_cloud(&self) -> bool {
        !matches!(self, TrackedResource::ServiceAccount { .. })
    }

    /// The deletion that revokes the credential.
    pub fn compensation(&self) -> Compensation {
        match self {
            TrackedResource::CloudAccessPolicy {
                region,
                access_policy_id,
            } => Compensation::DeleteAccessPolicy {
                region: region.clone(),
                access_policy_id: access_policy_id.clone(),
            },
            TrackedResource::CloudServiceAccount {
                stack,
                service_account_id,
            } => Compensation::DeleteCloudServiceAccount {
                stack: stack.clone(),
                service_account_id: *service_account_id,
            },
            TrackedResource::ServiceAccount { service_account_id } => Compensation::DeleteServiceAccount {
                service_account_id: *service_account_id,
            },
        }
    }
}

impl TryFrom<&InternalData> for TrackedResource {
    type Error = SecretsError;

    /// Shape rules: cloud with a stack is a cloud service account, cloud without
    /// a stack is an access policy, anything else is an instance service account.
    fn try_from(data: &InternalData) -> Result<Self> {
        let missing = |field: &str| SecretsError::InvalidTracking {
            reason: format!("missing {field}"),
        };

        match (data.is_cloud, data.stack.is_empty()) {
            (true, false) => {
                if data.service_account_id <= 0 {
                    return Err(missing("service_account_id"));
                }
                Ok(TrackedResource::CloudServiceAccount {
                    stack: data.stack.clone(),
                    service_account_id: data.service_account_id,
                })
            }
            (true, true) => {
                if data.access_policy_id.is_empty() {
                    return Err(missing("access_policy_id"));
                }
                if data.region.is_empty() {
                    return Err(missing("region"));
                }
                Ok(TrackedResource::CloudAccessPolicy {
                    region: data.region.clone(),
                    access_policy_id: data.access_policy_id.clone(),
                })
            }
            (false, _) => {
                if data.service_account_id <= 0 {
                    return Err(missing("service_account_id"));
                }
                Ok(TrackedResource::ServiceAccount {
                    service_account_id: data.service_account_id,
                })
            }
        }
    }
}

/// Lease parameters. Zero leaves the host default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Lease TTL in seconds.
    pub ttl_secs: u64,
    /// Maximum lease lifetime in seconds.
    pub max_ttl_secs: u64,
}

impl Lease {
    /// Lease for a credential issued from `role`.
    pub fn for_role(role: &RoleEntry) -> Self {
        Self::default().renewed(role)
    }

    /// Apply the role's non-zero TTLs, keeping the current value otherwise.
    pub fn renewed(self, role: &RoleEntry) -> Self {
        Self {
            ttl_secs: if role.ttl_secs > 0 { role.ttl_secs } else { self.ttl_secs },
            max_ttl_secs: if role.max_ttl_secs > 0 {
                role.max_ttl_secs
            } else {
                self.max_ttl_secs
            },
        }
    }
}

/// A freshly issued credential.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct IssuedCredential {
    /// Secret type identifier registered with the host.
    pub secret_type: &'static str,
    /// The token handed to the caller.
    pub token: String,
    /// Tracking data kept with the lease; never echoed to the caller.
    pub internal: InternalData,
    /// Lease parameters from the role.
    pub lease: Lease,
}

impl IssuedCredential {
    pub(crate) fn new(token: String, internal: InternalData, lease: Lease) -> Self {
        Self {
            secret_type: GRAFANA_TOKEN_TYPE,
            token,
            internal,
            lease,
        }
    }
}

impl fmt::Debug for IssuedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCredential")
            .field("secret_type", &self.secret_type)
            .field("token", &"<redacted>")
            .field("internal", &self.internal)
            .field("lease", &self.lease)
            .finish()
    }
}
