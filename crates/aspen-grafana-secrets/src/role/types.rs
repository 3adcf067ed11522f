//! Role definition types.

use std::fmt;
use std::str::FromStr;

use ipnet::IpNet;
use serde::Deserialize;
use serde::Serialize;

use crate::backend::WriteMode;
use crate::client::Realm;
use crate::config::PlatformKind;
use crate::constants::MAX_ALLOWED_SUBNETS;
use crate::constants::MAX_RBAC_ROLES_PER_ROLE;
use crate::constants::MAX_REALMS_JSON_SIZE;
use crate::constants::MAX_ROLE_NAME_LENGTH;
use crate::constants::MAX_SCOPES_PER_ROLE;
use crate::error::Result;
use crate::error::SecretsError;

/// Kind of credential a role issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// A Grafana Cloud access policy plus a token bound to it.
    CloudAccessPolicy,
    /// A Grafana service account plus a service account token.
    ServiceAccount,
}

impl RoleKind {
    /// Wire name used in role requests and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::CloudAccessPolicy => "cloud_access_policy",
            RoleKind::ServiceAccount => "service_account",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cloud_access_policy" => Ok(RoleKind::CloudAccessPolicy),
            "service_account" => Ok(RoleKind::ServiceAccount),
            _ => Err("type must be either 'cloud_access_policy' or 'service_account'".to_string()),
        }
    }
}

/// A stored role definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    /// Role name (lower case).
    pub name: String,
    /// Provisioning workflow selector. Cannot change after creation.
    #[serde(rename = "type")]
    pub kind: RoleKind,

    // Cloud access policy parameters.
    /// Grafana Cloud region of the access policy.
    #[serde(default)]
    pub region: String,
    /// Access policy scopes, e.g. `logs:read`.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// JSON array of realm descriptors, decoded at issue time.
    #[serde(default)]
    pub realms: String,
    /// CIDR ranges the issued token may be used from.
    #[serde(default)]
    pub allowed_subnets: Vec<String>,

    // Service account parameters.
    /// Cloud stack slug; required when the mount targets Grafana Cloud.
    #[serde(default)]
    pub stack: String,
    /// Basic role of the service account (`Viewer`, `Editor`, `Admin`).
    #[serde(default)]
    pub role: String,
    /// Custom RBAC role names assigned after creation (instances only).
    #[serde(default)]
    pub rbac_roles: Vec<String>,

    /// Lease TTL in seconds; 0 uses the host default.
    #[serde(default)]
    pub ttl_secs: u64,
    /// Lease max TTL in seconds; 0 uses the host default.
    #[serde(default)]
    pub max_ttl_secs: u64,
}

impl RoleEntry {
    /// Create an empty role of the given kind.
    pub fn new(name: impl Into<String>, kind: RoleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            region: String::new(),
            scopes: Vec::new(),
            realms: String::new(),
            allowed_subnets: Vec::new(),
            stack: String::new(),
            role: String::new(),
            rbac_roles: Vec::new(),
            ttl_secs: 0,
            max_ttl_secs: 0,
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> SecretsError {
        SecretsError::InvalidRole {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// Write-time validation.
    ///
    /// `platform` is the currently configured platform, if any. It only decides
    /// whether `stack` is required; kind compatibility is checked at issue time
    /// because the configuration can change after the role is written.
    pub fn validate(&self, platform: Option<PlatformKind>) -> Result<()> {
        match self.kind {
            RoleKind::CloudAccessPolicy => self.validate_access_policy()?,
            RoleKind::ServiceAccount => self.validate_service_account(platform)?,
        }

        if self.ttl_secs > 0 && self.max_ttl_secs > 0 && self.ttl_secs > self.max_ttl_secs {
            return Err(self.invalid("ttl cannot be greater than max_ttl"));
        }

        Ok(())
    }

    fn validate_access_policy(&self) -> Result<()> {
        if self.region.is_empty() {
            return Err(self.invalid("region must not be empty"));
        }

        if self.scopes.is_empty() || self.scopes.iter().any(|s| s.trim().is_empty()) {
            return Err(self.invalid("scopes must not be empty"));
        }
        if self.scopes.len() > MAX_SCOPES_PER_ROLE {
            return Err(self.invalid(format!("too many scopes: {} (max: {MAX_SCOPES_PER_ROLE})", self.scopes.len())));
        }

        if self.realms.len() > MAX_REALMS_JSON_SIZE {
            return Err(self.invalid(format!("realms exceed {MAX_REALMS_JSON_SIZE} bytes")));
        }
        match serde_json::from_str::<serde_json::Value>(&self.realms) {
            Ok(serde_json::Value::Array(_)) => {}
            Ok(_) => return Err(self.invalid("realms must be a JSON array")),
            Err(e) => return Err(self.invalid(format!("realms must be valid JSON: {e}"))),
        }

        if self.allowed_subnets.len() > MAX_ALLOWED_SUBNETS {
            return Err(self.invalid(format!(
                "too many allowed subnets: {} (max: {MAX_ALLOWED_SUBNETS})",
                self.allowed_subnets.len()
            )));
        }
        for subnet in &self.allowed_subnets {
            if subnet.parse::<IpNet>().is_err() {
                return Err(self.invalid(format!("invalid CIDR in allowed_subnets: {subnet}")));
            }
        }

        Ok(())
    }

    fn validate_service_account(&self, platform: Option<PlatformKind>) -> Result<()> {
        if self.role.is_empty() {
            return Err(self.invalid("role must not be empty"));
        }

        if platform == Some(PlatformKind::Cloud) && self.stack.is_empty() {
            return Err(self.invalid("stack must not be empty when the mount targets Grafana Cloud"));
        }

        if self.rbac_roles.len() > MAX_RBAC_ROLES_PER_ROLE {
            return Err(self.invalid(format!(
                "too many rbac roles: {} (max: {MAX_RBAC_ROLES_PER_ROLE})",
                self.rbac_roles.len()
            )));
        }
        if self.rbac_roles.iter().any(|r| r.trim().is_empty()) {
            return Err(self.invalid("rbac role names must not be empty"));
        }

        Ok(())
    }

    /// Issue-time compatibility check against the configured platform.
    ///
    /// | platform | cloud_access_policy | service_account       |
    /// |----------|---------------------|-----------------------|
    /// | cloud    | ok                  | ok if `stack` is set  |
    /// | grafana  | rejected            | ok                    |
    pub fn check_compatible(&self, platform: PlatformKind) -> Result<()> {
        let reason = match (platform, self.kind) {
            (PlatformKind::Instance, RoleKind::CloudAccessPolicy) => {
                "cloud access policy roles require a 'cloud' mount configuration"
            }
            (PlatformKind::Cloud, RoleKind::ServiceAccount) if self.stack.is_empty() => {
                "stack must be set for service accounts on a 'cloud' mount configuration"
            }
            _ => return Ok(()),
        };

        Err(SecretsError::IncompatibleRoleConfig {
            role: self.name.clone(),
            reason: reason.to_string(),
        })
    }

    /// Decode the realms document.
    pub fn parsed_realms(&self) -> Result<Vec<Realm>> {
        if self.realms.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&self.realms).map_err(|e| SecretsError::InvalidRealms {
            reason: format!("unable to decode realms for role '{}': {e}", self.name),
        })
    }
}

/// Validate a role name and return its canonical (lower-case) form.
///
/// Names are word characters, `-` and `.`, and must start and end with a word
/// character.
pub fn validate_role_name(name: &str) -> Result<String> {
    let invalid = |reason: &str| SecretsError::InvalidRoleName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if name.len() > MAX_ROLE_NAME_LENGTH {
        return Err(invalid("name is too long"));
    }

    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    if !name.chars().all(|c| is_word(c) || c == '-' || c == '.') {
        return Err(invalid("name may only contain letters, digits, '_', '-' and '.'"));
    }
    let first = name.chars().next().unwrap_or('-');
    let last = name.chars().next_back().unwrap_or('-');
    if !is_word(first) || !is_word(last) {
        return Err(invalid("name must start and end with a letter, digit or '_'"));
    }

    Ok(name.to_lowercase())
}

/// Field values for a role write. `None` keeps the stored value on update.
#[derive(Debug, Clone, Default)]
pub struct RoleFields {
    pub kind: Option<String>,
    pub region: Option<String>,
    pub scopes: Option<Vec<String>>,
    pub realms: Option<String>,
    pub allowed_subnets: Option<Vec<String>>,
    pub stack: Option<String>,
    pub role: Option<String>,
    pub rbac_roles: Option<Vec<String>>,
    pub ttl_secs: Option<u64>,
    pub max_ttl_secs: Option<u64>,
}

/// Request to create or update a role.
#[derive(Debug, Clone, Default)]
pub struct WriteRoleRequest {
    /// Role name.
    pub name: String,
    /// Create or update.
    pub mode: WriteMode,
    /// Field values.
    pub fields: RoleFields,
}

impl WriteRoleRequest {
    /// A create request for a role of the given kind.
    pub fn create(name: impl Into<String>, kind: RoleKind) -> Self {
        Self {
            name: name.into(),
            mode: WriteMode::Create,
            fields: RoleFields {
                kind: Some(kind.as_str().to_string()),
                ..Default::default()
            },
        }
    }

    /// An update request with no fields set.
    pub fn update(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: WriteMode::Update,
            fields: RoleFields::default(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.fields.region = Some(region.into());
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.fields.scopes = Some(scopes);
        self
    }

    pub fn with_realms(mut self, realms: impl Into<String>) -> Self {
        self.fields.realms = Some(realms.into());
        self
    }

    pub fn with_allowed_subnets(mut self, subnets: Vec<String>) -> Self {
        self.fields.allowed_subnets = Some(subnets);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.fields.stack = Some(stack.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.fields.role = Some(role.into());
        self
    }

    pub fn with_rbac_roles(mut self, rbac_roles: Vec<String>) -> Self {
        self.fields.rbac_roles = Some(rbac_roles);
        self
    }

    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.fields.ttl_secs = Some(ttl_secs);
        self
    }

    pub fn with_max_ttl_secs(mut self, max_ttl_secs: u64) -> Self {
        self.fields.max_ttl_secs = Some(max_ttl_secs);
        self
    }

    /// Merge the request over an existing role. Validation is left to the caller.
    pub(crate) fn apply(self, name: &str, existing: Option<RoleEntry>) -> Result<RoleEntry> {
        let fields = self.fields;

        let requested_kind = match fields.kind.as_deref() {
            Some(raw) => Some(raw.parse::<RoleKind>().map_err(|reason| SecretsError::InvalidRole {
                name: name.to_string(),
                reason,
            })?),
            None => None,
        };

        let mut entry = match (existing, requested_kind) {
            (Some(existing), Some(kind)) if existing.kind != kind => {
                return Err(SecretsError::InvalidRole {
                    name: name.to_string(),
                    reason: format!("type cannot be changed from '{}' to '{}'", existing.kind, kind),
                });
            }
            (Some(existing), _) => existing,
            (None, Some(kind)) => RoleEntry::new(name, kind),
            (None, None) => {
                return Err(SecretsError::InvalidRole {
                    name: name.to_string(),
                    reason: "type must be either 'cloud_access_policy' or 'service_account'".to_string(),
                });
            }
        };

        if let Some(region) = fields.region {
            entry.region = region;
        }
        if let Some(scopes) = fields.scopes {
            entry.scopes = scopes;
        }
        if let Some(realms) = fields.realms {
            entry.realms = realms;
        }
        if let Some(allowed_subnets) = fields.allowed_subnets {
            entry.allowed_subnets = allowed_subnets;
        }
        if let Some(stack) = fields.stack {
            entry.stack = stack;
        }
        if let Some(role) = fields.role {
            entry.role = role;
        }
        if let Some(rbac_roles) = fields.rbac_roles {
            entry.rbac_roles = rbac_roles;
        }
        if let Some(ttl_secs) = fields.ttl_secs {
            entry.ttl_secs = ttl_secs;
        }
        if let Some(max_ttl_secs) = fields.max_ttl_secs {
            entry.max_ttl_secs = max_ttl_secs;
        }

        Ok(entry)
    }
}
