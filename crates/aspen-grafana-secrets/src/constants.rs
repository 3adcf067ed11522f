//! Constants for the Grafana secrets engine.
//!
//! Tiger Style: limits are explicit and fixed so that role definitions and
//! remote responses cannot grow without bound.

use std::time::Duration;

// ============================================================================
// Storage Layout
// ============================================================================

/// Storage key holding the singleton mount configuration.
pub const CONFIG_STORAGE_PATH: &str = "config";

/// Storage prefix for role definitions (`roles/<name>`).
pub const ROLE_STORAGE_PREFIX: &str = "roles/";

// ============================================================================
// Remote Platform
// ============================================================================

/// Base URL used for Grafana Cloud when the configuration omits one.
pub const DEFAULT_GRAFANA_CLOUD_URL: &str = "https://grafana.com";

/// Timeout applied to every outbound request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Prefix of the display name given to every remote resource created for a credential.
///
/// The full name is `{CREDENTIAL_NAME_PREFIX}{uuid}` so leaked resources can be
/// found and cleaned up by hand.
pub const CREDENTIAL_NAME_PREFIX: &str = "vault-";

// ============================================================================
// Secret Contract
// ============================================================================

/// Secret type identifier registered with the host lease manager.
pub const GRAFANA_TOKEN_TYPE: &str = "grafana_token";

// ============================================================================
// Role Limits
// ============================================================================

/// Maximum role name length.
pub const MAX_ROLE_NAME_LENGTH: usize = 128;

/// Maximum number of scopes on a cloud access policy role.
pub const MAX_SCOPES_PER_ROLE: usize = 64;

/// Maximum number of allowed subnets on a cloud access policy role.
pub const MAX_ALLOWED_SUBNETS: usize = 64;

/// Maximum number of custom RBAC roles attached to a service account.
pub const MAX_RBAC_ROLES_PER_ROLE: usize = 32;

/// Maximum size of the realms JSON document in bytes.
pub const MAX_REALMS_JSON_SIZE: usize = 64 * 1024;

/// Maximum size of an error body echoed back from the remote platform.
///
/// Larger bodies are truncated before being folded into error messages.
pub const MAX_ERROR_BODY_LENGTH: usize = 4096;
