//! Error types for the Grafana secrets engine.
//!
//! Two layers:
//! - [`ClientError`]: failures talking to the remote Grafana API (transport,
//!   timeout, non-success status, bad payloads).
//! - [`SecretsError`]: failures of the engine itself (validation, not-found,
//!   remote failures annotated with the step that failed, and compensation
//!   failures after a partially completed provisioning).

use snafu::Snafu;

/// Result alias for engine operations.
pub type Result<T, E = SecretsError> = std::result::Result<T, E>;

/// Errors returned by the remote platform client.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ClientError {
    /// The configured base URL could not be parsed.
    #[snafu(display("invalid base url '{url}': {reason}"))]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Parser error.
        reason: String,
    },

    /// The underlying HTTP client could not be constructed.
    #[snafu(display("error creating http client: {source}"))]
    BuildClient {
        /// Builder error.
        source: reqwest::Error,
    },

    /// The request never produced a response (connect failure, timeout, reset).
    #[snafu(display("error making request {method} {path}: {source}"))]
    Request {
        /// HTTP method.
        method: String,
        /// Request path relative to the base URL.
        path: String,
        /// Transport error.
        source: reqwest::Error,
    },

    /// The server answered with a status above 299.
    #[snafu(display("error response from server ({status}): {body}"))]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated to `MAX_ERROR_BODY_LENGTH`.
        body: String,
    },

    /// The request body could not be serialized.
    #[snafu(display("error encoding request body: {source}"))]
    Encode {
        /// Serialization error.
        source: serde_json::Error,
    },

    /// The response body could not be read or decoded.
    #[snafu(display("error decoding response: {reason}"))]
    Decode {
        /// Description of the decode failure.
        reason: String,
    },
}

impl ClientError {
    /// HTTP status of an API error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors from the Grafana secrets engine.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SecretsError {
    /// Role does not exist.
    #[snafu(display("role not found: {name}"))]
    RoleNotFound {
        /// Role name.
        name: String,
    },

    /// No mount configuration has been written.
    #[snafu(display("mount configuration not found"))]
    ConfigMissing,

    /// Role kind cannot be used with the configured platform kind.
    #[snafu(display("role '{role}' is not compatible with the mount configuration: {reason}"))]
    IncompatibleRoleConfig {
        /// Role name.
        role: String,
        /// Why the pairing is rejected.
        reason: String,
    },

    /// A custom RBAC role named by the role definition does not exist remotely.
    #[snafu(display("rbac role does not exist: {name}"))]
    RbacRoleNotFound {
        /// Missing RBAC role name.
        name: String,
    },

    /// Configuration failed validation.
    #[snafu(display("invalid configuration: {reason}"))]
    InvalidConfig {
        /// Validation failure.
        reason: String,
    },

    /// Role definition failed validation.
    #[snafu(display("invalid role '{name}': {reason}"))]
    InvalidRole {
        /// Role name.
        name: String,
        /// Validation failure.
        reason: String,
    },

    /// Role name is not usable as a storage key.
    #[snafu(display("invalid role name '{name}': {reason}"))]
    InvalidRoleName {
        /// Rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Realms document could not be decoded.
    #[snafu(display("invalid realms: {reason}"))]
    InvalidRealms {
        /// Decode failure.
        reason: String,
    },

    /// Tracking data attached to a lease does not describe a known credential shape.
    #[snafu(display("invalid credential tracking data: {reason}"))]
    InvalidTracking {
        /// What is missing or inconsistent.
        reason: String,
    },

    /// A remote call failed.
    #[snafu(display("error {operation}: {source}"))]
    Remote {
        /// The step that failed, e.g. "creating service account".
        operation: String,
        /// Underlying client error.
        source: ClientError,
    },

    /// A provisioning step failed and undoing earlier steps failed too.
    #[snafu(display("{}; cleanup also failed: {}", cause, failures.join("; ")))]
    Compensation {
        /// The error that triggered the rollback.
        cause: Box<SecretsError>,
        /// One message per compensation that could not be completed.
        failures: Vec<String>,
    },

    /// Storage backend failure.
    #[snafu(display("storage error: {reason}"))]
    Storage {
        /// Description of the failure.
        reason: String,
    },

    /// Stored entry could not be encoded or decoded.
    #[snafu(display("serialization error: {reason}"))]
    Serialization {
        /// Description of the failure.
        reason: String,
    },
}

impl SecretsError {
    /// Whether the error is caused by the request itself rather than by the
    /// remote platform or the storage layer.
    ///
    /// Client errors are reported before any remote call is made.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SecretsError::RoleNotFound { .. }
                | SecretsError::ConfigMissing
                | SecretsError::IncompatibleRoleConfig { .. }
                | SecretsError::RbacRoleNotFound { .. }
                | SecretsError::InvalidConfig { .. }
                | SecretsError::InvalidRole { .. }
                | SecretsError::InvalidRoleName { .. }
                | SecretsError::InvalidRealms { .. }
                | SecretsError::InvalidTracking { .. }
        )
    }

    /// Whether the error is a not-found condition for a role or the configuration.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SecretsError::RoleNotFound { .. } | SecretsError::ConfigMissing)
    }
}
