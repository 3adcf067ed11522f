//! Grafana secrets request handler.
//!
//! Handles: config, roles, creds, and the revoke/renew lease callbacks.

pub(crate) mod config;
pub(crate) mod creds;
pub(crate) mod roles;

use std::sync::Arc;

use aspen_grafana_secrets::GrafanaSecretsEngine;
use aspen_grafana_secrets::SecretsError;
use tracing::debug;

use crate::types::GrafanaSecretsRequest;
use crate::types::GrafanaSecretsResponse;

/// Grafana secrets service for one mount.
pub struct GrafanaSecretsService {
    /// Engine serving the mount.
    pub engine: Arc<GrafanaSecretsEngine>,
}

impl GrafanaSecretsService {
    /// Create a new service around an engine.
    pub fn new(engine: Arc<GrafanaSecretsEngine>) -> Self {
        Self { engine }
    }
}

/// Top-level handler dispatching to the config, roles and creds sub-handlers.
pub struct GrafanaSecretsHandler {
    service: Arc<GrafanaSecretsService>,
}

impl GrafanaSecretsHandler {
    /// Create a handler for `service`.
    pub fn new(service: Arc<GrafanaSecretsService>) -> Self {
        Self { service }
    }

    /// Handle one request.
    ///
    /// Engine failures are reported inside the response with `is_success:
    /// false`; the outer error is reserved for requests no sub-handler accepts.
    pub async fn handle(&self, request: GrafanaSecretsRequest) -> anyhow::Result<GrafanaSecretsResponse> {
        debug!(operation = request.operation(), "grafana secrets request");

        if config::ConfigHandler.can_handle(&request) {
            return config::ConfigHandler.handle(request, &self.service).await;
        }
        if roles::RolesHandler.can_handle(&request) {
            return roles::RolesHandler.handle(request, &self.service).await;
        }
        if creds::CredsHandler.can_handle(&request) {
            return creds::CredsHandler.handle(request, &self.service).await;
        }

        Err(anyhow::anyhow!("request not handled by GrafanaSecretsHandler: {}", request.operation()))
    }
}

// =============================================================================
// Error Sanitization
// =============================================================================

/// Sanitize engine errors for client display.
///
/// Validation and remote failures are returned in full; callers need the
/// remote status and body to decide on a retry. Storage internals are hidden.
pub(crate) fn sanitize_grafana_error(error: &SecretsError) -> String {
    match error {
        SecretsError::RoleNotFound { name } => format!("Role not found: {name}"),
        SecretsError::ConfigMissing => "Mount configuration not found. Write 'config' first.".to_string(),
        SecretsError::IncompatibleRoleConfig { role, reason } => {
            format!("Role configuration for '{role}' not compatible with mount configuration: {reason}")
        }
        SecretsError::RbacRoleNotFound { name } => format!("RBAC role does not exist: {name}"),
        SecretsError::InvalidConfig { .. }
        | SecretsError::InvalidRole { .. }
        | SecretsError::InvalidRoleName { .. }
        | SecretsError::InvalidRealms { .. }
        | SecretsError::InvalidTracking { .. }
        | SecretsError::Remote { .. }
        | SecretsError::Compensation { .. } => error.to_string(),

        // All other errors: return a generic message to avoid leaking internals.
        SecretsError::Storage { .. } | SecretsError::Serialization { .. } => "Internal secrets error".to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
