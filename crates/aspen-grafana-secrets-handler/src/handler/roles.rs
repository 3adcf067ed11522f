//! Role handler functions.

use aspen_grafana_secrets::RoleEntry;
use aspen_grafana_secrets::WriteMode;
use tracing::debug;
use tracing::warn;

use super::GrafanaSecretsService;
use super::sanitize_grafana_error;
use crate::fields::role_request;
use crate::types::DeleteResultResponse;
use crate::types::ExistsResultResponse;
use crate::types::GrafanaSecretsRequest;
use crate::types::GrafanaSecretsResponse;
use crate::types::ListResultResponse;
use crate::types::RoleFieldsInput;
use crate::types::RoleResultResponse;
use crate::types::RoleView;

/// Sub-handler for the `roles/` paths.
pub(crate) struct RolesHandler;

impl RolesHandler {
    pub(crate) fn can_handle(&self, request: &GrafanaSecretsRequest) -> bool {
        matches!(
            request,
            GrafanaSecretsRequest::RoleCreate { .. }
                | GrafanaSecretsRequest::RoleUpdate { .. }
                | GrafanaSecretsRequest::RoleRead { .. }
                | GrafanaSecretsRequest::RoleDelete { .. }
                | GrafanaSecretsRequest::RoleList
                | GrafanaSecretsRequest::RoleExists { .. }
        )
    }

    pub(crate) async fn handle(
        &self,
        request: GrafanaSecretsRequest,
        service: &GrafanaSecretsService,
    ) -> anyhow::Result<GrafanaSecretsResponse> {
        match request {
            GrafanaSecretsRequest::RoleCreate { name, fields } => {
                handle_role_write(service, name, WriteMode::Create, fields).await
            }
            GrafanaSecretsRequest::RoleUpdate { name, fields } => {
                handle_role_write(service, name, WriteMode::Update, fields).await
            }
            GrafanaSecretsRequest::RoleRead { name } => handle_role_read(service, name).await,
            GrafanaSecretsRequest::RoleDelete { name } => handle_role_delete(service, name).await,
            GrafanaSecretsRequest::RoleList => handle_role_list(service).await,
            GrafanaSecretsRequest::RoleExists { name } => handle_role_exists(service, name).await,
            _ => Err(anyhow::anyhow!("request not handled by RolesHandler")),
        }
    }
}

fn role_view(role: RoleEntry) -> RoleView {
    RoleView {
        name: role.name,
        kind: role.kind.as_str().to_string(),
        region: role.region,
        scopes: role.scopes,
        realms: role.realms,
        allowed_subnets: role.allowed_subnets,
        stack: role.stack,
        role: role.role,
        rbac_roles: role.rbac_roles,
        ttl: role.ttl_secs,
        max_ttl: role.max_ttl_secs,
    }
}

fn role_failure(error: String) -> GrafanaSecretsResponse {
    GrafanaSecretsResponse::RoleResult(RoleResultResponse {
        is_success: false,
        role: None,
        error: Some(error),
    })
}

async fn handle_role_write(
    service: &GrafanaSecretsService,
    name: String,
    mode: WriteMode,
    fields: RoleFieldsInput,
) -> anyhow::Result<GrafanaSecretsResponse> {
    debug!(name = %name, mode = ?mode, "role write request");

    let request = match role_request(name, mode, fields) {
        Ok(request) => request,
        Err(reason) => return Ok(role_failure(reason)),
    };

    match service.engine.write_role(request).await {
        Ok(role) => Ok(GrafanaSecretsResponse::RoleResult(RoleResultResponse {
            is_success: true,
            role: Some(role_view(role)),
            error: None,
        })),
        Err(e) => {
            warn!(error = %e, "role write failed");
            Ok(role_failure(sanitize_grafana_error(&e)))
        }
    }
}

async fn handle_role_read(service: &GrafanaSecretsService, name: String) -> anyhow::Result<GrafanaSecretsResponse> {
    debug!(name = %name, "role read request");

    match service.engine.read_role(&name).await {
        Ok(role) => Ok(GrafanaSecretsResponse::RoleResult(RoleResultResponse {
            is_success: true,
            role: role.map(role_view),
            error: None,
        })),
        Err(e) => {
            warn!(error = %e, "role read failed");
            Ok(role_failure(sanitize_grafana_error(&e)))
        }
    }
}

async fn handle_role_delete(service: &GrafanaSecretsService, name: String) -> anyhow::Result<GrafanaSecretsResponse> {
    debug!(name = %name, "role delete request");

    let result = service.engine.delete_role(&name).await;
    if let Err(e) = &result {
        warn!(error = %e, "role delete failed");
    }
    Ok(GrafanaSecretsResponse::DeleteResult(DeleteResultResponse {
        is_success: result.is_ok(),
        error: result.err().map(|e| sanitize_grafana_error(&e)),
    }))
}

async fn handle_role_list(service: &GrafanaSecretsService) -> anyhow::Result<GrafanaSecretsResponse> {
    debug!("role list request");

    match service.engine.list_roles().await {
        Ok(items) => Ok(GrafanaSecretsResponse::ListResult(ListResultResponse {
            is_success: true,
            items,
            error: None,
        })),
        Err(e) => {
            warn!(error = %e, "role list failed");
            Ok(GrafanaSecretsResponse::ListResult(ListResultResponse {
                is_success: false,
                items: vec![],
                error: Some(sanitize_grafana_error(&e)),
            }))
        }
    }
}

async fn handle_role_exists(service: &GrafanaSecretsService, name: String) -> anyhow::Result<GrafanaSecretsResponse> {
    match service.engine.role_exists(&name).await {
        Ok(exists) => Ok(GrafanaSecretsResponse::ExistsResult(ExistsResultResponse {
            is_success: true,
            exists,
            error: None,
        })),
        Err(e) => Ok(GrafanaSecretsResponse::ExistsResult(ExistsResultResponse {
            is_success: false,
            exists: false,
            error: Some(sanitize_grafana_error(&e)),
        })),
    }
}
