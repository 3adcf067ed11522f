//! Credential handler functions: issue, plus the revoke and renew callbacks.

use aspen_grafana_secrets::InternalData;
use aspen_grafana_secrets::Lease;
use tracing::debug;
use tracing::warn;

use super::GrafanaSecretsService;
use super::sanitize_grafana_error;
use crate::types::CredentialData;
use crate::types::CredentialResultResponse;
use crate::types::GrafanaSecretsRequest;
use crate::types::GrafanaSecretsResponse;
use crate::types::IssuedSecret;
use crate::types::RenewResultResponse;
use crate::types::RevokeResultResponse;

/// Sub-handler for `creds/<name>` and the lease callbacks.
pub(crate) struct CredsHandler;

impl CredsHandler {
    pub(crate) fn can_handle(&self, request: &GrafanaSecretsRequest) -> bool {
        matches!(
            request,
            GrafanaSecretsRequest::CredsRead { .. }
                | GrafanaSecretsRequest::CredsUpdate { .. }
                | GrafanaSecretsRequest::Revoke { .. }
                | GrafanaSecretsRequest::Renew { .. }
        )
    }

    pub(crate) async fn handle(
        &self,
        request: GrafanaSecretsRequest,
        service: &GrafanaSecretsService,
    ) -> anyhow::Result<GrafanaSecretsResponse> {
        match request {
            // Update is an alias for read: both issue a credential.
            GrafanaSecretsRequest::CredsRead { name } | GrafanaSecretsRequest::CredsUpdate { name } => {
                handle_creds_issue(service, name).await
            }
            GrafanaSecretsRequest::Revoke { internal } => handle_revoke(service, internal).await,
            GrafanaSecretsRequest::Renew { internal, lease } => handle_renew(service, internal, lease).await,
            _ => Err(anyhow::anyhow!("request not handled by CredsHandler")),
        }
    }
}

async fn handle_creds_issue(service: &GrafanaSecretsService, name: String) -> anyhow::Result<GrafanaSecretsResponse> {
    debug!(role = %name, "creds request");

    match service.engine.issue_credentials(&name).await {
        Ok(credential) => Ok(GrafanaSecretsResponse::CredentialResult(CredentialResultResponse {
            is_success: true,
            secret: Some(IssuedSecret {
                secret_type: credential.secret_type.to_string(),
                data: CredentialData {
                    token: credential.token,
                },
                internal: credential.internal,
                lease: credential.lease,
            }),
            error: None,
        })),
        Err(e) => {
            warn!(role = %name, error = %e, "creds request failed");
            Ok(GrafanaSecretsResponse::CredentialResult(CredentialResultResponse {
                is_success: false,
                secret: None,
                error: Some(sanitize_grafana_error(&e)),
            }))
        }
    }
}

async fn handle_revoke(service: &GrafanaSecretsService, internal: InternalData) -> anyhow::Result<GrafanaSecretsResponse> {
    debug!(role = %internal.vault_role, is_cloud = internal.is_cloud, "revoke request");

    let result = service.engine.revoke(&internal).await;
    if let Err(e) = &result {
        warn!(role = %internal.vault_role, error = %e, "revoke failed; host will retry");
    }
    Ok(GrafanaSecretsResponse::RevokeResult(RevokeResultResponse {
        is_success: result.is_ok(),
        error: result.err().map(|e| sanitize_grafana_error(&e)),
    }))
}

async fn handle_renew(
    service: &GrafanaSecretsService,
    internal: InternalData,
    lease: Lease,
) -> anyhow::Result<GrafanaSecretsResponse> {
    debug!(role = %internal.vault_role, "renew request");

    match service.engine.renew(&internal, lease).await {
        Ok(lease) => Ok(GrafanaSecretsResponse::RenewResult(RenewResultResponse {
            is_success: true,
            lease: Some(lease),
            error: None,
        })),
        Err(e) => {
            warn!(role = %internal.vault_role, error = %e, "renew failed");
            Ok(GrafanaSecretsResponse::RenewResult(RenewResultResponse {
                is_success: false,
                lease: None,
                error: Some(sanitize_grafana_error(&e)),
            }))
        }
    }
}
