//! Configuration handler functions.

use aspen_grafana_secrets::GrafanaConfig;
use aspen_grafana_secrets::WriteMode;
use tracing::debug;
use tracing::warn;

use super::GrafanaSecretsService;
use super::sanitize_grafana_error;
use crate::fields::config_request;
use crate::types::ConfigFieldsInput;
use crate::types::ConfigResultResponse;
use crate::types::ConfigView;
use crate::types::DeleteResultResponse;
use crate::types::ExistsResultResponse;
use crate::types::GrafanaSecretsRequest;
use crate::types::GrafanaSecretsResponse;

/// Sub-handler for the `config` path.
pub(crate) struct ConfigHandler;

impl ConfigHandler {
    pub(crate) fn can_handle(&self, request: &GrafanaSecretsRequest) -> bool {
        matches!(
            request,
            GrafanaSecretsRequest::ConfigCreate { .. }
                | GrafanaSecretsRequest::ConfigUpdate { .. }
                | GrafanaSecretsRequest::ConfigRead
                | GrafanaSecretsRequest::ConfigDelete
                | GrafanaSecretsRequest::ConfigExists
        )
    }

    pub(crate) async fn handle(
        &self,
        request: GrafanaSecretsRequest,
        service: &GrafanaSecretsService,
    ) -> anyhow::Result<GrafanaSecretsResponse> {
        match request {
            GrafanaSecretsRequest::ConfigCreate { fields } => handle_config_write(service, WriteMode::Create, fields).await,
            GrafanaSecretsRequest::ConfigUpdate { fields } => handle_config_write(service, WriteMode::Update, fields).await,
            GrafanaSecretsRequest::ConfigRead => handle_config_read(service).await,
            GrafanaSecretsRequest::ConfigDelete => handle_config_delete(service).await,
            GrafanaSecretsRequest::ConfigExists => handle_config_exists(service).await,
            _ => Err(anyhow::anyhow!("request not handled by ConfigHandler")),
        }
    }
}

fn config_view(config: GrafanaConfig) -> ConfigView {
    ConfigView {
        kind: config.kind.as_str().to_string(),
        token: config.token,
        url: config.url,
    }
}

fn config_failure(error: String) -> GrafanaSecretsResponse {
    GrafanaSecretsResponse::ConfigResult(ConfigResultResponse {
        is_success: false,
        config: None,
        error: Some(error),
    })
}

async fn handle_config_write(
    service: &GrafanaSecretsService,
    mode: WriteMode,
    fields: ConfigFieldsInput,
) -> anyhow::Result<GrafanaSecretsResponse> {
    debug!(mode = ?mode, kind = ?fields.kind, "config write request");

    match service.engine.write_config(config_request(mode, fields)).await {
        Ok(config) => Ok(GrafanaSecretsResponse::ConfigResult(ConfigResultResponse {
            is_success: true,
            config: Some(config_view(config)),
            error: None,
        })),
        Err(e) => {
            warn!(error = %e, "config write failed");
            Ok(config_failure(sanitize_grafana_error(&e)))
        }
    }
}

async fn handle_config_read(service: &GrafanaSecretsService) -> anyhow::Result<GrafanaSecretsResponse> {
    debug!("config read request");

    match service.engine.read_config().await {
        Ok(config) => Ok(GrafanaSecretsResponse::ConfigResult(ConfigResultResponse {
            is_success: true,
            config: config.map(config_view),
            error: None,
        })),
        Err(e) => {
            warn!(error = %e, "config read failed");
            Ok(config_failure(sanitize_grafana_error(&e)))
        }
    }
}

async fn handle_config_delete(service: &GrafanaSecretsService) -> anyhow::Result<GrafanaSecretsResponse> {
    debug!("config delete request");

    let result = service.engine.delete_config().await;
    if let Err(e) = &result {
        warn!(error = %e, "config delete failed");
    }
    Ok(GrafanaSecretsResponse::DeleteResult(DeleteResultResponse {
        is_success: result.is_ok(),
        error: result.err().map(|e| sanitize_grafana_error(&e)),
    }))
}

async fn handle_config_exists(service: &GrafanaSecretsService) -> anyhow::Result<GrafanaSecretsResponse> {
    match service.engine.config_exists().await {
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
