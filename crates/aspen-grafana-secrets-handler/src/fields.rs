//! Conversion of loosely typed field input into engine requests.

use std::time::Duration;

use aspen_grafana_secrets::RoleFields;
use aspen_grafana_secrets::WriteConfigRequest;
use aspen_grafana_secrets::WriteMode;
use aspen_grafana_secrets::WriteRoleRequest;

use crate::types::ConfigFieldsInput;
use crate::types::DurationInput;
use crate::types::RoleFieldsInput;

/// Parse a TTL field into whole seconds.
///
/// Accepts integer seconds, numeric strings, and humantime strings (`90s`,
/// `5m`, `1h 30m`). Negative values are rejected.
pub fn parse_ttl(field: &str, input: &DurationInput) -> Result<u64, String> {
    match input {
        DurationInput::Seconds(secs) => {
            u64::try_from(*secs).map_err(|_| format!("{field} must not be negative: {secs}"))
        }
        DurationInput::Text(text) => {
            let text = text.trim();
            if let Ok(secs) = text.parse::<i64>() {
                return parse_ttl(field, &DurationInput::Seconds(secs));
            }
            humantime::parse_duration(text)
                .map(|d: Duration| d.as_secs())
                .map_err(|e| format!("invalid {field} '{text}': {e}"))
        }
    }
}

pub(crate) fn config_request(mode: WriteMode, fields: ConfigFieldsInput) -> WriteConfigRequest {
    WriteConfigRequest {
        mode,
        kind: fields.kind,
        token: fields.token,
        url: fields.url,
    }
}

pub(crate) fn role_request(name: String, mode: WriteMode, fields: RoleFieldsInput) -> Result<WriteRoleRequest, String> {
    let ttl_secs = fields.ttl.as_ref().map(|t| parse_ttl("ttl", t)).transpose()?;
    let max_ttl_secs = fields.max_ttl.as_ref().map(|t| parse_ttl("max_ttl", t)).transpose()?;

    Ok(WriteRoleRequest {
        name,
        mode,
        fields: RoleFields {
            kind: fields.kind,
            region: fields.region,
            scopes: fields.scopes,
            realms: fields.realms,
            allowed_subnets: fields.allowed_subnets,
            stack: fields.stack,
            role: fields.role,
            rbac_roles: fields.rbac_roles,
            ttl_secs,
            max_ttl_secs,
        },
    })
}
