//! Mount configuration types.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::backend::WriteMode;
use crate::constants::DEFAULT_GRAFANA_CLOUD_URL;
use crate::error::Result;
use crate::error::SecretsError;

/// Kind of remote platform a mount talks to.
///
/// Decides which role kinds can issue credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformKind {
    /// Grafana Cloud (grafana.com API).
    #[serde(rename = "cloud")]
    Cloud,
    /// A single Grafana instance (self-hosted or a cloud stack URL).
    #[serde(rename = "grafana")]
    Instance,
}

impl PlatformKind {
    /// Wire name used in configuration requests and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Cloud => "cloud",
            PlatformKind::Instance => "grafana",
        }
    }

    /// Whether this is Grafana Cloud.
    pub fn is_cloud(&self) -> bool {
        matches!(self, PlatformKind::Cloud)
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformKind {
    type Err = SecretsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cloud" => Ok(PlatformKind::Cloud),
            "grafana" => Ok(PlatformKind::Instance),
            _ => Err(SecretsError::InvalidConfig {
                reason: "type must be either 'cloud' or 'grafana'".to_string(),
            }),
        }
    }
}

/// The mount configuration.
///
/// Only ever stored in validated, normalized form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrafanaConfig {
    /// Platform kind.
    #[serde(rename = "type")]
    pub kind: PlatformKind,
    /// Bearer token used for every outbound call.
    pub token: String,
    /// Base URL, lower-cased and without trailing slash.
    pub url: String,
}

impl fmt::Debug for GrafanaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrafanaConfig")
            .field("kind", &self.kind)
            .field("token", &"<redacted>")
            .field("url", &self.url)
            .finish()
    }
}

impl GrafanaConfig {
    /// Build a validated configuration from raw field values.
    pub fn new(kind: &str, token: &str, url: &str) -> Result<Self> {
        let kind: PlatformKind = kind.parse()?;

        if token.is_empty() {
            return Err(SecretsError::InvalidConfig {
                reason: "token must not be empty".to_string(),
            });
        }

        let url = match kind {
            PlatformKind::Instance if url.is_empty() => {
                return Err(SecretsError::InvalidConfig {
                    reason: "url must not be empty".to_string(),
                });
            }
            PlatformKind::Cloud if url.is_empty() => DEFAULT_GRAFANA_CLOUD_URL.to_string(),
            _ => normalize_url(url)?,
        };

        Ok(Self {
            kind,
            token: token.to_string(),
            url,
        })
    }
}

/// Validate and normalize a base URL: absolute http(s), lower-cased, no trailing slash.
pub fn normalize_url(raw: &str) -> Result<String> {
    let invalid = || SecretsError::InvalidConfig {
        reason: format!("invalid url in configuration: {raw}"),
    };

    let parsed = Url::parse(raw).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || !parsed.has_host() {
        return Err(invalid());
    }

    Ok(raw.to_lowercase().trim_end_matches('/').to_string())
}

/// Request to create or update the mount configuration.
///
/// On update, fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct WriteConfigRequest {
    /// Create or update.
    pub mode: WriteMode,
    /// `cloud` or `grafana`.
    pub kind: Option<String>,
    /// Root bearer token.
    pub token: Option<String>,
    /// Base URL.
    pub url: Option<String>,
}

impl WriteConfigRequest {
    /// A create request with the given fields.
    pub fn create(kind: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            mode: WriteMode::Create,
            kind: Some(kind.into()),
            token: Some(token.into()),
            url: None,
        }
    }

    /// An update request with no fields set.
    pub fn update() -> Self {
        Self {
            mode: WriteMode::Update,
            ..Default::default()
        }
    }

    /// Set the base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the platform kind.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Set the root token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Merge this request over an existing configuration and validate the result.
    pub fn apply(self, existing: Option<&GrafanaConfig>) -> Result<GrafanaConfig> {
        let kind = self.kind.or_else(|| existing.map(|c| c.kind.as_str().to_string())).unwrap_or_default();
        let token = self.token.or_else(|| existing.map(|c| c.token.clone())).unwrap_or_default();
        let url = self.url.or_else(|| existing.map(|c| c.url.clone())).unwrap_or_default();

        GrafanaConfig::new(&kind, &token, &url)
    }
}
