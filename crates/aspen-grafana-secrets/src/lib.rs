//! Dynamic Grafana Cloud and Grafana credentials for Aspen.
//!
//! This crate issues short-lived Grafana tokens on demand and cleans up the
//! remote resources behind them when their lease ends.
//!
//! ## Credential kinds
//!
//! - **Cloud access policy**: an access policy in a Grafana Cloud region plus a
//!   token bound to it.
//! - **Cloud service account**: a service account inside a Grafana Cloud stack
//!   plus its token.
//! - **Instance service account**: a service account on a Grafana instance,
//!   optionally with custom RBAC roles, plus its token.
//!
//! ## Lifecycle
//!
//! - **Issue**: provisions the remote resources. If a later step fails, the
//!   resources created so far are deleted before the error is returned.
//! - **Revoke**: deletes the resource recorded in the credential's tracking data.
//! - **Renew**: re-reads the originating role and applies its current TTLs.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aspen_grafana_secrets::{GrafanaSecretsEngine, InMemorySecretsBackend, RoleKind};
//! use aspen_grafana_secrets::{WriteConfigRequest, WriteRoleRequest};
//!
//! let engine = GrafanaSecretsEngine::new(Arc::new(InMemorySecretsBackend::new()));
//!
//! engine.write_config(WriteConfigRequest::create("cloud", cloud_token)).await?;
//! engine
//!     .write_role(
//!         WriteRoleRequest::create("deploy", RoleKind::ServiceAccount)
//!             .with_stack("acme")
//!             .with_role("Editor")
//!             .with_ttl_secs(3600),
//!     )
//!     .await?;
//!
//! let credential = engine.issue_credentials("deploy").await?;
//! // ... later, when the lease expires:
//! engine.revoke(&credential.internal).await?;
//! ```

pub mod backend;
pub mod cache;
pub mod client;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod role;
pub mod rollback;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export backend types
pub use backend::InMemorySecretsBackend;
pub use backend::SecretsBackend;
pub use backend::WriteMode;
// Re-export client types
pub use cache::BoundClient;
pub use cache::ClientCache;
pub use cache::ClientFactory;
pub use cache::HttpClientFactory;
pub use client::GrafanaApi;
pub use client::GrafanaClient;
// Re-export configuration types
pub use config::ConfigStore;
pub use config::DefaultConfigStore;
pub use config::GrafanaConfig;
pub use config::PlatformKind;
pub use config::WriteConfigRequest;
pub use constants::*;
// Re-export credential types
pub use credentials::InternalData;
pub use credentials::IssuedCredential;
pub use credentials::Lease;
pub use credentials::TrackedResource;
pub use engine::GrafanaSecretsEngine;
pub use error::ClientError;
pub use error::Result;
pub use error::SecretsError;
// Re-export role types
pub use role::DefaultRoleStore;
pub use role::RoleEntry;
pub use role::RoleFields;
pub use role::RoleKind;
pub use role::RoleStore;
pub use role::WriteRoleRequest;
