//! Grafana secrets request handler for Aspen.
//!
//! Exposes the administrative surface of a Grafana secrets mount:
//! - `config`: create, read, update and delete the mount configuration
//! - `roles/<name>` and `roles/`: manage and list role definitions
//! - `creds/<name>`: issue a credential from a role
//! - `revoke` and `renew`: secret contract callbacks for the host lease manager

mod fields;
mod handler;
mod types;

pub use fields::parse_ttl;
pub use handler::GrafanaSecretsHandler;
pub use handler::GrafanaSecretsService;
pub use types::*;
