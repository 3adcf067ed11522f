//! Mount configuration: which Grafana platform to talk to and with which token.
//!
//! The configuration is a singleton. It is either absent or fully valid; every
//! write is validated and normalized before it reaches storage.

mod store;
mod types;

pub use store::ConfigStore;
pub use store::DefaultConfigStore;
pub use types::GrafanaConfig;
pub use types::PlatformKind;
pub use types::WriteConfigRequest;
pub use types::normalize_url;
