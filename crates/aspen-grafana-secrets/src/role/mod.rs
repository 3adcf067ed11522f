//! Role definitions: named templates describing what kind of credential to mint.
//!
//! A role is either a Grafana Cloud access policy template or a service account
//! template. Roles are validated on write against the configuration present at
//! that moment, and checked again for compatibility on every issue.

mod store;
mod types;

pub use store::DefaultRoleStore;
pub use store::RoleStore;
pub use types::RoleEntry;
pub use types::RoleFields;
pub use types::RoleKind;
pub use types::WriteRoleRequest;
pub use types::validate_role_name;
