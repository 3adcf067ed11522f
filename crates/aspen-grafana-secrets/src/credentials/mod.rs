//! Credential lifecycle: issue, revoke and renew.
//!
//! Issuing provisions one or two remote resources and returns the token together
//! with tracking data the host keeps alongside the lease. Revocation and renewal
//! are driven entirely by that tracking data.

mod issuer;
mod renew;
mod revoke;
mod tracking;

pub use issuer::ProvisionedToken;
pub use issuer::Workflow;
pub use issuer::credential_name;
pub use issuer::provision;
pub use renew::renew_lease;
pub use revoke::revoke_resource;
pub use tracking::InternalData;
pub use tracking::IssuedCredential;
pub use tracking::Lease;
pub use tracking::TrackedResource;
