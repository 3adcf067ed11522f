//! Lease renewal. Never touches the remote platform.

use crate::credentials::tracking::Lease;
use crate::error::Result;
use crate::error::SecretsError;
use crate::role::RoleEntry;

/// Apply the originating role's current TTLs to `lease`.
///
/// `role` is the role looked up by the tracking data's `vault_role`; `None`
/// means it has been deleted since issue, and renewal is refused.
pub fn renew_lease(role_name: &str, role: Option<&RoleEntry>, lease: Lease) -> Result<Lease> {
    let role = role.ok_or_else(|| SecretsError::RoleNotFound {
        name: role_name.to_string(),
    })?;
    Ok(lease.renewed(role))
}
