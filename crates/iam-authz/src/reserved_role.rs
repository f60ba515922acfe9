use std::sync::Arc;

use uuid::Uuid;

use iam_models::{ROLE_SYSTEM_AUDITOR, ROLE_SYSTEM_OWNER, ROLE_TENANT_OWNER};
use iam_storage::RoleStore;

use crate::error::{AuthzError, Result};

const RESERVED_ROLES: &[&str] = &[ROLE_TENANT_OWNER, ROLE_SYSTEM_OWNER, ROLE_SYSTEM_AUDITOR];

/// Enforces the ownership/audit invariants around the three reserved roles:
/// a tenant must always retain at least one `tenant_owner`, and the system
/// must always retain at least one `system_owner` and one `system_auditor`.
/// Callers invoke this guard before a role revocation actually lands.
pub struct ReservedRoleGuard<S: RoleStore> {
    store: Arc<S>,
}

impl<S: RoleStore> ReservedRoleGuard<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Returns an error if revoking `role_name` from its last remaining
    /// holder would leave a reserved role empty. `tenant_owner` is counted
    /// within `tenant_id`'s scope; `system_owner`/`system_auditor` have no
    /// tenant scope (they always carry `tenant_id = None`) and are counted
    /// system-wide instead.
    pub async fn check_revocation(&self, tenant_id: Option<Uuid>, role_name: &str) -> Result<()> {
        if !RESERVED_ROLES.contains(&role_name) {
            return Ok(());
        }
        self.store
            .find_role_by_name(tenant_id, role_name)
            .await?
            .ok_or_else(|| AuthzError::Internal(format!("reserved role {role_name} missing")))?;

        let holders = match (role_name, tenant_id) {
            (ROLE_TENANT_OWNER, Some(scope)) => self.store.count_role_holders(scope, role_name).await?,
            (ROLE_TENANT_OWNER, None) => {
                return Err(AuthzError::Internal(format!("reserved role {role_name} has no tenant scope")));
            }
            _ => self.store.count_system_role_holders(role_name).await?,
        };
        if holders <= 1 {
            return Err(AuthzError::CannotRemoveLastOwner(role_name.to_string()));
        }
        Ok(())
    }

    /// System-level reserved roles (`system_owner`, `system_auditor`) cannot
    /// be assigned or revoked at tenant scope, and tenant-scoped callers may
    /// not grant `tenant_owner` outside their own tenant.
    pub fn check_assignment_scope(&self, acting_tenant_id: Option<Uuid>, target_role_tenant_id: Option<Uuid>, role_name: &str) -> Result<()> {
        if !RESERVED_ROLES.contains(&role_name) {
            return Ok(());
        }
        match (role_name, acting_tenant_id, target_role_tenant_id) {
            (ROLE_SYSTEM_OWNER, Some(_), _) | (ROLE_SYSTEM_AUDITOR, Some(_), _) => {
                Err(AuthzError::RoleAssignmentForbidden(role_name.to_string()))
            }
            (ROLE_TENANT_OWNER, Some(acting), Some(target)) if acting != target => {
                Err(AuthzError::RoleAssignmentForbidden(role_name.to_string()))
            }
            _ => Ok(()),
        }
    }
}
