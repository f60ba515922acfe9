use std::sync::Arc;

use uuid::Uuid;

use iam_models::{events, AuditEventCategory, AuditLogBuilder, AuditStatus};
use iam_storage::{AuditSink, RoleStore};

use crate::error::{AuthzError, Result};
use crate::reserved_role::ReservedRoleGuard;

/// The only path that should ever call `RoleStore::revoke_role` for a
/// reserved role — every other caller goes through here so the last-owner
/// invariant in `ReservedRoleGuard` actually gets enforced.
pub struct RoleAdminService<R: RoleStore, A: AuditSink> {
    store: Arc<R>,
    guard: ReservedRoleGuard<R>,
    audit: Arc<A>,
}

impl<R: RoleStore, A: AuditSink> RoleAdminService<R, A> {
    pub fn new(store: Arc<R>, audit: Arc<A>) -> Self {
        Self {
            guard: ReservedRoleGuard::new(store.clone()),
            store,
            audit,
        }
    }

    pub async fn revoke(&self, target_user_id: Uuid, role_id: Uuid, removed_by: Option<Uuid>) -> Result<()> {
        let role = self.store.find_role_by_id(role_id).await?.ok_or(AuthzError::RoleNotFound(role_id))?;

        if role.is_reserved() {
            self.guard.check_revocation(role.tenant_id, &role.name).await?;
        }

        self.store.revoke_role(target_user_id, role_id).await?;

        let mut builder = AuditLogBuilder::new(role.tenant_id, events::ROLE_REVOKED, AuditEventCategory::Authorization)
            .status(AuditStatus::Success)
            .target("user", target_user_id.to_string())
            .target_name(role.name.clone());
        if let Some(removed_by) = removed_by {
            builder = builder.actor("user", removed_by.to_string());
        }
        if let Err(err) = self.audit.record(builder.build()).await {
            tracing::error!(%err, %role_id, "failed to record role revocation audit event");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use iam_models::{Role, UserRoleAssignment, ROLE_TENANT_OWNER};
    use iam_storage::memory::{InMemoryAuditSink, InMemoryRoleStore};

    #[tokio::test]
    async fn s5_removing_the_last_tenant_owner_is_rejected() {
        let store = Arc::new(InMemoryRoleStore::new());
        let service = RoleAdminService::new(store.clone(), Arc::new(InMemoryAuditSink::new()));

        let tenant_id = Uuid::new_v4();
        let now = Utc::now();
        let role = Role {
            id: Uuid::new_v4(),
            tenant_id: Some(tenant_id),
            name: ROLE_TENANT_OWNER.to_string(),
            description: None,
            is_system: true,
            created_at: now,
            updated_at: now,
        };
        store.insert_role(role.clone()).await;

        let owner_user = Uuid::new_v4();
        store
            .assign_role(UserRoleAssignment {
                user_id: owner_user,
                role_id: role.id,
                granted_at: now,
                granted_by: None,
            })
            .await
            .unwrap();

        let result = service.revoke(owner_user, role.id, None).await;
        assert!(matches!(result, Err(AuthzError::CannotRemoveLastOwner(_))));

        // The role must still be assigned — the guard blocked the write.
        let roles = store.get_user_roles(owner_user).await.unwrap();
        assert!(roles.iter().any(|r| r.id == role.id));
    }

    #[tokio::test]
    async fn removing_a_non_reserved_role_does_not_consult_the_guard() {
        let store = Arc::new(InMemoryRoleStore::new());
        let service = RoleAdminService::new(store.clone(), Arc::new(InMemoryAuditSink::new()));

        let now = Utc::now();
        let role = Role {
            id: Uuid::new_v4(),
            tenant_id: Some(Uuid::new_v4()),
            name: "support_agent".to_string(),
            description: None,
            is_system: false,
            created_at: now,
            updated_at: now,
        };
        store.insert_role(role.clone()).await;

        let user_id = Uuid::new_v4();
        store
            .assign_role(UserRoleAssignment {
                user_id,
                role_id: role.id,
                granted_at: now,
                granted_by: None,
            })
            .await
            .unwrap();

        service.revoke(user_id, role.id, None).await.unwrap();
        let roles = store.get_user_roles(user_id).await.unwrap();
        assert!(roles.is_empty());
    }

    #[tokio::test]
    async fn s5_removing_the_last_system_owner_is_rejected() {
        let store = Arc::new(InMemoryRoleStore::new());
        let service = RoleAdminService::new(store.clone(), Arc::new(InMemoryAuditSink::new()));

        let now = Utc::now();
        let role = Role {
            id: Uuid::new_v4(),
            tenant_id: None,
            name: iam_models::ROLE_SYSTEM_OWNER.to_string(),
            description: None,
            is_system: true,
            created_at: now,
            updated_at: now,
        };
        store.insert_role(role.clone()).await;

        let owner_user = Uuid::new_v4();
        store
            .assign_role(UserRoleAssignment {
                user_id: owner_user,
                role_id: role.id,
                granted_at: now,
                granted_by: None,
            })
            .await
            .unwrap();

        let result = service.revoke(owner_user, role.id, None).await;
        assert!(matches!(result, Err(AuthzError::CannotRemoveLastOwner(_))));
    }
}
