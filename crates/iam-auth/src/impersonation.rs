use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use iam_authz::PermissionChecker;
use iam_models::{events, AuditEventCategory, AuditLogBuilder, AuditStatus, ImpersonationSession};
use iam_storage::{
    AuditSink, CapabilityStore, DenyListStore, ImpersonationStore, RefreshTokenStore, RoleStore,
    TenantStore, UserStore,
};

use crate::error::{AuthError, Result};
use crate::issuance::{TokenBundle, TokenIssuer};

/// Permission string, `resource:action` form, gating who may impersonate.
/// Deliberately not a hardcoded role name — any role granted this
/// permission (tenant-scoped or system-scoped) can impersonate.
pub const PERMISSION_IMPERSONATE: &str = "users:impersonate";

pub struct ImpersonationService<U, TS, R, C, D, RT, I, A>
where
    U: UserStore,
    TS: TenantStore,
    R: RoleStore,
    C: CapabilityStore,
    D: DenyListStore,
    RT: RefreshTokenStore,
    I: ImpersonationStore,
    A: AuditSink,
{
    users: Arc<U>,
    tenants: Arc<TS>,
    permissions: PermissionChecker<R>,
    issuer: TokenIssuer<R, C, D, RT>,
    refresh_store: Arc<RT>,
    sessions: Arc<I>,
    audit: Arc<A>,
}

impl<U, TS, R, C, D, RT, I, A> ImpersonationService<U, TS, R, C, D, RT, I, A>
where
    U: UserStore,
    TS: TenantStore,
    R: RoleStore,
    C: CapabilityStore,
    D: DenyListStore,
    RT: RefreshTokenStore,
    I: ImpersonationStore,
    A: AuditSink,
{
    pub fn new(
        users: Arc<U>,
        tenants: Arc<TS>,
        roles: Arc<R>,
        issuer: TokenIssuer<R, C, D, RT>,
        refresh_store: Arc<RT>,
        sessions: Arc<I>,
        audit: Arc<A>,
    ) -> Self {
        Self {
            users,
            tenants,
            permissions: PermissionChecker::new(roles),
            issuer,
            refresh_store,
            sessions,
            audit,
        }
    }

    /// `act.sub` always names `impersonator_id`, never the other way
    /// around: the issued tokens authenticate as the target but keep the
    /// real actor attributable for every downstream audit event.
    pub async fn start(&self, impersonator_id: Uuid, target_user_id: Uuid, reason: Option<String>) -> Result<(Uuid, TokenBundle)> {
        if !self.permissions.has_permission(impersonator_id, PERMISSION_IMPERSONATE).await? {
            return Err(AuthError::AccessDenied);
        }

        let target = self.users.find_by_id(target_user_id).await?.ok_or(AuthError::AuthenticationFailed)?;
        if !target.status.can_authenticate() {
            return Err(AuthError::AccountDisabled);
        }

        let tenant = match target.tenant_id {
            Some(tenant_id) => self.tenants.find_by_id(tenant_id).await?,
            None => None,
        };

        let bundle = self
            .issuer
            .issue(
                &target,
                tenant.as_ref(),
                false,
                false,
                None,
                None,
                Some(crate::claims::ActorClaim { sub: impersonator_id }),
                None,
            )
            .await?;
        let refresh_hash = self.issuer.tokens().hash_refresh(&bundle.refresh_token)?;

        let session = ImpersonationSession {
            id: Uuid::new_v4(),
            tenant_id: target.tenant_id,
            impersonator_id,
            target_user_id,
            reason,
            started_at: Utc::now(),
            ended_at: None,
            refresh_hash: Some(refresh_hash),
        };
        self.sessions.create(session.clone()).await?;

        self.emit(target.tenant_id, events::USER_IMPERSONATED, Some(impersonator_id)).await;
        Ok((session.id, bundle))
    }

    /// Ends the session and revokes the refresh token minted for it — and,
    /// via `revoke_chain_from`, any token it was since rotated into.
    pub async fn end(&self, session_id: Uuid) -> Result<()> {
        let session = self.sessions.find_active(session_id).await?.ok_or(AuthError::InvalidRequest)?;
        self.sessions.end(session_id, Utc::now()).await?;
        if let Some(hash) = &session.refresh_hash {
            self.refresh_store.revoke_chain_from(hash).await?;
        }
        self.emit(session.tenant_id, events::IMPERSONATION_ENDED, Some(session.impersonator_id)).await;
        Ok(())
    }

    async fn emit(&self, tenant_id: Option<Uuid>, event_type: &str, actor_id: Option<Uuid>) {
        let mut builder = AuditLogBuilder::new(tenant_id, event_type, AuditEventCategory::Authentication).status(AuditStatus::Success);
        if let Some(actor_id) = actor_id {
            builder = builder.actor("user", actor_id.to_string());
        }
        if let Err(err) = self.audit.record(builder.build()).await {
            tracing::error!(%err, event_type, "failed to record impersonation audit event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iam_authz::CapabilityResolver;
    use iam_models::{Permission, PrincipalType, Role, User, UserMetadata, UserRoleAssignment, UserStatus};
    use iam_storage::memory::{
        InMemoryAuditSink, InMemoryCapabilityStore, InMemoryDenyListStore, InMemoryImpersonationStore,
        InMemoryRefreshTokenStore, InMemoryRoleStore, InMemoryTenantStore, InMemoryUserStore,
    };

    use crate::claims::ClaimsBuilder;
    use crate::lifetime::{GlobalDefaults, LifetimeResolver};
    use crate::token::{KeySet, TokenService, TokenServiceConfig};

    fn new_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            tenant_id: None,
            principal_type: PrincipalType::Tenant,
            username: "target".to_string(),
            email: "target@example.com".to_string(),
            email_verified: true,
            password_hash: None,
            status: UserStatus::Active,
            mfa_enabled: false,
            mfa_enforced_at: None,
            metadata: UserMetadata::default(),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn start_without_permission_is_denied() {
        let users = Arc::new(InMemoryUserStore::new());
        let target = new_user();
        users.insert(target.clone()).await;

        let roles = Arc::new(InMemoryRoleStore::new());
        let keys = KeySet::from_hmac_secret("test-key-1", b"test-secret-at-least-32-bytes-long!!");
        let config = TokenServiceConfig {
            issuer: "iam-kernel".to_string(),
            audience: "iam-clients".to_string(),
            refresh_pepper: b"test-pepper".to_vec(),
        };
        let refresh_store = Arc::new(InMemoryRefreshTokenStore::new());
        let tokens = TokenService::new(keys, config, Arc::new(InMemoryDenyListStore::new()), refresh_store.clone());
        let issuer = TokenIssuer::new(
            roles.clone(),
            Arc::new(CapabilityResolver::new(Arc::new(InMemoryCapabilityStore::new()))),
            tokens,
            LifetimeResolver::new(GlobalDefaults::default()),
            ClaimsBuilder::new("iam-kernel", "iam-clients"),
        );
        let service = ImpersonationService::new(
            users,
            Arc::new(InMemoryTenantStore::new()),
            roles,
            issuer,
            refresh_store,
            Arc::new(InMemoryImpersonationStore::new()),
            Arc::new(InMemoryAuditSink::new()),
        );

        let result = service.start(Uuid::new_v4(), target.id, None).await;
        assert!(matches!(result, Err(AuthError::AccessDenied)));
    }

    #[tokio::test]
    async fn granted_permission_allows_impersonation_and_carries_act_claim() {
        let users = Arc::new(InMemoryUserStore::new());
        let target = new_user();
        users.insert(target.clone()).await;

        let roles = Arc::new(InMemoryRoleStore::new());
        let now = Utc::now();
        let role = Role {
            id: Uuid::new_v4(),
            tenant_id: None,
            name: "support".to_string(),
            description: None,
            is_system: false,
            created_at: now,
            updated_at: now,
        };
        let permission = Permission {
            id: Uuid::new_v4(),
            tenant_id: None,
            resource: "users".to_string(),
            action: "impersonate".to_string(),
            description: None,
            created_at: now,
        };
        roles.insert_role(role.clone()).await;
        roles.insert_permission(permission.clone()).await;
        roles.link_permission(role.id, permission.id).await;

        let impersonator_id = Uuid::new_v4();
        roles
            .assign_role(UserRoleAssignment {
                user_id: impersonator_id,
                role_id: role.id,
                granted_at: now,
                granted_by: None,
            })
            .await
            .unwrap();

        let keys = KeySet::from_hmac_secret("test-key-1", b"test-secret-at-least-32-bytes-long!!");
        let config = TokenServiceConfig {
            issuer: "iam-kernel".to_string(),
            audience: "iam-clients".to_string(),
            refresh_pepper: b"test-pepper".to_vec(),
        };
        let refresh_store = Arc::new(InMemoryRefreshTokenStore::new());
        let tokens = TokenService::new(keys, config, Arc::new(InMemoryDenyListStore::new()), refresh_store.clone());
        let issuer = TokenIssuer::new(
            roles.clone(),
            Arc::new(CapabilityResolver::new(Arc::new(InMemoryCapabilityStore::new()))),
            tokens,
            LifetimeResolver::new(GlobalDefaults::default()),
            ClaimsBuilder::new("iam-kernel", "iam-clients"),
        );
        let service = ImpersonationService::new(
            users,
            Arc::new(InMemoryTenantStore::new()),
            roles,
            issuer,
            refresh_store.clone(),
            Arc::new(InMemoryImpersonationStore::new()),
            Arc::new(InMemoryAuditSink::new()),
        );

        let (session_id, bundle) = service.start(impersonator_id, target.id, Some("support ticket 42".to_string())).await.unwrap();
        assert!(!bundle.access_token.is_empty());

        let claims = service.issuer.tokens().validate_access(&bundle.access_token).await.unwrap();
        assert_eq!(claims.sub, target.id);
        assert_eq!(claims.act.unwrap().sub, impersonator_id);

        let hash = service.issuer.tokens().hash_refresh(&bundle.refresh_token).unwrap();
        let record_before_end = refresh_store.find_by_hash(&hash).await.unwrap().unwrap();
        assert!(record_before_end.revoked_at.is_none());

        service.end(session_id).await.unwrap();

        let record_after_end = refresh_store.find_by_hash(&hash).await.unwrap().unwrap();
        assert!(record_after_end.revoked_at.is_some());

        let ended = service.end(session_id).await;
        assert!(matches!(ended, Err(AuthError::InvalidRequest)));
    }
}
