use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use iam_models::{events, AuditEventCategory, AuditLogBuilder, AuditStatus};
use iam_storage::{
    AuditSink, CapabilityStore, DenyListStore, RefreshTokenStore, RoleStore, TenantStore, UserStore,
};

use crate::error::{AuthError, Result};
use crate::issuance::{TokenBundle, TokenIssuer};

/// Rotates an opaque refresh token for a fresh access/id/refresh triple.
/// Carries the MFA-verified bit forward from the predecessor record rather
/// than re-checking MFA: a refresh token minted before MFA step-up can
/// never be upgraded into one that claims `mfa_verified`.
pub struct RefreshService<U, TS, R, C, D, RT, A>
where
    U: UserStore,
    TS: TenantStore,
    R: RoleStore,
    C: CapabilityStore,
    D: DenyListStore,
    RT: RefreshTokenStore,
    A: AuditSink,
{
    users: Arc<U>,
    tenants: Arc<TS>,
    refresh_store: Arc<RT>,
    issuer: TokenIssuer<R, C, D, RT>,
    audit: Arc<A>,
}

impl<U, TS, R, C, D, RT, A> RefreshService<U, TS, R, C, D, RT, A>
where
    U: UserStore,
    TS: TenantStore,
    R: RoleStore,
    C: CapabilityStore,
    D: DenyListStore,
    RT: RefreshTokenStore,
    A: AuditSink,
{
    pub fn new(users: Arc<U>, tenants: Arc<TS>, refresh_store: Arc<RT>, issuer: TokenIssuer<R, C, D, RT>, audit: Arc<A>) -> Self {
        Self {
            users,
            tenants,
            refresh_store,
            issuer,
            audit,
        }
    }

    pub async fn refresh(&self, plaintext: &str) -> Result<TokenBundle> {
        let hash = self.issuer.tokens().hash_refresh(plaintext)?;

        let Some(record) = self.refresh_store.find_by_hash(&hash).await? else {
            return Err(AuthError::InvalidToken);
        };

        if record.revoked_at.is_some() {
            self.handle_possible_reuse(&record).await?;
            return Err(AuthError::InvalidToken);
        }

        if !record.is_usable(Utc::now()) {
            return Err(AuthError::ExpiredToken);
        }

        let user = self.users.find_by_id(record.user_id).await?.ok_or(AuthError::AuthenticationFailed)?;
        if !user.status.can_authenticate() {
            return Err(AuthError::AccountDisabled);
        }

        let tenant = match record.tenant_id {
            Some(tenant_id) => self.tenants.find_by_id(tenant_id).await?,
            None => None,
        };
        if let Some(tenant) = &tenant {
            if !tenant.status.accepts_authentication() {
                return Err(AuthError::AccountDisabled);
            }
        }

        // MFA carry: a refresh token minted before MFA step-up can never
        // silently acquire it later. This is what closes the refresh-bypass
        // gap.
        if user.mfa_enabled && !record.mfa_verified {
            return Err(AuthError::MfaRequired { mfa_session_id: Uuid::nil() });
        }

        let settings = tenant.as_ref().map(|t| t.settings.clone()).unwrap_or_default();

        let bundle = if settings.token_rotation_enabled {
            let bundle = self
                .issuer
                .issue(
                    &user,
                    tenant.as_ref(),
                    record.mfa_verified,
                    false,
                    record.client_id.clone(),
                    Some(record.hash.clone()),
                    None,
                    None,
                )
                .await?;

            if !self.refresh_store.revoke(&record.hash).await? {
                // Someone else already revoked it between our lookup and here —
                // the new record we just minted must not survive as an orphaned
                // valid child.
                self.refresh_store.revoke_chain_from(&hash).await?;
                return Err(AuthError::TokenRevoked);
            }
            bundle
        } else {
            // Rotation disabled for this tenant: mint a fresh access/id
            // pair but keep the caller's refresh token and its record
            // exactly as they are.
            self.issuer
                .issue(
                    &user,
                    tenant.as_ref(),
                    record.mfa_verified,
                    false,
                    record.client_id.clone(),
                    None,
                    None,
                    Some(plaintext.to_string()),
                )
                .await?
        };

        self.emit(record.tenant_id, events::TOKEN_ISSUED, AuditStatus::Success, Some(user.id)).await;
        Ok(bundle)
    }

    /// A lookup that finds an already-revoked record with an unrevoked
    /// child present is evidence the plaintext we were just handed is a
    /// stale, previously-rotated-away token — i.e. theft. Revoke the whole
    /// chain and audit it rather than just rejecting this one call.
    async fn handle_possible_reuse(&self, record: &iam_models::RefreshTokenRecord) -> Result<()> {
        if let Some(child) = self.refresh_store.find_child_of(&record.hash).await? {
            if child.revoked_at.is_none() {
                self.refresh_store.revoke_chain_from(&record.hash).await?;
                self.emit(record.tenant_id, events::TOKEN_REUSE_DETECTED, AuditStatus::Failure, Some(record.user_id))
                    .await;
            }
        }
        Ok(())
    }

    async fn emit(&self, tenant_id: Option<Uuid>, event_type: &str, status: AuditStatus, actor_id: Option<Uuid>) {
        let mut builder = AuditLogBuilder::new(tenant_id, event_type, AuditEventCategory::Authentication).status(status);
        if let Some(actor_id) = actor_id {
            builder = builder.actor("user", actor_id.to_string());
        }
        if let Err(err) = self.audit.record(builder.build()).await {
            tracing::error!(%err, event_type, "failed to record audit event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iam_authz::CapabilityResolver;
    use iam_models::{PrincipalType, User, UserMetadata, UserStatus};
    use iam_storage::memory::{
        InMemoryAuditSink, InMemoryCapabilityStore, InMemoryDenyListStore, InMemoryRefreshTokenStore, InMemoryRoleStore,
        InMemoryTenantStore, InMemoryUserStore,
    };

    use crate::claims::ClaimsBuilder;
    use crate::lifetime::{GlobalDefaults, LifetimeResolver};
    use crate::token::{KeySet, TokenService, TokenServiceConfig};

    type TestRefreshService = RefreshService<
        InMemoryUserStore,
        InMemoryTenantStore,
        InMemoryRoleStore,
        InMemoryCapabilityStore,
        InMemoryDenyListStore,
        InMemoryRefreshTokenStore,
        InMemoryAuditSink,
    >;

    fn seeded_user(mfa_enabled: bool) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            tenant_id: None,
            principal_type: PrincipalType::Tenant,
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            email_verified: true,
            password_hash: None,
            status: UserStatus::Active,
            mfa_enabled,
            mfa_enforced_at: None,
            metadata: UserMetadata::default(),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn test_service() -> (TestRefreshService, Arc<InMemoryUserStore>, Arc<InMemoryRefreshTokenStore>) {
        let keys = KeySet::from_hmac_secret("test-key-1", b"test-secret-at-least-32-bytes-long!!");
        let config = TokenServiceConfig {
            issuer: "iam-kernel".to_string(),
            audience: "iam-clients".to_string(),
            refresh_pepper: b"test-pepper".to_vec(),
        };
        let refresh_store = Arc::new(InMemoryRefreshTokenStore::new());
        let tokens = TokenService::new(keys, config, Arc::new(InMemoryDenyListStore::new()), refresh_store.clone());
        let issuer = TokenIssuer::new(
            Arc::new(InMemoryRoleStore::new()),
            Arc::new(CapabilityResolver::new(Arc::new(InMemoryCapabilityStore::new()))),
            tokens,
            LifetimeResolver::new(GlobalDefaults::default()),
            ClaimsBuilder::new("iam-kernel", "iam-clients"),
        );
        let users = Arc::new(InMemoryUserStore::new());
        let service = RefreshService::new(
            users.clone(),
            Arc::new(InMemoryTenantStore::new()),
            refresh_store.clone(),
            issuer,
            Arc::new(InMemoryAuditSink::new()),
        );
        (service, users, refresh_store)
    }

    #[tokio::test]
    async fn refresh_without_mfa_issues_new_tokens_and_revokes_old() {
        let (service, users, refresh_store) = test_service().await;
        let user = seeded_user(false);
        users.insert(user.clone()).await;

        let issued = service
            .issuer
            .issue(&user, None, false, false, None, None, None, None)
            .await
            .unwrap();

        let bundle = service.refresh(&issued.refresh_token).await.unwrap();
        assert_ne!(bundle.refresh_token, issued.refresh_token);

        let old_hash = service.issuer.tokens().hash_refresh(&issued.refresh_token).unwrap();
        let old_record = refresh_store.find_by_hash(&old_hash).await.unwrap().unwrap();
        assert!(old_record.revoked_at.is_some());
    }

    #[tokio::test]
    async fn refresh_rejects_pre_mfa_token_for_mfa_enabled_user() {
        let (service, users, _refresh_store) = test_service().await;
        let user = seeded_user(true);
        users.insert(user.clone()).await;

        let issued = service
            .issuer
            .issue(&user, None, false, false, None, None, None, None)
            .await
            .unwrap();

        let result = service.refresh(&issued.refresh_token).await;
        assert!(matches!(result, Err(AuthError::MfaRequired { .. })));
    }

    #[tokio::test]
    async fn reusing_a_rotated_away_token_revokes_the_whole_chain() {
        let (service, users, refresh_store) = test_service().await;
        let user = seeded_user(false);
        users.insert(user.clone()).await;

        let first = service
            .issuer
            .issue(&user, None, false, false, None, None, None, None)
            .await
            .unwrap();
        let second_bundle = service.refresh(&first.refresh_token).await.unwrap();

        // Replay the original, already-rotated-away plaintext.
        let result = service.refresh(&first.refresh_token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));

        let second_hash = service.issuer.tokens().hash_refresh(&second_bundle.refresh_token).unwrap();
        let second_record = refresh_store.find_by_hash(&second_hash).await.unwrap().unwrap();
        assert!(second_record.revoked_at.is_some());
    }

    #[tokio::test]
    async fn refresh_with_rotation_disabled_keeps_the_same_refresh_token() {
        let keys = KeySet::from_hmac_secret("test-key-1", b"test-secret-at-least-32-bytes-long!!");
        let config = TokenServiceConfig {
            issuer: "iam-kernel".to_string(),
            audience: "iam-clients".to_string(),
            refresh_pepper: b"test-pepper".to_vec(),
        };
        let refresh_store = Arc::new(InMemoryRefreshTokenStore::new());
        let tokens = TokenService::new(keys, config, Arc::new(InMemoryDenyListStore::new()), refresh_store.clone());
        let issuer = TokenIssuer::new(
            Arc::new(InMemoryRoleStore::new()),
            Arc::new(CapabilityResolver::new(Arc::new(InMemoryCapabilityStore::new()))),
            tokens,
            LifetimeResolver::new(GlobalDefaults::default()),
            ClaimsBuilder::new("iam-kernel", "iam-clients"),
        );
        let users = Arc::new(InMemoryUserStore::new());
        let tenants = Arc::new(InMemoryTenantStore::new());
        let service = RefreshService::new(users.clone(), tenants.clone(), refresh_store.clone(), issuer, Arc::new(InMemoryAuditSink::new()));

        let now = Utc::now();
        let mut settings = iam_models::TenantSettings::default();
        settings.token_rotation_enabled = false;
        let tenant = iam_models::Tenant {
            id: Uuid::new_v4(),
            domain: "acme".to_string(),
            name: "Acme".to_string(),
            status: iam_models::TenantStatus::Active,
            settings,
            metadata: std::collections::HashMap::new(),
            created_at: now,
            updated_at: now,
        };
        tenants.insert(tenant.clone()).await;

        let mut user = seeded_user(false);
        user.tenant_id = Some(tenant.id);
        users.insert(user.clone()).await;

        let issued = service
            .issuer
            .issue(&user, Some(&tenant), false, false, None, None, None, None)
            .await
            .unwrap();

        let bundle = service.refresh(&issued.refresh_token).await.unwrap();
        assert_eq!(bundle.refresh_token, issued.refresh_token);
        assert_ne!(bundle.access_token, issued.access_token);

        let hash = service.issuer.tokens().hash_refresh(&issued.refresh_token).unwrap();
        let record = refresh_store.find_by_hash(&hash).await.unwrap().unwrap();
        assert!(record.revoked_at.is_none());
    }
}
