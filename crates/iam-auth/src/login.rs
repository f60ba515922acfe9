use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use iam_authz::CapabilityResolver;
use iam_models::{events, AuditEventCategory, AuditLogBuilder, AuditStatus, MfaState, Tenant, User};
use iam_storage::{
    AccountLockoutStore, AuditSink, CapabilityStore, DenyListStore, MfaStore, RefreshTokenStore,
    RoleStore, TenantStore, UserStore,
};

use crate::account_lockout::AccountLockoutGuard;
use crate::claims::ClaimsBuilder;
use crate::error::{AuthError, Result};
use crate::issuance::TokenIssuer;
use crate::lifetime::LifetimeResolver;
use crate::mfa::MfaSessionEngine;
use crate::password::PasswordHasher;
use crate::token::TokenService;

pub use crate::issuance::TokenBundle;

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
    pub remember_me: bool,
    pub client_id: Option<String>,
    pub ip_address: Option<IpAddr>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MfaChallengeRequest {
    pub mfa_session_id: Uuid,
    pub code: String,
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Tokens(TokenBundle),
    MfaRequired { mfa_session_id: Uuid },
}

/// Drives the password-check -> (optional MFA) -> token-issuance state
/// machine. A tenant-principal login is handed a resolved `Tenant`; a
/// system-principal login is handed `None` and every tenant-scoped policy
/// (lockout thresholds, MFA enforcement, capability snapshot) falls back
/// to its system-wide default.
pub struct LoginService<U, TS, R, C, D, RT, M, LS, A>
where
    U: UserStore,
    TS: TenantStore,
    R: RoleStore,
    C: CapabilityStore,
    D: DenyListStore,
    RT: RefreshTokenStore,
    M: MfaStore,
    LS: AccountLockoutStore,
    A: AuditSink,
{
    users: Arc<U>,
    tenants: Arc<TS>,
    audit: Arc<A>,
    mfa_store: Arc<M>,
    hasher: PasswordHasher,
    lockout: AccountLockoutGuard<LS>,
    mfa: MfaSessionEngine<M>,
    issuer: TokenIssuer<R, C, D, RT>,
}

impl<U, TS, R, C, D, RT, M, LS, A> LoginService<U, TS, R, C, D, RT, M, LS, A>
where
    U: UserStore,
    TS: TenantStore,
    R: RoleStore,
    C: CapabilityStore,
    D: DenyListStore,
    RT: RefreshTokenStore,
    M: MfaStore,
    LS: AccountLockoutStore,
    A: AuditSink,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<U>,
        tenants: Arc<TS>,
        audit: Arc<A>,
        mfa_store: Arc<M>,
        hasher: PasswordHasher,
        lockout: AccountLockoutGuard<LS>,
        mfa: MfaSessionEngine<M>,
        issuer: TokenIssuer<R, C, D, RT>,
    ) -> Self {
        Self {
            users,
            tenants,
            audit,
            mfa_store,
            hasher,
            lockout,
            mfa,
            issuer,
        }
    }

    /// Runs the password-check phase. Every rejection path (no such user,
    /// no password set, disabled/locked/banned account, wrong password)
    /// drives a dummy Argon2 verification first so none of them completes
    /// faster than a real wrong-password check.
    pub async fn authenticate(&self, tenant: Option<&Tenant>, request: LoginRequest) -> Result<LoginOutcome> {
        let tenant_id = tenant.map(|t| t.id);
        let user = self.users.find_by_login(tenant_id, &request.login).await?;

        let Some(user) = user else {
            self.hasher.dummy_verify(&request.password).await?;
            self.audit_failure(tenant_id, &request, None, "no matching account").await;
            return Err(AuthError::AuthenticationFailed);
        };

        if self.lockout.is_banned(user.id).await? {
            self.hasher.dummy_verify(&request.password).await?;
            self.audit_failure(tenant_id, &request, Some(&user), "account banned").await;
            return Err(AuthError::AccountDisabled);
        }

        if let Some(until) = self.lockout.is_locked(user.id).await? {
            if until > Utc::now() {
                self.hasher.dummy_verify(&request.password).await?;
                self.audit_failure(tenant_id, &request, Some(&user), "account locked").await;
                return Err(AuthError::AccountDisabled);
            }
        }

        if !user.status.can_authenticate() {
            self.hasher.dummy_verify(&request.password).await?;
            self.audit_failure(tenant_id, &request, Some(&user), "account not eligible to authenticate").await;
            return Err(AuthError::AccountDisabled);
        }

        let Some(stored_hash) = user.password_hash.as_deref() else {
            self.hasher.dummy_verify(&request.password).await?;
            self.audit_failure(tenant_id, &request, Some(&user), "no password credential set").await;
            return Err(AuthError::AuthenticationFailed);
        };

        let settings = tenant.map(|t| t.settings.clone()).unwrap_or_default();
        let (matched, needs_rehash) = self.hasher.verify(&request.password, stored_hash).await?;
        if !matched {
            // TenantSettings carries a single lockout duration; it doubles
            // as the lookback window for counting recent failures.
            self.lockout
                .record_failure(
                    user.id,
                    settings.max_login_attempts,
                    settings.lockout_duration_minutes,
                    settings.lockout_duration_minutes,
                )
                .await?;
            self.audit_failure(tenant_id, &request, Some(&user), "incorrect password").await;
            return Err(AuthError::AuthenticationFailed);
        }

        self.lockout.record_success(user.id).await?;
        if needs_rehash {
            let rehashed = self.hasher.hash(&request.password).await?;
            self.users.update_password_hash(user.id, &rehashed).await?;
        }
        self.users.touch_last_login(user.id, Utc::now()).await?;

        let mfa_required = user.mfa_enabled || settings.mfa_required;
        if mfa_required {
            let session = self.mfa.create(user.id, tenant_id, request.remember_me).await?;
            self.emit(tenant_id, "auth.mfa_challenge_issued", AuditStatus::Success, Some(user.id), None)
                .await;
            return Ok(LoginOutcome::MfaRequired {
                mfa_session_id: session.session_id,
            });
        }

        let bundle = self
            .issuer
            .issue(&user, tenant, false, request.remember_me, request.client_id.clone(), None, None, None)
            .await?;
        self.audit_success(tenant_id, &request, &user).await;
        Ok(LoginOutcome::Tokens(bundle))
    }

    /// Completes a pending MFA challenge and, on success, re-enters the
    /// token-issuance path with `mfa_verified` forced true — the same path
    /// a login that never required MFA would have taken.
    pub async fn complete_mfa_challenge(&self, request: MfaChallengeRequest) -> Result<TokenBundle> {
        let session = self
            .mfa_store
            .get_session(request.mfa_session_id)
            .await?
            .ok_or(AuthError::MfaSessionNotFound)?;

        let secret = self
            .mfa_store
            .get_secret(session.user_id)
            .await?
            .filter(|s| s.state == MfaState::Enrolled)
            .ok_or(AuthError::MfaInvalidCode)?;

        let verified = self.mfa.verify(request.mfa_session_id, &secret.secret, &request.code).await?;

        let user = self
            .users
            .find_by_id(verified.user_id)
            .await?
            .ok_or(AuthError::AuthenticationFailed)?;
        let tenant = match verified.tenant_id {
            Some(tenant_id) => self.tenants.find_by_id(tenant_id).await?,
            None => None,
        };

        let bundle = self
            .issuer
            .issue(&user, tenant.as_ref(), true, verified.remember_me, None, None, None, None)
            .await?;
        self.emit(verified.tenant_id, events::MFA_VERIFIED, AuditStatus::Success, Some(user.id), None)
            .await;
        Ok(bundle)
    }

    async fn audit_failure(&self, tenant_id: Option<Uuid>, request: &LoginRequest, user: Option<&User>, reason: &str) {
        let mut builder = AuditLogBuilder::new(tenant_id, events::USER_LOGIN_FAILED, AuditEventCategory::Authentication)
            .failure(reason)
            .actor_name(request.login.clone());
        if let Some(user) = user {
            builder = builder.actor("user", user.id.to_string());
        }
        if let Some(ip) = request.ip_address {
            builder = builder.actor_ip(ip);
        }
        if let Some(ua) = &request.user_agent {
            builder = builder.actor_user_agent(ua.clone());
        }
        if let Err(err) = self.audit.record(builder.build()).await {
            tracing::error!(%err, "failed to record login-failure audit event");
        }
    }

    async fn audit_success(&self, tenant_id: Option<Uuid>, request: &LoginRequest, user: &User) {
        let mut builder = AuditLogBuilder::new(tenant_id, events::USER_LOGIN, AuditEventCategory::Authentication)
            .status(AuditStatus::Success)
            .actor("user", user.id.to_string())
            .actor_name(user.username.clone());
        if let Some(ip) = request.ip_address {
            builder = builder.actor_ip(ip);
        }
        if let Some(ua) = &request.user_agent {
            builder = builder.actor_user_agent(ua.clone());
        }
        if let Err(err) = self.audit.record(builder.build()).await {
            tracing::error!(%err, "failed to record login-success audit event");
        }
    }

    async fn emit(&self, tenant_id: Option<Uuid>, event_type: &str, status: AuditStatus, actor_id: Option<Uuid>, description: Option<&str>) {
        let mut builder = AuditLogBuilder::new(tenant_id, event_type, AuditEventCategory::Authentication).status(status);
        if let Some(actor_id) = actor_id {
            builder = builder.actor("user", actor_id.to_string());
        }
        if let Some(description) = description {
            builder = builder.description(description);
        }
        if let Err(err) = self.audit.record(builder.build()).await {
            tracing::error!(%err, event_type, "failed to record audit event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iam_models::{PrincipalType, UserMetadata, UserStatus};
    use iam_storage::memory::{
        InMemoryAccountLockoutStore, InMemoryCapabilityStore, InMemoryDenyListStore, InMemoryMfaStore,
        InMemoryRefreshTokenStore, InMemoryRoleStore, InMemoryTenantStore, InMemoryUserStore,
    };

    type TestLoginService = LoginService<
        InMemoryUserStore,
        InMemoryTenantStore,
        InMemoryRoleStore,
        InMemoryCapabilityStore,
        InMemoryDenyListStore,
        InMemoryRefreshTokenStore,
        InMemoryMfaStore,
        InMemoryAccountLockoutStore,
        iam_storage::memory::InMemoryAuditSink,
    >;

    async fn seeded_user(store: &InMemoryUserStore, mfa_enabled: bool) -> User {
        let hasher = PasswordHasher::new(crate::password::KdfParams::default());
        let hash = hasher.hash("correct horse battery staple").await.unwrap();
        let now = chrono::Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            tenant_id: None,
            principal_type: PrincipalType::Tenant,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            email_verified: true,
            password_hash: Some(hash),
            status: UserStatus::Active,
            mfa_enabled,
            mfa_enforced_at: None,
            metadata: UserMetadata::default(),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        store.insert(user.clone()).await;
        user
    }

    fn test_service(users: Arc<InMemoryUserStore>, mfa_store: Arc<InMemoryMfaStore>) -> TestLoginService {
        let keys = crate::token::KeySet::from_hmac_secret("test-key-1", b"test-secret-at-least-32-bytes-long!!");
        let token_config = crate::token::TokenServiceConfig {
            issuer: "iam-kernel".to_string(),
            audience: "iam-clients".to_string(),
            refresh_pepper: b"test-pepper".to_vec(),
        };
        let tokens = TokenService::new(
            keys,
            token_config,
            Arc::new(InMemoryDenyListStore::new()),
            Arc::new(InMemoryRefreshTokenStore::new()),
        );
        let lockout_store = Arc::new(InMemoryAccountLockoutStore::new());
        let issuer = TokenIssuer::new(
            Arc::new(InMemoryRoleStore::new()),
            Arc::new(CapabilityResolver::new(Arc::new(InMemoryCapabilityStore::new()))),
            tokens,
            LifetimeResolver::new(crate::lifetime::GlobalDefaults::default()),
            ClaimsBuilder::new("iam-kernel", "iam-clients"),
        );
        LoginService::new(
            users,
            Arc::new(InMemoryTenantStore::new()),
            Arc::new(iam_storage::memory::InMemoryAuditSink::new()),
            mfa_store.clone(),
            PasswordHasher::new(crate::password::KdfParams::default()),
            AccountLockoutGuard::new(lockout_store),
            MfaSessionEngine::new(mfa_store),
            issuer,
        )
    }

    #[tokio::test]
    async fn login_without_mfa_issues_tokens() {
        let users = Arc::new(InMemoryUserStore::new());
        let user = seeded_user(&users, false).await;
        let mfa_store = Arc::new(InMemoryMfaStore::new());
        let service = test_service(users, mfa_store);

        let outcome = service
            .authenticate(
                None,
                LoginRequest {
                    login: user.username.clone(),
                    password: "correct horse battery staple".to_string(),
                    remember_me: false,
                    client_id: None,
                    ip_address: None,
                    user_agent: None,
                },
            )
            .await
            .unwrap();

        match outcome {
            LoginOutcome::Tokens(bundle) => assert!(bundle.access_token.len() > 10),
            LoginOutcome::MfaRequired { .. } => panic!("expected immediate tokens"),
        }
    }

    #[tokio::test]
    async fn login_with_mfa_enabled_requires_challenge_then_issues_tokens() {
        let users = Arc::new(InMemoryUserStore::new());
        let user = seeded_user(&users, true).await;
        let mfa_store = Arc::new(InMemoryMfaStore::new());

        let secret = crate::mfa::generate_secret();
        mfa_store
            .put_secret(iam_models::MfaSecret {
                user_id: user.id,
                secret: secret.clone(),
                state: MfaState::Enrolled,
                created_at: chrono::Utc::now(),
                confirmed_at: Some(chrono::Utc::now()),
                last_used_at: None,
            })
            .await
            .unwrap();

        let service = test_service(users, mfa_store);

        let outcome = service
            .authenticate(
                None,
                LoginRequest {
                    login: user.username.clone(),
                    password: "correct horse battery staple".to_string(),
                    remember_me: false,
                    client_id: None,
                    ip_address: None,
                    user_agent: None,
                },
            )
            .await
            .unwrap();

        let mfa_session_id = match outcome {
            LoginOutcome::MfaRequired { mfa_session_id } => mfa_session_id,
            LoginOutcome::Tokens(_) => panic!("expected an mfa challenge"),
        };

        let code = crate::mfa::generate_totp(&secret).unwrap();
        let bundle = service
            .complete_mfa_challenge(MfaChallengeRequest {
                mfa_session_id,
                code,
            })
            .await
            .unwrap();

        let claims = service.issuer.tokens().validate_access(&bundle.access_token).await.unwrap();
        assert!(claims.mfa_verified);
    }

    #[tokio::test]
    async fn wrong_password_locks_account_after_threshold() {
        let users = Arc::new(InMemoryUserStore::new());
        let user = seeded_user(&users, false).await;
        let mfa_store = Arc::new(InMemoryMfaStore::new());
        let service = test_service(users, mfa_store);

        for _ in 0..4 {
            let result = service
                .authenticate(
                    None,
                    LoginRequest {
                        login: user.username.clone(),
                        password: "wrong password".to_string(),
                        remember_me: false,
                        client_id: None,
                        ip_address: None,
                        user_agent: None,
                    },
                )
                .await;
            assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
        }

        let locked_result = service
            .authenticate(
                None,
                LoginRequest {
                    login: user.username.clone(),
                    password: "wrong password".to_string(),
                    remember_me: false,
                    client_id: None,
                    ip_address: None,
                    user_agent: None,
                },
            )
            .await;
        assert!(matches!(locked_result, Err(AuthError::AccountDisabled)));

        let even_correct_password_now_fails = service
            .authenticate(
                None,
                LoginRequest {
                    login: user.username.clone(),
                    password: "correct horse battery staple".to_string(),
                    remember_me: false,
                    client_id: None,
                    ip_address: None,
                    user_agent: None,
                },
            )
            .await;
        assert!(matches!(even_correct_password_now_fails, Err(AuthError::AccountDisabled)));
    }

    #[tokio::test]
    async fn unknown_user_fails_without_panicking_on_dummy_verify() {
        let users = Arc::new(InMemoryUserStore::new());
        let mfa_store = Arc::new(InMemoryMfaStore::new());
        let service = test_service(users, mfa_store);

        let result = service
            .authenticate(
                None,
                LoginRequest {
                    login: "nobody".to_string(),
                    password: "anything".to_string(),
                    remember_me: false,
                    client_id: None,
                    ip_address: None,
                    user_agent: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    }
}
