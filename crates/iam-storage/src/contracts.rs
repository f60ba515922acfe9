//! Small, independently mockable persistence interfaces. Each trait covers
//! one cohesive slice of state rather than a single "repository of
//! everything" — callers depend on only the traits they actually need, and
//! tests substitute in-memory implementations without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use iam_models::{
    AuditLog, CreateAuditLog, ImpersonationSession, MfaSecret, MfaSession, Permission,
    RecoveryCode, RefreshTokenRecord, Role, SystemCapability, TenantCapability,
    TenantFeatureEnablement, UserCapabilityState, UserRoleAssignment,
};
use iam_models::{Tenant, User};

use crate::error::Result;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_login(&self, tenant_id: Option<Uuid>, login: &str) -> Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn update_password_hash(&self, user_id: Uuid, new_hash: &str) -> Result<()>;
    async fn touch_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<()>;
    async fn set_status(&self, user_id: Uuid, status: iam_models::UserStatus) -> Result<()>;
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>>;
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<Role>>;
    async fn get_role_permissions(&self, role_id: Uuid) -> Result<Vec<Permission>>;
    async fn get_user_permissions(&self, user_id: Uuid) -> Result<Vec<Permission>>;
    async fn assign_role(&self, assignment: UserRoleAssignment) -> Result<()>;
    async fn revoke_role(&self, user_id: Uuid, role_id: Uuid) -> Result<()>;
    async fn count_role_holders(&self, tenant_id: Uuid, role_name: &str) -> Result<i64>;
    /// Counts holders of a system-scoped role (`tenant_id IS NULL`) across
    /// every tenant — the reserved system roles (`system_owner`,
    /// `system_auditor`) have no single tenant to scope the count to.
    async fn count_system_role_holders(&self, role_name: &str) -> Result<i64>;
    async fn find_role_by_name(&self, tenant_id: Option<Uuid>, name: &str) -> Result<Option<Role>>;
    async fn find_role_by_id(&self, role_id: Uuid) -> Result<Option<Role>>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<()>;
    async fn find_by_hash(&self, hash: &str) -> Result<Option<RefreshTokenRecord>>;
    /// Atomically marks the record revoked iff it was not already revoked.
    /// Returns `true` if this call performed the revocation.
    async fn revoke(&self, hash: &str) -> Result<bool>;
    async fn revoke_chain_from(&self, hash: &str) -> Result<()>;
    async fn list_active_for_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>>;
    async fn find_child_of(&self, parent_hash: &str) -> Result<Option<RefreshTokenRecord>>;
}

#[async_trait]
pub trait DenyListStore: Send + Sync {
    async fn insert(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<()>;
    async fn contains(&self, jti: &str) -> Result<bool>;
}

#[async_trait]
pub trait CapabilityStore: Send + Sync {
    async fn get_system_capability(&self, key: &str) -> Result<Option<SystemCapability>>;
    async fn get_tenant_capability(&self, tenant_id: Uuid, key: &str) -> Result<Option<TenantCapability>>;
    async fn put_tenant_capability(&self, capability: TenantCapability) -> Result<()>;
    async fn get_tenant_feature(&self, tenant_id: Uuid, key: &str) -> Result<Option<TenantFeatureEnablement>>;
    async fn put_tenant_feature(&self, feature: TenantFeatureEnablement) -> Result<()>;
    async fn get_user_capability_state(&self, user_id: Uuid, key: &str) -> Result<Option<UserCapabilityState>>;
    async fn put_user_capability_state(&self, state: UserCapabilityState) -> Result<()>;
}

#[async_trait]
pub trait MfaStore: Send + Sync {
    async fn get_secret(&self, user_id: Uuid) -> Result<Option<MfaSecret>>;
    async fn put_secret(&self, secret: MfaSecret) -> Result<()>;
    async fn delete_secret(&self, user_id: Uuid) -> Result<()>;

    async fn put_recovery_codes(&self, codes: Vec<RecoveryCode>) -> Result<()>;
    async fn find_recovery_code(&self, user_id: Uuid, code_hash_candidates: &[String]) -> Result<Option<RecoveryCode>>;
    async fn delete_recovery_code(&self, id: Uuid) -> Result<()>;
    async fn count_recovery_codes(&self, user_id: Uuid) -> Result<i64>;

    async fn create_session(&self, session: MfaSession) -> Result<()>;
    async fn get_session(&self, session_id: Uuid) -> Result<Option<MfaSession>>;
    /// Atomically increments the attempt counter and returns the updated session.
    async fn increment_attempt(&self, session_id: Uuid) -> Result<Option<MfaSession>>;
    async fn delete_session(&self, session_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait AccountLockoutStore: Send + Sync {
    async fn record_attempt(&self, user_id: Uuid, success: bool, at: DateTime<Utc>) -> Result<()>;
    async fn count_recent_failures(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64>;
    async fn lock_account(&self, user_id: Uuid, until: DateTime<Utc>, reason: &str) -> Result<()>;
    async fn unlock_account(&self, user_id: Uuid) -> Result<()>;
    async fn locked_until(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>>;
    async fn is_banned(&self, user_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: CreateAuditLog) -> Result<()>;
}

#[async_trait]
pub trait AuditQueryStore: Send + Sync {
    async fn insert(&self, event: CreateAuditLog) -> Result<AuditLog>;
}

#[async_trait]
pub trait ImpersonationStore: Send + Sync {
    async fn create(&self, session: ImpersonationSession) -> Result<()>;
    async fn find_active(&self, id: Uuid) -> Result<Option<ImpersonationSession>>;
    async fn end(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
}
