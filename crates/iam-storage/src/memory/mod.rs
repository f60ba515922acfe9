//! In-memory implementations of the persistence contracts, used by the test
//! suites in `iam-auth`/`iam-authz` so the authentication and capability
//! state machines can be exercised without a live Postgres/Redis instance.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use iam_models::{
    CreateAuditLog, ImpersonationSession, MfaSecret, MfaSession, Permission, RecoveryCode,
    RefreshTokenRecord, Role, SystemCapability, Tenant, TenantCapability,
    TenantFeatureEnablement, User, UserCapabilityState, UserRoleAssignment, UserStatus,
};

use crate::contracts::{
    AccountLockoutStore, AuditSink, CapabilityStore, DenyListStore, ImpersonationStore, MfaStore,
    RefreshTokenStore, RoleStore, TenantStore, UserStore,
};
use crate::error::Result;

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_login(&self, tenant_id: Option<Uuid>, login: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.tenant_id == tenant_id && (u.username == login || u.email == login))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update_password_hash(&self, user_id: Uuid, new_hash: &str) -> Result<()> {
        if let Some(user) = self.users.write().await.get_mut(&user_id) {
            user.password_hash = Some(new_hash.to_string());
        }
        Ok(())
    }

    async fn touch_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if let Some(user) = self.users.write().await.get_mut(&user_id) {
            user.last_login_at = Some(at);
        }
        Ok(())
    }

    async fn set_status(&self, user_id: Uuid, status: UserStatus) -> Result<()> {
        if let Some(user) = self.users.write().await.get_mut(&user_id) {
            user.status = status;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTenantStore {
    tenants: RwLock<HashMap<Uuid, Tenant>>,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, tenant: Tenant) {
        self.tenants.write().await.insert(tenant.id, tenant);
    }

    pub async fn set_status(&self, id: Uuid, status: iam_models::TenantStatus) {
        if let Some(tenant) = self.tenants.write().await.get_mut(&id) {
            tenant.status = status;
        }
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>> {
        Ok(self.tenants.read().await.get(&id).cloned())
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>> {
        Ok(self
            .tenants
            .read()
            .await
            .values()
            .find(|t| t.domain == domain)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryRoleStore {
    roles: RwLock<HashMap<Uuid, Role>>,
    permissions: RwLock<HashMap<Uuid, Permission>>,
    role_permissions: RwLock<Vec<(Uuid, Uuid)>>,
    user_roles: RwLock<Vec<UserRoleAssignment>>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_role(&self, role: Role) {
        self.roles.write().await.insert(role.id, role);
    }

    pub async fn insert_permission(&self, permission: Permission) {
        self.permissions
            .write()
            .await
            .insert(permission.id, permission);
    }

    pub async fn link_permission(&self, role_id: Uuid, permission_id: Uuid) {
        self.role_permissions.write().await.push((role_id, permission_id));
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<Role>> {
        let assignments = self.user_roles.read().await;
        let roles = self.roles.read().await;
        Ok(assignments
            .iter()
            .filter(|a| a.user_id == user_id)
            .filter_map(|a| roles.get(&a.role_id).cloned())
            .collect())
    }

    async fn get_role_permissions(&self, role_id: Uuid) -> Result<Vec<Permission>> {
        let links = self.role_permissions.read().await;
        let permissions = self.permissions.read().await;
        Ok(links
            .iter()
            .filter(|(rid, _)| *rid == role_id)
            .filter_map(|(_, pid)| permissions.get(pid).cloned())
            .collect())
    }

    async fn get_user_permissions(&self, user_id: Uuid) -> Result<Vec<Permission>> {
        let roles = self.get_user_roles(user_id).await?;
        let mut out = Vec::new();
        for role in roles {
            out.extend(self.get_role_permissions(role.id).await?);
        }
        out.dedup_by_key(|p| p.id);
        Ok(out)
    }

    async fn assign_role(&self, assignment: UserRoleAssignment) -> Result<()> {
        let mut assignments = self.user_roles.write().await;
        if !assignments
            .iter()
            .any(|a| a.user_id == assignment.user_id && a.role_id == assignment.role_id)
        {
            assignments.push(assignment);
        }
        Ok(())
    }

    async fn revoke_role(&self, user_id: Uuid, role_id: Uuid) -> Result<()> {
        self.user_roles
            .write()
            .await
            .retain(|a| !(a.user_id == user_id && a.role_id == role_id));
        Ok(())
    }

    async fn count_role_holders(&self, tenant_id: Uuid, role_name: &str) -> Result<i64> {
        let roles = self.roles.read().await;
        let assignments = self.user_roles.read().await;
        let matching_role_ids: Vec<Uuid> = roles
            .values()
            .filter(|r| r.tenant_id == Some(tenant_id) && r.name == role_name)
            .map(|r| r.id)
            .collect();
        Ok(assignments
            .iter()
            .filter(|a| matching_role_ids.contains(&a.role_id))
            .count() as i64)
    }

    async fn count_system_role_holders(&self, role_name: &str) -> Result<i64> {
        let roles = self.roles.read().await;
        let assignments = self.user_roles.read().await;
        let matching_role_ids: Vec<Uuid> = roles
            .values()
            .filter(|r| r.tenant_id.is_none() && r.name == role_name)
            .map(|r| r.id)
            .collect();
        Ok(assignments
            .iter()
            .filter(|a| matching_role_ids.contains(&a.role_id))
            .count() as i64)
    }

    async fn find_role_by_name(&self, tenant_id: Option<Uuid>, name: &str) -> Result<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .values()
            .find(|r| r.tenant_id == tenant_id && r.name == name)
            .cloned())
    }

    async fn find_role_by_id(&self, role_id: Uuid) -> Result<Option<Role>> {
        Ok(self.roles.read().await.get(&role_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    records: RwLock<HashMap<String, RefreshTokenRecord>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<()> {
        self.records.write().await.insert(record.hash.clone(), record);
        Ok(())
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<RefreshTokenRecord>> {
        Ok(self.records.read().await.get(hash).cloned())
    }

    async fn revoke(&self, hash: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(hash) {
            if record.revoked_at.is_none() {
                record.revoked_at = Some(Utc::now());
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn revoke_chain_from(&self, hash: &str) -> Result<()> {
        let mut records = self.records.write().await;
        let mut frontier = vec![hash.to_string()];
        let now = Utc::now();
        while let Some(current) = frontier.pop() {
            if let Some(record) = records.get_mut(&current) {
                if record.revoked_at.is_none() {
                    record.revoked_at = Some(now);
                }
            }
            let children: Vec<String> = records
                .values()
                .filter(|r| r.parent_hash.as_deref() == Some(current.as_str()))
                .map(|r| r.hash.clone())
                .collect();
            frontier.extend(children);
        }
        Ok(())
    }

    async fn list_active_for_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>> {
        let now = Utc::now();
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id && r.is_usable(now))
            .cloned()
            .collect())
    }

    async fn find_child_of(&self, parent_hash: &str) -> Result<Option<RefreshTokenRecord>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|r| r.parent_hash.as_deref() == Some(parent_hash))
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryDenyListStore {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryDenyListStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DenyListStore for InMemoryDenyListStore {
    async fn insert(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.entries.write().await.insert(jti.to_string(), expires_at);
        Ok(())
    }

    async fn contains(&self, jti: &str) -> Result<bool> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(jti)
            .map(|exp| *exp > Utc::now())
            .unwrap_or(false))
    }
}

#[derive(Default)]
pub struct InMemoryCapabilityStore {
    system: RwLock<HashMap<String, SystemCapability>>,
    tenant_capabilities: RwLock<HashMap<(Uuid, String), TenantCapability>>,
    tenant_features: RwLock<HashMap<(Uuid, String), TenantFeatureEnablement>>,
    user_state: RwLock<HashMap<(Uuid, String), UserCapabilityState>>,
}

impl InMemoryCapabilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_system(&self, capability: SystemCapability) {
        self.system.write().await.insert(capability.key.clone(), capability);
    }
}

#[async_trait]
impl CapabilityStore for InMemoryCapabilityStore {
    async fn get_system_capability(&self, key: &str) -> Result<Option<SystemCapability>> {
        Ok(self.system.read().await.get(key).cloned())
    }

    async fn get_tenant_capability(&self, tenant_id: Uuid, key: &str) -> Result<Option<TenantCapability>> {
        Ok(self
            .tenant_capabilities
            .read()
            .await
            .get(&(tenant_id, key.to_string()))
            .cloned())
    }

    async fn put_tenant_capability(&self, capability: TenantCapability) -> Result<()> {
        self.tenant_capabilities
            .write()
            .await
            .insert((capability.tenant_id, capability.key.clone()), capability);
        Ok(())
    }

    async fn get_tenant_feature(&self, tenant_id: Uuid, key: &str) -> Result<Option<TenantFeatureEnablement>> {
        Ok(self
            .tenant_features
            .read()
            .await
            .get(&(tenant_id, key.to_string()))
            .cloned())
    }

    async fn put_tenant_feature(&self, feature: TenantFeatureEnablement) -> Result<()> {
        self.tenant_features
            .write()
            .await
            .insert((feature.tenant_id, feature.key.clone()), feature);
        Ok(())
    }

    async fn get_user_capability_state(&self, user_id: Uuid, key: &str) -> Result<Option<UserCapabilityState>> {
        Ok(self
            .user_state
            .read()
            .await
            .get(&(user_id, key.to_string()))
            .cloned())
    }

    async fn put_user_capability_state(&self, state: UserCapabilityState) -> Result<()> {
        self.user_state
            .write()
            .await
            .insert((state.user_id, state.key.clone()), state);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMfaStore {
    secrets: RwLock<HashMap<Uuid, MfaSecret>>,
    recovery_codes: RwLock<HashMap<Uuid, RecoveryCode>>,
    sessions: RwLock<HashMap<Uuid, MfaSession>>,
}

impl InMemoryMfaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MfaStore for InMemoryMfaStore {
    async fn get_secret(&self, user_id: Uuid) -> Result<Option<MfaSecret>> {
        Ok(self.secrets.read().await.get(&user_id).cloned())
    }

    async fn put_secret(&self, secret: MfaSecret) -> Result<()> {
        self.secrets.write().await.insert(secret.user_id, secret);
        Ok(())
    }

    async fn delete_secret(&self, user_id: Uuid) -> Result<()> {
        self.secrets.write().await.remove(&user_id);
        Ok(())
    }

    async fn put_recovery_codes(&self, codes: Vec<RecoveryCode>) -> Result<()> {
        let mut store = self.recovery_codes.write().await;
        for code in codes {
            store.insert(code.id, code);
        }
        Ok(())
    }

    async fn find_recovery_code(&self, user_id: Uuid, code_hash_candidates: &[String]) -> Result<Option<RecoveryCode>> {
        Ok(self
            .recovery_codes
            .read()
            .await
            .values()
            .find(|c| c.user_id == user_id && code_hash_candidates.contains(&c.code_hash))
            .cloned())
    }

    async fn delete_recovery_code(&self, id: Uuid) -> Result<()> {
        self.recovery_codes.write().await.remove(&id);
        Ok(())
    }

    async fn count_recovery_codes(&self, user_id: Uuid) -> Result<i64> {
        Ok(self
            .recovery_codes
            .read()
            .await
            .values()
            .filter(|c| c.user_id == user_id)
            .count() as i64)
    }

    async fn create_session(&self, session: MfaSession) -> Result<()> {
        self.sessions.write().await.insert(session.session_id, session);
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> Result<Option<MfaSession>> {
        Ok(self.sessions.read().await.get(&session_id).cloned())
    }

    async fn increment_attempt(&self, session_id: Uuid) -> Result<Option<MfaSession>> {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&session_id) {
            session.attempts += 1;
            return Ok(Some(session.clone()));
        }
        Ok(None)
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<()> {
        self.sessions.write().await.remove(&session_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAccountLockoutStore {
    attempts: RwLock<Vec<(Uuid, bool, DateTime<Utc>)>>,
    lockouts: RwLock<HashMap<Uuid, DateTime<Utc>>>,
    bans: RwLock<std::collections::HashSet<Uuid>>,
}

impl InMemoryAccountLockoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ban(&self, user_id: Uuid) {
        self.bans.write().await.insert(user_id);
    }
}

#[async_trait]
impl AccountLockoutStore for InMemoryAccountLockoutStore {
    async fn record_attempt(&self, user_id: Uuid, success: bool, at: DateTime<Utc>) -> Result<()> {
        self.attempts.write().await.push((user_id, success, at));
        Ok(())
    }

    async fn count_recent_failures(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64> {
        Ok(self
            .attempts
            .read()
            .await
            .iter()
            .filter(|(uid, success, at)| *uid == user_id && !success && *at > since)
            .count() as i64)
    }

    async fn lock_account(&self, user_id: Uuid, until: DateTime<Utc>, _reason: &str) -> Result<()> {
        self.lockouts.write().await.insert(user_id, until);
        Ok(())
    }

    async fn unlock_account(&self, user_id: Uuid) -> Result<()> {
        self.lockouts.write().await.remove(&user_id);
        Ok(())
    }

    async fn locked_until(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        Ok(self.lockouts.read().await.get(&user_id).copied())
    }

    async fn is_banned(&self, user_id: Uuid) -> Result<bool> {
        Ok(self.bans.read().await.contains(&user_id))
    }
}

/// Captures emitted events for assertion in tests instead of discarding them.
#[derive(Default)]
pub struct InMemoryAuditSink {
    pub events: RwLock<Vec<CreateAuditLog>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<CreateAuditLog> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, event: CreateAuditLog) -> Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}

pub type SharedInMemoryAuditSink = Arc<InMemoryAuditSink>;

#[derive(Default)]
pub struct InMemoryImpersonationStore {
    sessions: RwLock<HashMap<Uuid, ImpersonationSession>>,
}

impl InMemoryImpersonationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImpersonationStore for InMemoryImpersonationStore {
    async fn create(&self, session: ImpersonationSession) -> Result<()> {
        self.sessions.write().await.insert(session.id, session);
        Ok(())
    }

    async fn find_active(&self, id: Uuid) -> Result<Option<ImpersonationSession>> {
        Ok(self.sessions.read().await.get(&id).filter(|s| s.is_active()).cloned())
    }

    async fn end(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.ended_at = Some(at);
        }
        Ok(())
    }
}
