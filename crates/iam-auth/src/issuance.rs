use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use iam_authz::CapabilityResolver;
use iam_models::{Tenant, User, KNOWN_CAPABILITIES};
use iam_storage::{CapabilityStore, DenyListStore, RefreshTokenStore, RoleStore};

use crate::claims::{ActorClaim, Claims, ClaimsBuilder, ClaimsInput};
use crate::error::Result;
use crate::lifetime::LifetimeResolver;
use crate::token::TokenService;

#[derive(Debug, Clone)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    pub id_token: String,
    pub expires_in: i64,
}

/// Shared by the login and refresh flows: once a principal has cleared
/// whatever check got them here (password, MFA, or an existing refresh
/// token), this is the single place that rebuilds effective roles and the
/// capability snapshot from current store state and mints a fresh token
/// triple. Claims are always derived live — never copied forward from a
/// prior token.
pub struct TokenIssuer<R, C, D, RT>
where
    R: RoleStore,
    C: CapabilityStore,
    D: DenyListStore,
    RT: RefreshTokenStore,
{
    roles: Arc<R>,
    capabilities: Arc<CapabilityResolver<C>>,
    tokens: TokenService<D, RT>,
    lifetimes: LifetimeResolver,
    claims_builder: ClaimsBuilder,
}

impl<R, C, D, RT> TokenIssuer<R, C, D, RT>
where
    R: RoleStore,
    C: CapabilityStore,
    D: DenyListStore,
    RT: RefreshTokenStore,
{
    pub fn new(
        roles: Arc<R>,
        capabilities: Arc<CapabilityResolver<C>>,
        tokens: TokenService<D, RT>,
        lifetimes: LifetimeResolver,
        claims_builder: ClaimsBuilder,
    ) -> Self {
        Self {
            roles,
            capabilities,
            tokens,
            lifetimes,
            claims_builder,
        }
    }

    pub fn tokens(&self) -> &TokenService<D, RT> {
        &self.tokens
    }

    /// `reuse_refresh`, when set, skips minting a new refresh token
    /// altogether and carries the given plaintext through unchanged — the
    /// caller is responsible for ensuring the underlying record is still
    /// valid. Used by the refresh flow when a tenant has rotation disabled.
    #[allow(clippy::too_many_arguments)]
    pub async fn issue(
        &self,
        user: &User,
        tenant: Option<&Tenant>,
        mfa_verified: bool,
        remember_me: bool,
        client_id: Option<String>,
        parent_refresh_hash: Option<String>,
        act: Option<ActorClaim>,
        reuse_refresh: Option<String>,
    ) -> Result<TokenBundle> {
        let settings = tenant.map(|t| t.settings.clone()).unwrap_or_default();
        let resolved = self.lifetimes.resolve(&settings, remember_me);

        let (roles, permissions, system_roles, system_permissions) = self.effective_roles(user).await?;
        let (capabilities, features) = self.capability_snapshot(user, tenant).await?;

        let now = Utc::now();
        let access_exp = now + resolved.access_ttl;
        let id_exp = now + resolved.id_ttl;

        let access_claims = self.claims_builder.build(
            ClaimsInput {
                user,
                roles,
                permissions,
                system_roles,
                system_permissions,
                capabilities,
                features,
                mfa_verified,
                act,
            },
            now,
            access_exp,
        );
        let id_claims = Claims {
            jti: Uuid::new_v4(),
            exp: id_exp.timestamp(),
            ..access_claims.clone()
        };

        let access_token = self.tokens.issue_access(&access_claims)?;
        let id_token = self.tokens.issue_id(&id_claims)?;
        let refresh_token = match reuse_refresh {
            Some(plaintext) => plaintext,
            None => {
                self.tokens
                    .issue_refresh(
                        user.id,
                        tenant.map(|t| t.id),
                        resolved.refresh_ttl,
                        mfa_verified,
                        client_id,
                        parent_refresh_hash,
                    )
                    .await?
                    .plaintext
            }
        };

        Ok(TokenBundle {
            access_token,
            refresh_token,
            id_token,
            expires_in: resolved.access_ttl.num_seconds(),
        })
    }

    async fn effective_roles(&self, user: &User) -> Result<(Vec<String>, Vec<String>, Vec<String>, Vec<String>)> {
        let roles = self.roles.get_user_roles(user.id).await?;
        let permissions = self.roles.get_user_permissions(user.id).await?;

        let mut tenant_roles = Vec::new();
        let mut system_roles = Vec::new();
        for role in roles {
            if role.tenant_id.is_none() {
                system_roles.push(role.name);
            } else {
                tenant_roles.push(role.name);
            }
        }

        let mut tenant_permissions = Vec::new();
        let mut system_permissions = Vec::new();
        for permission in permissions {
            if permission.tenant_id.is_none() {
                system_permissions.push(permission.as_string());
            } else {
                tenant_permissions.push(permission.as_string());
            }
        }

        Ok((tenant_roles, tenant_permissions, system_roles, system_permissions))
    }

    /// Advisory snapshot only; every field here is re-checked server-side
    /// by the capability resolver on the request path that actually needs
    /// it. System-principal logins carry no tenant-scoped capabilities.
    async fn capability_snapshot(&self, user: &User, tenant: Option<&Tenant>) -> Result<(HashMap<String, bool>, HashMap<String, bool>)> {
        let Some(tenant) = tenant else {
            return Ok((HashMap::new(), HashMap::new()));
        };

        let mut capabilities = HashMap::new();
        let mut features = HashMap::new();
        for key in KNOWN_CAPABILITIES {
            let decision = self.capabilities.evaluate(tenant.id, user.id, *key).await?;
            capabilities.insert((*key).to_string(), decision.can_use);
            let enabled = self.capabilities.is_tenant_feature_enabled(tenant.id, *key).await?;
            features.insert((*key).to_string(), enabled);
        }
        Ok((capabilities, features))
    }
}
