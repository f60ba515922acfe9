use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use iam_models::{PrincipalType, User};

/// RFC-8693 nested actor claim, carried when the token was minted during an
/// impersonation session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActorClaim {
    pub sub: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,

    pub tenant_id: Option<Uuid>,
    pub username: String,
    pub email: String,
    pub principal_type: PrincipalType,

    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub system_roles: Vec<String>,
    #[serde(default)]
    pub system_permissions: Vec<String>,

    pub mfa_verified: bool,

    /// Advisory only; authoritative enforcement happens server-side per
    /// request via the Capability Resolver, never by trusting this map.
    #[serde(default)]
    pub capabilities: HashMap<String, bool>,
    #[serde(default)]
    pub features: HashMap<String, bool>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub act: Option<ActorClaim>,
}

/// What the login/refresh/impersonation flows need to compose a claim set.
/// Effective roles/permissions are tenant-scoped for tenant principals and
/// system-scoped for system principals; the builder never mixes the two.
pub struct ClaimsInput<'a> {
    pub user: &'a User,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub system_roles: Vec<String>,
    pub system_permissions: Vec<String>,
    pub capabilities: HashMap<String, bool>,
    pub features: HashMap<String, bool>,
    pub mfa_verified: bool,
    pub act: Option<ActorClaim>,
}

pub struct ClaimsBuilder {
    pub issuer: String,
    pub audience: String,
}

impl ClaimsBuilder {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    pub fn build(&self, input: ClaimsInput<'_>, issued_at: chrono::DateTime<chrono::Utc>, expires_at: chrono::DateTime<chrono::Utc>) -> Claims {
        Claims {
            sub: input.user.id,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
            tenant_id: input.user.tenant_id,
            username: input.user.username.clone(),
            email: input.user.email.clone(),
            principal_type: input.user.principal_type,
            roles: input.roles,
            permissions: input.permissions,
            system_roles: input.system_roles,
            system_permissions: input.system_permissions,
            mfa_verified: input.mfa_verified,
            capabilities: input.capabilities,
            features: input.features,
            act: input.act,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iam_models::UserStatus;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            tenant_id: Some(Uuid::new_v4()),
            principal_type: PrincipalType::Tenant,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            email_verified: true,
            password_hash: Some("hash".to_string()),
            status: UserStatus::Active,
            mfa_enabled: false,
            mfa_enforced_at: None,
            metadata: iam_models::UserMetadata::default(),
            last_login_at: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn builds_claims_with_tenant_scope() {
        let builder = ClaimsBuilder::new("iam-kernel", "iam-clients");
        let user = sample_user();
        let now = chrono::Utc::now();
        let claims = builder.build(
            ClaimsInput {
                user: &user,
                roles: vec!["tenant_owner".to_string()],
                permissions: vec!["users:read".to_string()],
                system_roles: vec![],
                system_permissions: vec![],
                capabilities: HashMap::new(),
                features: HashMap::new(),
                mfa_verified: true,
                act: None,
            },
            now,
            now + chrono::Duration::minutes(15),
        );

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.tenant_id, user.tenant_id);
        assert!(claims.mfa_verified);
        assert!(claims.act.is_none());
    }

    #[test]
    fn carries_actor_claim_for_impersonation() {
        let builder = ClaimsBuilder::new("iam-kernel", "iam-clients");
        let user = sample_user();
        let impersonator = Uuid::new_v4();
        let now = chrono::Utc::now();
        let claims = builder.build(
            ClaimsInput {
                user: &user,
                roles: vec![],
                permissions: vec![],
                system_roles: vec![],
                system_permissions: vec![],
                capabilities: HashMap::new(),
                features: HashMap::new(),
                mfa_verified: true,
                act: Some(ActorClaim { sub: impersonator }),
            },
            now,
            now + chrono::Duration::minutes(15),
        );

        assert_eq!(claims.act, Some(ActorClaim { sub: impersonator }));
    }
}
