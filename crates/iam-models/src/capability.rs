use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Canonical system capability keys. Anything outside this set is `unsupported`.
pub const CAPABILITY_MFA: &str = "mfa";
pub const CAPABILITY_TOTP: &str = "totp";
pub const CAPABILITY_SAML: &str = "saml";
pub const CAPABILITY_OIDC: &str = "oidc";
pub const CAPABILITY_OAUTH2: &str = "oauth2";
pub const CAPABILITY_PASSWORDLESS: &str = "passwordless";
pub const CAPABILITY_LDAP: &str = "ldap";
pub const CAPABILITY_MAX_TOKEN_TTL: &str = "max_token_ttl";
pub const CAPABILITY_ALLOWED_GRANT_TYPES: &str = "allowed_grant_types";
pub const CAPABILITY_ALLOWED_SCOPE_NAMESPACES: &str = "allowed_scope_namespaces";
pub const CAPABILITY_PKCE_MANDATORY: &str = "pkce_mandatory";

pub const KNOWN_CAPABILITIES: &[&str] = &[
    CAPABILITY_MFA,
    CAPABILITY_TOTP,
    CAPABILITY_SAML,
    CAPABILITY_OIDC,
    CAPABILITY_OAUTH2,
    CAPABILITY_PASSWORDLESS,
    CAPABILITY_LDAP,
    CAPABILITY_MAX_TOKEN_TTL,
    CAPABILITY_ALLOWED_GRANT_TYPES,
    CAPABILITY_ALLOWED_SCOPE_NAMESPACES,
    CAPABILITY_PKCE_MANDATORY,
];

/// Keys that additionally require a per-user enrollment record before use.
pub const USER_ENROLLABLE_CAPABILITIES: &[&str] = &[CAPABILITY_TOTP, CAPABILITY_PASSWORDLESS];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SystemCapability {
    pub key: String,
    pub enabled: bool,
    pub default_value: Option<serde_json::Value>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TenantCapability {
    pub tenant_id: Uuid,
    pub key: String,
    pub enabled: bool,
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TenantFeatureEnablement {
    pub tenant_id: Uuid,
    pub key: String,
    pub enabled: bool,
    pub configuration: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserCapabilityState {
    pub user_id: Uuid,
    pub key: String,
    pub enrolled: bool,
    pub state_data: Option<serde_json::Value>,
    pub enrolled_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}
