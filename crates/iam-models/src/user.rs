use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Whether a principal is bound to a tenant or is a system-scoped operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "UPPERCASE")]
pub enum PrincipalType {
    System,
    Tenant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Locked,
    Suspended,
    Disabled,
}

impl UserStatus {
    /// Any status other than `Active` precludes authentication.
    pub fn can_authenticate(self) -> bool {
        matches!(self, UserStatus::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,

    // None iff principal_type == System.
    pub tenant_id: Option<Uuid>,
    pub principal_type: PrincipalType,

    pub username: String,
    pub email: String,
    pub email_verified: bool,

    pub password_hash: Option<String>,

    #[sqlx(json)]
    pub metadata: UserMetadata,

    pub status: UserStatus,

    pub mfa_enabled: bool,
    pub mfa_enforced_at: Option<DateTime<Utc>>,

    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_system_principal(&self) -> bool {
        matches!(self.principal_type, PrincipalType::System)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewUser {
    pub tenant_id: Option<Uuid>,

    #[validate(length(min = 1, max = 255))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8))]
    pub password: Option<String>,

    pub metadata: Option<UserMetadata>,

    #[serde(default)]
    pub principal_type: Option<PrincipalType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserMetadata {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub locale: Option<String>,
    pub timezone: Option<String>,

    #[serde(flatten)]
    pub custom: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub username: String,
    pub email: String,
    pub email_verified: bool,
    pub metadata: UserMetadata,
    pub mfa_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            tenant_id: user.tenant_id,
            username: user.username,
            email: user.email,
            email_verified: user.email_verified,
            metadata: user.metadata,
            mfa_enabled: user.mfa_enabled,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(email)]
    pub email: Option<String>,
    pub metadata: Option<UserMetadata>,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChangePassword {
    #[validate(length(min = 8))]
    pub current_password: String,

    #[validate(length(min = 8))]
    pub new_password: String,
}
