use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Reserved role names carrying ownership/audit invariants (see `reserved_role`).
pub const ROLE_TENANT_OWNER: &str = "tenant_owner";
pub const ROLE_SYSTEM_OWNER: &str = "system_owner";
pub const ROLE_SYSTEM_AUDITOR: &str = "system_auditor";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    // None for system-scoped roles.
    pub tenant_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn is_reserved(&self) -> bool {
        matches!(
            self.name.as_str(),
            ROLE_TENANT_OWNER | ROLE_SYSTEM_OWNER | ROLE_SYSTEM_AUDITOR
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewRole {
    pub tenant_id: Option<Uuid>,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateRole {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A `(resource, action)` permission, rendered on the wire as `"resource:action"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: Uuid,
    // None for system-scoped permissions.
    pub tenant_id: Option<Uuid>,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Permission {
    pub fn as_string(&self) -> String {
        format!("{}:{}", self.resource, self.action)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPermission {
    pub tenant_id: Option<Uuid>,

    #[validate(length(min = 1, max = 128))]
    pub resource: String,

    #[validate(length(min = 1, max = 128))]
    pub action: String,

    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RolePermission {
    pub role_id: Uuid,
    pub permission_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRoleAssignment {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub granted_at: DateTime<Utc>,
    pub granted_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRole {
    pub user_id: Uuid,
    pub role_id: Uuid,
}
