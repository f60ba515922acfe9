use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Suspended,
    Deleted,
}

impl TenantStatus {
    pub fn accepts_authentication(self) -> bool {
        matches!(self, TenantStatus::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub domain: String,
    pub name: String,
    pub status: TenantStatus,

    #[sqlx(json)]
    pub settings: TenantSettings,

    #[sqlx(json)]
    pub metadata: HashMap<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTenant {
    #[validate(length(min = 1, max = 255))]
    pub domain: String,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    pub settings: Option<TenantSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateTenant {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub status: Option<TenantStatus>,
    pub settings: Option<TenantSettings>,
}

/// Per-tenant policy consulted by the lifetime resolver, login service, and
/// password hasher. Every field has a system-wide default it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSettings {
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,

    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: i64,

    #[serde(default = "default_id_token_minutes")]
    pub id_token_minutes: i64,

    #[serde(default)]
    pub remember_me_enabled: bool,

    #[serde(default = "default_remember_me_refresh_days")]
    pub remember_me_refresh_days: i64,

    #[serde(default = "default_true")]
    pub token_rotation_enabled: bool,

    #[serde(default)]
    pub require_mfa_for_extended_sessions: bool,

    #[serde(default)]
    pub mfa_required: bool,

    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,

    #[serde(default)]
    pub password_require_uppercase: bool,
    #[serde(default)]
    pub password_require_lowercase: bool,
    #[serde(default)]
    pub password_require_number: bool,
    #[serde(default)]
    pub password_require_special: bool,
    pub password_expiry_days: Option<i32>,

    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: i32,

    #[serde(default = "default_lockout_duration_minutes")]
    pub lockout_duration_minutes: i64,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            access_token_minutes: default_access_token_minutes(),
            refresh_token_days: default_refresh_token_days(),
            id_token_minutes: default_id_token_minutes(),
            remember_me_enabled: false,
            remember_me_refresh_days: default_remember_me_refresh_days(),
            token_rotation_enabled: true,
            require_mfa_for_extended_sessions: false,
            mfa_required: false,
            password_min_length: default_password_min_length(),
            password_require_uppercase: false,
            password_require_lowercase: false,
            password_require_number: false,
            password_require_special: false,
            password_expiry_days: None,
            max_login_attempts: default_max_login_attempts(),
            lockout_duration_minutes: default_lockout_duration_minutes(),
        }
    }
}

fn default_access_token_minutes() -> i64 {
    15
}
fn default_refresh_token_days() -> i64 {
    30
}
fn default_id_token_minutes() -> i64 {
    15
}
fn default_remember_me_refresh_days() -> i64 {
    90
}
fn default_true() -> bool {
    true
}
fn default_password_min_length() -> usize {
    8
}
fn default_max_login_attempts() -> i32 {
    5
}
fn default_lockout_duration_minutes() -> i64 {
    15
}
