use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum MfaState {
    Unenrolled,
    PendingEnrollment,
    Enrolled,
    Disabled,
}

/// A user's TOTP secret and its enrollment lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MfaSecret {
    pub user_id: Uuid,
    pub secret: String,
    pub state: MfaState,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// A single-use hashed recovery code. Deleted from the store on redemption.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecoveryCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Ephemeral pending-MFA state created after a successful password check,
/// consumed by a subsequent TOTP or recovery-code verification.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MfaSession {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub remember_me: bool,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl MfaSession {
    pub const MAX_ATTEMPTS: i32 = 5;

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at || self.attempts >= Self::MAX_ATTEMPTS
    }
}
