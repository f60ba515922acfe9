use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A rotation-chain record for an issued opaque refresh token. Only the keyed
/// hash is ever persisted; the plaintext is returned to the client once.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshTokenRecord {
    pub hash: String,
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub client_id: Option<String>,
    pub mfa_verified: bool,
    pub parent_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }
}

/// A deny-listed access token. Presence invalidates the token regardless of
/// signature validity until its original expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenyListEntry {
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

/// An active admin-as-user session. Tokens minted while it is active carry
/// `sub=target_user_id` and `act.sub=impersonator_id`; ending the session
/// revokes it but leaves already-issued tokens to expire on their own
/// schedule (they're also individually revocable via the deny-list).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImpersonationSession {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub impersonator_id: Uuid,
    pub target_user_id: Uuid,
    pub reason: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Hash of the refresh token minted for the impersonated session, if
    /// any — `end()` revokes it so the admin-as-user session can't outlive
    /// its own termination via a still-valid refresh token.
    pub refresh_hash: Option<String>,
}

impl ImpersonationSession {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}
