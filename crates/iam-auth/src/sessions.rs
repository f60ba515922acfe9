use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use iam_models::{events, AuditEventCategory, AuditLogBuilder, AuditStatus};
use iam_storage::{AuditSink, RefreshTokenStore};

use crate::error::{AuthError, Result};

const MIN_REASON_LEN: usize = 10;

/// A "session" is modeled as a non-revoked refresh-token record; there is
/// no separate session table. Connection metadata (IP, user-agent, device
/// label) is surfaced only when the store has it — the in-memory and
/// Postgres refresh-token records in this build don't carry it, so those
/// fields are always `None` today.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub client_id: Option<String>,
    pub mfa_verified: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

pub struct SessionService<RT: RefreshTokenStore, A: AuditSink> {
    refresh_store: Arc<RT>,
    audit: Arc<A>,
}

impl<RT: RefreshTokenStore, A: AuditSink> SessionService<RT, A> {
    pub fn new(refresh_store: Arc<RT>, audit: Arc<A>) -> Self {
        Self { refresh_store, audit }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<SessionSummary>> {
        let records = self.refresh_store.list_active_for_user(user_id).await?;
        Ok(records
            .into_iter()
            .map(|record| SessionSummary {
                session_id: record.hash,
                client_id: record.client_id,
                mfa_verified: record.mfa_verified,
                created_at: record.created_at,
                expires_at: record.expires_at,
                ip_address: None,
                user_agent: None,
            })
            .collect())
    }

    /// `reason` must be a human-readable justification of at least 10
    /// characters — it lands in the audit trail verbatim.
    pub async fn revoke(&self, tenant_id: Option<Uuid>, actor_id: Uuid, session_id: &str, reason: &str) -> Result<()> {
        if reason.trim().chars().count() < MIN_REASON_LEN {
            return Err(AuthError::InvalidRequest);
        }

        let revoked = self.refresh_store.revoke(session_id).await?;
        if !revoked {
            return Err(AuthError::InvalidToken);
        }

        let builder = AuditLogBuilder::new(tenant_id, events::SESSION_REVOKED, AuditEventCategory::Authentication)
            .status(AuditStatus::Success)
            .actor("user", actor_id.to_string())
            .description(reason);
        if let Err(err) = self.audit.record(builder.build()).await {
            tracing::error!(%err, "failed to record session-revocation audit event");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iam_storage::memory::{InMemoryAuditSink, InMemoryRefreshTokenStore};
    use iam_models::RefreshTokenRecord;

    #[tokio::test]
    async fn lists_only_active_sessions_for_the_user() {
        let refresh_store = Arc::new(InMemoryRefreshTokenStore::new());
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        refresh_store
            .insert(RefreshTokenRecord {
                hash: "hash-1".to_string(),
                user_id,
                tenant_id: None,
                client_id: Some("web".to_string()),
                mfa_verified: true,
                parent_hash: None,
                created_at: now,
                expires_at: now + chrono::Duration::days(30),
                revoked_at: None,
            })
            .await
            .unwrap();
        refresh_store
            .insert(RefreshTokenRecord {
                hash: "hash-2".to_string(),
                user_id,
                tenant_id: None,
                client_id: None,
                mfa_verified: false,
                parent_hash: None,
                created_at: now,
                expires_at: now - chrono::Duration::days(1),
                revoked_at: None,
            })
            .await
            .unwrap();

        let service = SessionService::new(refresh_store, Arc::new(InMemoryAuditSink::new()));
        let sessions = service.list(user_id).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, "hash-1");
    }

    #[tokio::test]
    async fn revoke_rejects_short_reasons() {
        let refresh_store = Arc::new(InMemoryRefreshTokenStore::new());
        let service = SessionService::new(refresh_store, Arc::new(InMemoryAuditSink::new()));
        let result = service.revoke(None, Uuid::new_v4(), "hash-1", "too short").await;
        assert!(matches!(result, Err(AuthError::InvalidRequest)));
    }

    #[tokio::test]
    async fn revoke_unknown_session_fails() {
        let refresh_store = Arc::new(InMemoryRefreshTokenStore::new());
        let service = SessionService::new(refresh_store, Arc::new(InMemoryAuditSink::new()));
        let result = service.revoke(None, Uuid::new_v4(), "no-such-hash", "user requested logout").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }
}
