use std::sync::Arc;

use uuid::Uuid;

use iam_models::MfaSession;
use iam_storage::MfaStore;

use crate::error::{AuthError, Result};
use crate::mfa::totp;

/// Bridges the password-check step to the subsequent TOTP verification. A
/// session is created once a principal with MFA enabled clears the password
/// check; it is consumed (deleted) on either successful verification or
/// exhaustion/expiry.
pub struct MfaSessionEngine<S: MfaStore> {
    store: Arc<S>,
    session_minutes: i64,
}

impl<S: MfaStore> MfaSessionEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            session_minutes: 5,
        }
    }

    pub async fn create(&self, user_id: Uuid, tenant_id: Option<Uuid>, remember_me: bool) -> Result<MfaSession> {
        let now = chrono::Utc::now();
        let session = MfaSession {
            session_id: Uuid::new_v4(),
            user_id,
            tenant_id,
            remember_me,
            attempts: 0,
            created_at: now,
            expires_at: now + chrono::Duration::minutes(self.session_minutes),
        };
        self.store.create_session(session.clone()).await?;
        Ok(session)
    }

    /// Verifies `code` against the user's confirmed TOTP secret. Exhausted
    /// attempts and plain expiry both surface as `mfa_session_expired` so
    /// the externally-visible error never discloses the remaining-attempts
    /// count.
    pub async fn verify(&self, session_id: Uuid, secret: &str, code: &str) -> Result<MfaSession> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(AuthError::MfaSessionNotFound)?;

        if session.is_expired(chrono::Utc::now()) {
            self.store.delete_session(session_id).await?;
            return Err(AuthError::MfaSessionExpired);
        }

        let ok = totp::verify_totp(secret, code).map_err(|_| AuthError::MfaInvalidCode)?;
        if ok {
            self.store.delete_session(session_id).await?;
            return Ok(session);
        }

        let updated = self
            .store
            .increment_attempt(session_id)
            .await?
            .ok_or(AuthError::MfaSessionNotFound)?;

        if updated.is_expired(chrono::Utc::now()) {
            self.store.delete_session(session_id).await?;
            return Err(AuthError::MfaSessionExpired);
        }

        Err(AuthError::MfaInvalidCode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iam_storage::memory::InMemoryMfaStore;

    #[tokio::test]
    async fn verify_succeeds_with_correct_code() {
        let store = Arc::new(InMemoryMfaStore::new());
        let engine = MfaSessionEngine::new(store);
        let secret = crate::mfa::generate_secret();
        let code = crate::mfa::generate_totp(&secret).unwrap();

        let session = engine.create(Uuid::new_v4(), None, false).await.unwrap();
        let verified = engine.verify(session.session_id, &secret, &code).await.unwrap();
        assert_eq!(verified.session_id, session.session_id);
    }

    #[tokio::test]
    async fn exhausting_attempts_expires_session() {
        let store = Arc::new(InMemoryMfaStore::new());
        let engine = MfaSessionEngine::new(store);
        let secret = crate::mfa::generate_secret();

        let session = engine.create(Uuid::new_v4(), None, false).await.unwrap();
        for _ in 0..(MfaSession::MAX_ATTEMPTS - 1) {
            let result = engine.verify(session.session_id, &secret, "000000").await;
            assert!(matches!(result, Err(AuthError::MfaInvalidCode)));
        }
        let result = engine.verify(session.session_id, &secret, "000000").await;
        assert!(matches!(result, Err(AuthError::MfaSessionExpired)));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let store = Arc::new(InMemoryMfaStore::new());
        let engine = MfaSessionEngine::new(store);
        let result = engine.verify(Uuid::new_v4(), "secret", "123456").await;
        assert!(matches!(result, Err(AuthError::MfaSessionNotFound)));
    }
}
