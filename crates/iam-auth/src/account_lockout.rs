use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use iam_storage::AccountLockoutStore;

use crate::error::{AuthError, Result};

/// Tracks failed-login attempts per user and locks the account once the
/// tenant's threshold is exceeded. A separate ban list (by user id) is
/// consulted ahead of any password check.
pub struct AccountLockoutGuard<S: AccountLockoutStore> {
    store: Arc<S>,
}

impl<S: AccountLockoutStore> AccountLockoutGuard<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn is_banned(&self, user_id: Uuid) -> Result<bool> {
        Ok(self.store.is_banned(user_id).await?)
    }

    pub async fn is_locked(&self, user_id: Uuid) -> Result<Option<chrono::DateTime<Utc>>> {
        Ok(self.store.locked_until(user_id).await?)
    }

    pub async fn record_success(&self, user_id: Uuid) -> Result<()> {
        self.store.record_attempt(user_id, true, Utc::now()).await?;
        Ok(())
    }

    /// Records a failed attempt and, once the tenant's `max_login_attempts`
    /// is reached within the last `lockout_window_minutes`, locks the
    /// account for `lockout_duration_minutes` and returns the lock error.
    pub async fn record_failure(
        &self,
        user_id: Uuid,
        max_attempts: i32,
        lockout_window_minutes: i64,
        lockout_duration_minutes: i64,
    ) -> Result<()> {
        let now = Utc::now();
        self.store.record_attempt(user_id, false, now).await?;

        let since = now - Duration::minutes(lockout_window_minutes);
        let failures = self.store.count_recent_failures(user_id, since).await?;

        if failures >= max_attempts as i64 {
            let locked_until = now + Duration::minutes(lockout_duration_minutes);
            self.store
                .lock_account(
                    user_id,
                    locked_until,
                    &format!("automatic lockout after {failures} failed attempts"),
                )
                .await?;
            tracing::warn!(%user_id, %locked_until, failures, "account locked after repeated failed logins");
            return Err(AuthError::AccountDisabled);
        }

        Ok(())
    }

    pub async fn unlock(&self, user_id: Uuid) -> Result<()> {
        self.store.unlock_account(user_id).await?;
        tracing::info!(%user_id, "account unlocked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iam_storage::memory::InMemoryAccountLockoutStore;

    #[tokio::test]
    async fn locks_after_threshold() {
        let store = Arc::new(InMemoryAccountLockoutStore::new());
        let guard = AccountLockoutGuard::new(store);
        let user_id = Uuid::new_v4();

        for _ in 0..4 {
            guard.record_failure(user_id, 5, 15, 15).await.unwrap();
        }
        let result = guard.record_failure(user_id, 5, 15, 15).await;
        assert!(matches!(result, Err(AuthError::AccountDisabled)));
        assert!(guard.is_locked(user_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unlock_clears_lock() {
        let store = Arc::new(InMemoryAccountLockoutStore::new());
        let guard = AccountLockoutGuard::new(store);
        let user_id = Uuid::new_v4();
        for _ in 0..5 {
            let _ = guard.record_failure(user_id, 5, 15, 15).await;
        }
        assert!(guard.is_locked(user_id).await.unwrap().is_some());
        guard.unlock(user_id).await.unwrap();
        assert!(guard.is_locked(user_id).await.unwrap().is_none());
    }
}
