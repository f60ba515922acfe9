use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::contracts::AccountLockoutStore;
use crate::error::Result;

pub struct PgAccountLockoutStore {
    pool: PgPool,
}

impl PgAccountLockoutStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountLockoutStore for PgAccountLockoutStore {
    async fn record_attempt(&self, user_id: Uuid, success: bool, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "INSERT INTO login_attempts (user_id, success, attempted_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(success)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_recent_failures(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM login_attempts
            WHERE user_id = $1 AND success = false AND attempted_at > $2
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    async fn lock_account(&self, user_id: Uuid, until: DateTime<Utc>, reason: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO account_lockouts (user_id, locked_until, reason)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET locked_until = EXCLUDED.locked_until, reason = EXCLUDED.reason
            "#,
        )
        .bind(user_id)
        .bind(until)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unlock_account(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM account_lockouts WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn locked_until(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        let row: Option<(DateTime<Utc>,)> =
            sqlx::query_as("SELECT locked_until FROM account_lockouts WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }

    async fn is_banned(&self, user_id: Uuid) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM user_bans WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }
}
