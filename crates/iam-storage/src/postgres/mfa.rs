use async_trait::async_trait;
use iam_models::{MfaSecret, MfaSession, RecoveryCode};
use sqlx::PgPool;
use uuid::Uuid;

use crate::contracts::MfaStore;
use crate::error::Result;

pub struct PgMfaStore {
    pool: PgPool,
}

impl PgMfaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MfaStore for PgMfaStore {
    async fn get_secret(&self, user_id: Uuid) -> Result<Option<MfaSecret>> {
        let row = sqlx::query_as::<_, MfaSecret>("SELECT * FROM mfa_secrets WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn put_secret(&self, secret: MfaSecret) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO mfa_secrets (user_id, secret, state, created_at, confirmed_at, last_used_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE
            SET secret = EXCLUDED.secret,
                state = EXCLUDED.state,
                confirmed_at = EXCLUDED.confirmed_at,
                last_used_at = EXCLUDED.last_used_at
            "#,
        )
        .bind(secret.user_id)
        .bind(&secret.secret)
        .bind(secret.state)
        .bind(secret.created_at)
        .bind(secret.confirmed_at)
        .bind(secret.last_used_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_secret(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM mfa_secrets WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn put_recovery_codes(&self, codes: Vec<RecoveryCode>) -> Result<()> {
        for code in codes {
            sqlx::query(
                "INSERT INTO recovery_codes (id, user_id, code_hash, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(code.id)
            .bind(code.user_id)
            .bind(&code.code_hash)
            .bind(code.created_at)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn find_recovery_code(
        &self,
        user_id: Uuid,
        code_hash_candidates: &[String],
    ) -> Result<Option<RecoveryCode>> {
        let row = sqlx::query_as::<_, RecoveryCode>(
            "SELECT * FROM recovery_codes WHERE user_id = $1 AND code_hash = ANY($2)",
        )
        .bind(user_id)
        .bind(code_hash_candidates)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_recovery_code(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM recovery_codes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_recovery_codes(&self, user_id: Uuid) -> Result<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM recovery_codes WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0)
    }

    async fn create_session(&self, session: MfaSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO mfa_sessions (session_id, user_id, tenant_id, remember_me, attempts, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.session_id)
        .bind(session.user_id)
        .bind(session.tenant_id)
        .bind(session.remember_me)
        .bind(session.attempts)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> Result<Option<MfaSession>> {
        let row = sqlx::query_as::<_, MfaSession>(
            "SELECT * FROM mfa_sessions WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn increment_attempt(&self, session_id: Uuid) -> Result<Option<MfaSession>> {
        let row = sqlx::query_as::<_, MfaSession>(
            r#"
            UPDATE mfa_sessions SET attempts = attempts + 1
            WHERE session_id = $1
            RETURNING *
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM mfa_sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
