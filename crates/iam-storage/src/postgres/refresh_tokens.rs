use async_trait::async_trait;
use iam_models::RefreshTokenRecord;
use sqlx::PgPool;
use uuid::Uuid;

use crate::contracts::RefreshTokenStore;
use crate::error::Result;

pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens
                (hash, user_id, tenant_id, client_id, mfa_verified, parent_hash, created_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&record.hash)
        .bind(record.user_id)
        .bind(record.tenant_id)
        .bind(&record.client_id)
        .bind(record.mfa_verified)
        .bind(&record.parent_hash)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.revoked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<RefreshTokenRecord>> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT * FROM refresh_tokens WHERE hash = $1",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn revoke(&self, hash: &str) -> Result<bool> {
        // `WHERE revoked_at IS NULL` makes this compare-and-revoke: only the
        // first caller to race here observes a row affected.
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE hash = $1 AND revoked_at IS NULL",
        )
        .bind(hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_chain_from(&self, hash: &str) -> Result<()> {
        sqlx::query(
            r#"
            WITH RECURSIVE chain AS (
                SELECT hash FROM refresh_tokens WHERE hash = $1
                UNION ALL
                SELECT rt.hash FROM refresh_tokens rt
                INNER JOIN chain c ON rt.parent_hash = c.hash
            )
            UPDATE refresh_tokens SET revoked_at = NOW()
            WHERE hash IN (SELECT hash FROM chain) AND revoked_at IS NULL
            "#,
        )
        .bind(hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_active_for_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>> {
        let records = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT * FROM refresh_tokens
            WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > NOW()
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn find_child_of(&self, parent_hash: &str) -> Result<Option<RefreshTokenRecord>> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT * FROM refresh_tokens WHERE parent_hash = $1",
        )
        .bind(parent_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
