use async_trait::async_trait;
use chrono::{DateTime, Utc};
use iam_models::ImpersonationSession;
use sqlx::PgPool;
use uuid::Uuid;

use crate::contracts::ImpersonationStore;
use crate::error::Result;

pub struct PgImpersonationStore {
    pool: PgPool,
}

impl PgImpersonationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImpersonationStore for PgImpersonationStore {
    async fn create(&self, session: ImpersonationSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO impersonation_sessions
                (id, tenant_id, impersonator_id, target_user_id, reason, started_at, ended_at, refresh_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(session.id)
        .bind(session.tenant_id)
        .bind(session.impersonator_id)
        .bind(session.target_user_id)
        .bind(&session.reason)
        .bind(session.started_at)
        .bind(session.ended_at)
        .bind(&session.refresh_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_active(&self, id: Uuid) -> Result<Option<ImpersonationSession>> {
        let session = sqlx::query_as::<_, ImpersonationSession>(
            "SELECT * FROM impersonation_sessions WHERE id = $1 AND ended_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn end(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE impersonation_sessions SET ended_at = $2 WHERE id = $1 AND ended_at IS NULL")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
