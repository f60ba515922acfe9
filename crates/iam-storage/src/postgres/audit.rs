use async_trait::async_trait;
use iam_models::{AuditLog, CreateAuditLog};
use sqlx::PgPool;

use crate::contracts::AuditQueryStore;
use crate::error::Result;

pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditQueryStore for PgAuditStore {
    async fn insert(&self, event: CreateAuditLog) -> Result<AuditLog> {
        let status_str = event.status.to_string();
        let actor_ip = event.actor_ip_address.map(|ip| ip.to_string());

        let log = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (
                tenant_id, event_type, event_category, event_action,
                actor_type, actor_id, actor_name, actor_ip_address, actor_user_agent,
                target_type, target_id, target_name,
                description, metadata, status, error_message,
                request_id, session_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *
            "#,
        )
        .bind(event.tenant_id)
        .bind(&event.event_type)
        .bind(&event.event_category)
        .bind(&event.event_action)
        .bind(&event.actor_type)
        .bind(&event.actor_id)
        .bind(&event.actor_name)
        .bind(actor_ip)
        .bind(&event.actor_user_agent)
        .bind(&event.target_type)
        .bind(&event.target_id)
        .bind(&event.target_name)
        .bind(&event.description)
        .bind(&event.metadata)
        .bind(status_str)
        .bind(&event.error_message)
        .bind(&event.request_id)
        .bind(event.session_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(log)
    }
}
