use async_trait::async_trait;
use iam_models::{SystemCapability, TenantCapability, TenantFeatureEnablement, UserCapabilityState};
use sqlx::PgPool;
use uuid::Uuid;

use crate::contracts::CapabilityStore;
use crate::error::Result;

pub struct PgCapabilityStore {
    pool: PgPool,
}

impl PgCapabilityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CapabilityStore for PgCapabilityStore {
    async fn get_system_capability(&self, key: &str) -> Result<Option<SystemCapability>> {
        let row = sqlx::query_as::<_, SystemCapability>(
            "SELECT * FROM system_capabilities WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_tenant_capability(
        &self,
        tenant_id: Uuid,
        key: &str,
    ) -> Result<Option<TenantCapability>> {
        let row = sqlx::query_as::<_, TenantCapability>(
            "SELECT * FROM tenant_capabilities WHERE tenant_id = $1 AND key = $2",
        )
        .bind(tenant_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn put_tenant_capability(&self, capability: TenantCapability) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tenant_capabilities (tenant_id, key, enabled, value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, key) DO UPDATE
            SET enabled = EXCLUDED.enabled, value = EXCLUDED.value
            "#,
        )
        .bind(capability.tenant_id)
        .bind(&capability.key)
        .bind(capability.enabled)
        .bind(&capability.value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_tenant_feature(
        &self,
        tenant_id: Uuid,
        key: &str,
    ) -> Result<Option<TenantFeatureEnablement>> {
        let row = sqlx::query_as::<_, TenantFeatureEnablement>(
            "SELECT * FROM tenant_features WHERE tenant_id = $1 AND key = $2",
        )
        .bind(tenant_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn put_tenant_feature(&self, feature: TenantFeatureEnablement) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tenant_features (tenant_id, key, enabled, configuration)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, key) DO UPDATE
            SET enabled = EXCLUDED.enabled, configuration = EXCLUDED.configuration
            "#,
        )
        .bind(feature.tenant_id)
        .bind(&feature.key)
        .bind(feature.enabled)
        .bind(&feature.configuration)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user_capability_state(
        &self,
        user_id: Uuid,
        key: &str,
    ) -> Result<Option<UserCapabilityState>> {
        let row = sqlx::query_as::<_, UserCapabilityState>(
            "SELECT * FROM user_capability_state WHERE user_id = $1 AND key = $2",
        )
        .bind(user_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn put_user_capability_state(&self, state: UserCapabilityState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_capability_state (user_id, key, enrolled, state_data, enrolled_at, last_used_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, key) DO UPDATE
            SET enrolled = EXCLUDED.enrolled,
                state_data = EXCLUDED.state_data,
                enrolled_at = EXCLUDED.enrolled_at,
                last_used_at = EXCLUDED.last_used_at
            "#,
        )
        .bind(state.user_id)
        .bind(&state.key)
        .bind(state.enrolled)
        .bind(&state.state_data)
        .bind(state.enrolled_at)
        .bind(state.last_used_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
