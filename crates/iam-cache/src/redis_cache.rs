use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CacheError, Result};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub url: String,
    pub pool_size: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 10,
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL").unwrap_or_else(|_| Self::default().url),
            pool_size: std::env::var("REDIS_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        }
    }
}

/// Thin async wrapper over a Redis connection manager, used for the
/// deny-list and session-revocation caches that must survive process
/// restarts and be shared across replicas.
#[derive(Clone)]
pub struct Cache {
    manager: ConnectionManager,
}

impl Cache {
    pub async fn new(config: &CacheConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: Option<u64>) -> Result<()> {
        let mut conn = self.manager.clone();
        let payload = serde_json::to_string(value)?;
        match ttl_seconds {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, payload, ttl).await?,
            None => conn.set::<_, _, ()>(key, payload).await?,
        }
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.manager.clone();
        Ok(conn.exists(key).await?)
    }

    pub async fn expire(&self, key: &str, ttl_seconds: i64) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.expire::<_, ()>(key, ttl_seconds).await?;
        Ok(())
    }

    pub async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.manager.clone();
        Ok(conn.incr(key, 1).await?)
    }

    pub async fn incr_with_ttl(&self, key: &str, ttl_seconds: i64) -> Result<i64> {
        let mut conn = self.manager.clone();
        let count: i64 = conn.incr(key, 1).await?;
        if count == 1 {
            conn.expire::<_, ()>(key, ttl_seconds).await?;
        }
        Ok(count)
    }
}

/// Backs the access-token deny-list with Redis instead of Postgres so a
/// revocation is visible to every replica within the connection manager's
/// round-trip, not just the instance that issued it.
#[async_trait]
impl iam_storage::DenyListStore for Cache {
    async fn insert(&self, jti: &str, expires_at: DateTime<Utc>) -> iam_storage::Result<()> {
        let ttl = (expires_at - Utc::now()).num_seconds().max(1) as u64;
        self.set(&deny_list_key(jti), &expires_at, Some(ttl))
            .await
            .map_err(|e| iam_storage::DatabaseError::Other(e.to_string()))
    }

    async fn contains(&self, jti: &str) -> iam_storage::Result<bool> {
        self.exists(&deny_list_key(jti)).await.map_err(|e| iam_storage::DatabaseError::Other(e.to_string()))
    }
}

pub fn deny_list_key(jti: &str) -> String {
    format!("denylist:{jti}")
}

pub fn refresh_lock_key(hash: &str) -> String {
    format!("refresh:lock:{hash}")
}

pub fn tenant_capability_key(tenant_id: &str) -> String {
    format!("tenant:{tenant_id}:capabilities")
}

pub fn mfa_session_key(session_id: &str) -> String {
    format!("mfa:session:{session_id}")
}
