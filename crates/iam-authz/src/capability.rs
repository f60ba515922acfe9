use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use iam_models::USER_ENROLLABLE_CAPABILITIES;
use iam_storage::CapabilityStore;

use crate::error::{AuthzError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    Unsupported,
    SystemLimitExceeded,
    TenantNotAllowed,
    TenantNotEnabled,
    UserNotEnrolled,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::Unsupported => "unsupported",
            DenyReason::SystemLimitExceeded => "system_limit_exceeded",
            DenyReason::TenantNotAllowed => "tenant_not_allowed",
            DenyReason::TenantNotEnabled => "tenant_not_enabled",
            DenyReason::UserNotEnrolled => "user_not_enrolled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDecision {
    pub can_use: bool,
    pub reason: Option<&'static str>,
    pub enrolled: Option<bool>,
}

impl CapabilityDecision {
    fn allow(enrolled: Option<bool>) -> Self {
        Self {
            can_use: true,
            reason: None,
            enrolled,
        }
    }

    fn deny(reason: DenyReason) -> Self {
        Self {
            can_use: false,
            reason: Some(reason.as_str()),
            enrolled: None,
        }
    }
}

#[derive(Clone, PartialEq, Eq, std::hash::Hash)]
struct TenantFeatureKey {
    tenant_id: Uuid,
    key: String,
}

/// Evaluates the three-layer capability inheritance (system -> tenant-allowed
/// -> tenant-enabled -> user-enrolled). `is_tenant_feature_enabled` is the
/// dominant hot path and is served from a short-TTL cache so a capability
/// toggle becomes visible within the staleness budget without hitting the
/// store on every authorization decision.
pub struct CapabilityResolver<S: CapabilityStore> {
    store: Arc<S>,
    tenant_feature_cache: Cache<TenantFeatureKey, bool>,
}

impl<S: CapabilityStore> CapabilityResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            tenant_feature_cache: Cache::builder()
                .time_to_live(Duration::from_secs(1))
                .max_capacity(10_000)
                .build(),
        }
    }

    pub async fn evaluate(&self, tenant_id: Uuid, user_id: Uuid, key: &str) -> Result<CapabilityDecision> {
        let system = self.store.get_system_capability(key).await?;
        let Some(system) = system.filter(|c| c.enabled) else {
            return Ok(CapabilityDecision::deny(DenyReason::Unsupported));
        };

        let tenant_capability = self.store.get_tenant_capability(tenant_id, key).await?;
        let tenant_value = tenant_capability.as_ref().and_then(|c| c.value.clone());
        if !within_system_bound(&system.default_value, &tenant_value) {
            return Ok(CapabilityDecision::deny(DenyReason::SystemLimitExceeded));
        }

        if !tenant_capability.is_some_and(|c| c.enabled) {
            return Ok(CapabilityDecision::deny(DenyReason::TenantNotAllowed));
        }

        if !self.is_tenant_feature_enabled(tenant_id, key).await? {
            return Ok(CapabilityDecision::deny(DenyReason::TenantNotEnabled));
        }

        if USER_ENROLLABLE_CAPABILITIES.contains(&key) {
            let enrolled = self
                .store
                .get_user_capability_state(user_id, key)
                .await?
                .map(|s| s.enrolled)
                .unwrap_or(false);
            if !enrolled {
                return Ok(CapabilityDecision::deny(DenyReason::UserNotEnrolled));
            }
            return Ok(CapabilityDecision::allow(Some(true)));
        }

        Ok(CapabilityDecision::allow(None))
    }

    pub async fn is_tenant_feature_enabled(&self, tenant_id: Uuid, key: &str) -> Result<bool> {
        let cache_key = TenantFeatureKey {
            tenant_id,
            key: key.to_string(),
        };
        if let Some(enabled) = self.tenant_feature_cache.get(&cache_key).await {
            return Ok(enabled);
        }
        let enabled = self
            .store
            .get_tenant_feature(tenant_id, key)
            .await?
            .map(|f| f.enabled)
            .unwrap_or(false);
        self.tenant_feature_cache.insert(cache_key, enabled).await;
        Ok(enabled)
    }

    /// Invalidates the cached feature-enablement bit. Called after any write
    /// to a tenant's feature-enablement row so the ≤1s staleness budget does
    /// not start over from a full TTL on every unrelated read.
    pub async fn invalidate_feature(&self, tenant_id: Uuid, key: &str) {
        self.tenant_feature_cache
            .invalidate(&TenantFeatureKey {
                tenant_id,
                key: key.to_string(),
            })
            .await;
    }

    pub async fn assign_tenant_capability(
        &self,
        tenant_id: Uuid,
        key: &str,
        enabled: bool,
        value: Option<serde_json::Value>,
    ) -> Result<()> {
        let system = self
            .store
            .get_system_capability(key)
            .await?
            .ok_or_else(|| AuthzError::Unsupported(key.to_string()))?;

        if enabled && !system.enabled {
            return Err(AuthzError::Unsupported(key.to_string()));
        }
        if enabled && !within_system_bound(&system.default_value, &value) {
            return Err(AuthzError::SystemLimitExceeded(key.to_string()));
        }

        self.store
            .put_tenant_capability(iam_models::TenantCapability {
                tenant_id,
                key: key.to_string(),
                enabled,
                value,
            })
            .await?;
        Ok(())
    }
}

/// Numeric system bounds are a ceiling; array bounds are a subset
/// requirement. Anything else (missing system bound, non-comparable types)
/// is treated as unconstrained.
fn within_system_bound(system_value: &Option<serde_json::Value>, tenant_value: &Option<serde_json::Value>) -> bool {
    let Some(system_value) = system_value else {
        return true;
    };
    let Some(tenant_value) = tenant_value else {
        return true;
    };

    match (system_value, tenant_value) {
        (serde_json::Value::Number(sys), serde_json::Value::Number(ten)) => {
            match (sys.as_f64(), ten.as_f64()) {
                (Some(sys), Some(ten)) => ten <= sys,
                _ => true,
            }
        }
        (serde_json::Value::Array(sys), serde_json::Value::Array(ten)) => {
            ten.iter().all(|v| sys.contains(v))
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iam_models::SystemCapability;
    use iam_storage::memory::InMemoryCapabilityStore;

    #[tokio::test]
    async fn system_bound_is_checked_before_tenant_allowed() {
        let store = Arc::new(InMemoryCapabilityStore::new());
        store
            .set_system(SystemCapability {
                key: "seats".to_string(),
                enabled: true,
                default_value: Some(serde_json::json!(5)),
                description: None,
            })
            .await;
        let tenant_id = Uuid::new_v4();
        // Disabled at the tenant level *and* over the system bound — the
        // bound violation must be what's reported.
        store
            .put_tenant_capability(iam_models::TenantCapability {
                tenant_id,
                key: "seats".to_string(),
                enabled: false,
                value: Some(serde_json::json!(10)),
            })
            .await
            .unwrap();

        let resolver = CapabilityResolver::new(store);
        let decision = resolver.evaluate(tenant_id, Uuid::new_v4(), "seats").await.unwrap();
        assert!(!decision.can_use);
        assert_eq!(decision.reason, Some(DenyReason::SystemLimitExceeded.as_str()));
    }
}
