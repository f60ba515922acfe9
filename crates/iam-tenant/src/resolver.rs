use std::sync::Arc;

use uuid::Uuid;

use iam_storage::TenantStore;

use crate::context::TenantContext;
use crate::error::{Result, TenantError};

/// A single request's tenant identifier candidates, one slot per source.
/// Resolution picks the highest-precedence `Some` slot: request body, then
/// an explicit header, then a query parameter, then whatever a routing
/// middleware (e.g. subdomain-based) already attached.
#[derive(Debug, Clone, Default)]
pub struct TenantCandidates {
    pub body: Option<String>,
    pub header: Option<String>,
    pub query: Option<String>,
    pub middleware: Option<String>,
}

impl TenantCandidates {
    fn winning(&self) -> Option<&str> {
        self.body
            .as_deref()
            .or(self.header.as_deref())
            .or(self.query.as_deref())
            .or(self.middleware.as_deref())
    }
}

pub struct TenantResolver<S: TenantStore> {
    store: Arc<S>,
}

impl<S: TenantStore> TenantResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Resolves a tenant from the fixed precedence order, then verifies it
    /// is still accepting authentication.
    pub async fn resolve(&self, candidates: &TenantCandidates) -> Result<TenantContext> {
        let identifier = candidates.winning().ok_or(TenantError::Missing)?;

        let tenant = if let Ok(id) = Uuid::parse_str(identifier) {
            self.store.find_by_id(id).await?
        } else {
            self.store.find_by_domain(identifier).await?
        };
        let tenant = tenant.ok_or(TenantError::NotFound)?;

        if !tenant.status.accepts_authentication() {
            return Err(TenantError::Inactive);
        }

        Ok(TenantContext::new(tenant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iam_storage::memory::InMemoryTenantStore;
    use iam_models::{Tenant, TenantSettings, TenantStatus};
    use std::collections::HashMap;

    async fn seeded_store() -> (Arc<InMemoryTenantStore>, Tenant) {
        let store = Arc::new(InMemoryTenantStore::new());
        let now = chrono::Utc::now();
        let tenant = Tenant {
            id: Uuid::new_v4(),
            domain: "acme".to_string(),
            name: "Acme".to_string(),
            status: TenantStatus::Active,
            settings: TenantSettings::default(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        };
        store.insert(tenant.clone()).await;
        (store, tenant)
    }

    #[tokio::test]
    async fn body_wins_over_every_other_source() {
        let (store, tenant) = seeded_store().await;
        let resolver = TenantResolver::new(store);
        let candidates = TenantCandidates {
            body: Some(tenant.id.to_string()),
            header: Some("other-header".to_string()),
            query: Some("other-query".to_string()),
            middleware: Some("other-mw".to_string()),
        };
        let resolved = resolver.resolve(&candidates).await.unwrap();
        assert_eq!(resolved.tenant_id, tenant.id);
    }

    #[tokio::test]
    async fn falls_back_through_precedence_chain() {
        let (store, tenant) = seeded_store().await;
        let resolver = TenantResolver::new(store);
        let candidates = TenantCandidates {
            body: None,
            header: None,
            query: Some(tenant.domain.clone()),
            middleware: Some("fallback-only".to_string()),
        };
        let resolved = resolver.resolve(&candidates).await.unwrap();
        assert_eq!(resolved.tenant_id, tenant.id);
    }

    #[tokio::test]
    async fn missing_candidates_error() {
        let (store, _tenant) = seeded_store().await;
        let resolver = TenantResolver::new(store);
        let result = resolver.resolve(&TenantCandidates::default()).await;
        assert!(matches!(result, Err(TenantError::Missing)));
    }

    #[tokio::test]
    async fn suspended_tenant_is_rejected() {
        let (store, tenant) = seeded_store().await;
        store.set_status(tenant.id, TenantStatus::Suspended).await;
        let resolver = TenantResolver::new(store);
        let candidates = TenantCandidates {
            middleware: Some(tenant.id.to_string()),
            ..Default::default()
        };
        let result = resolver.resolve(&candidates).await;
        assert!(matches!(result, Err(TenantError::Inactive)));
    }
}
