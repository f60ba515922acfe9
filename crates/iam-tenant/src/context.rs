use iam_models::Tenant;
use uuid::Uuid;

/// The resolved tenant for a single request, carried through the call chain
/// instead of being re-resolved by each downstream service.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub tenant: Tenant,
}

impl TenantContext {
    pub fn new(tenant: Tenant) -> Self {
        Self {
            tenant_id: tenant.id,
            tenant,
        }
    }
}
