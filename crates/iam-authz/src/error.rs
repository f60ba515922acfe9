use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthzError>;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("storage error: {0}")]
    Storage(#[from] iam_storage::DatabaseError),

    #[error("cache error: {0}")]
    Cache(#[from] iam_cache::CacheError),

    #[error("unsupported capability: {0}")]
    Unsupported(String),

    #[error("system limit exceeded for capability: {0}")]
    SystemLimitExceeded(String),

    #[error("tenant not allowed to use capability: {0}")]
    TenantNotAllowed(String),

    #[error("tenant has not enabled capability: {0}")]
    TenantNotEnabled(String),

    #[error("user has not enrolled in capability: {0}")]
    UserNotEnrolled(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("cannot remove last holder of role: {0}")]
    CannotRemoveLastOwner(String),

    #[error("role assignment forbidden: {0}")]
    RoleAssignmentForbidden(String),

    #[error("role not found: {0}")]
    RoleNotFound(uuid::Uuid),

    #[error("internal error: {0}")]
    Internal(String),
}
