use thiserror::Error;

pub type Result<T> = std::result::Result<T, TenantError>;

#[derive(Debug, Error)]
pub enum TenantError {
    #[error("storage error: {0}")]
    Storage(#[from] iam_storage::DatabaseError),

    #[error("no tenant identifier present in request")]
    Missing,

    #[error("tenant not found")]
    NotFound,

    #[error("tenant is not accepting authentication")]
    Inactive,
}
