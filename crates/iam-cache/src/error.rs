use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache key not found")]
    NotFound,

    #[error("cache error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
