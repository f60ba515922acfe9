pub mod error;
pub mod redis_cache;

pub use error::{CacheError, Result};
pub use redis_cache::{
    deny_list_key, mfa_session_key, refresh_lock_key, tenant_capability_key, Cache, CacheConfig,
};
