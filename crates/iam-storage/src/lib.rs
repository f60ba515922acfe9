pub mod connection;
pub mod contracts;
pub mod error;
pub mod memory;
pub mod postgres;

pub use connection::{Database, DatabaseConfig};
pub use contracts::{
    AccountLockoutStore, AuditQueryStore, AuditSink, CapabilityStore, DenyListStore,
    ImpersonationStore, MfaStore, RefreshTokenStore, RoleStore, TenantStore, UserStore,
};
pub use error::{DatabaseError, Result};
