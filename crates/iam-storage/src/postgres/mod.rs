pub mod audit;
pub mod capability;
pub mod impersonation;
pub mod lockout;
pub mod mfa;
pub mod refresh_tokens;
pub mod roles;
pub mod tenants;
pub mod users;

pub use audit::PgAuditStore;
pub use capability::PgCapabilityStore;
pub use impersonation::PgImpersonationStore;
pub use lockout::PgAccountLockoutStore;
pub use mfa::PgMfaStore;
pub use refresh_tokens::PgRefreshTokenStore;
pub use roles::PgRoleStore;
pub use tenants::PgTenantStore;
pub use users::PgUserStore;
