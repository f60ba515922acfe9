pub mod audit;
pub mod capability;
pub mod mfa;
pub mod role;
pub mod tenant;
pub mod token;
pub mod user;

pub use audit::{
    events, AuditEventCategory, AuditLog, AuditLogBuilder, AuditLogQuery, AuditStatus,
    CreateAuditLog,
};
pub use capability::{
    SystemCapability, TenantCapability, TenantFeatureEnablement, UserCapabilityState,
    KNOWN_CAPABILITIES, USER_ENROLLABLE_CAPABILITIES,
};
pub use mfa::{MfaSecret, MfaSession, MfaState, RecoveryCode};
pub use role::{
    AssignRole, NewPermission, NewRole, Permission, Role, RolePermission, UpdateRole,
    UserRoleAssignment, ROLE_SYSTEM_AUDITOR, ROLE_SYSTEM_OWNER, ROLE_TENANT_OWNER,
};
pub use tenant::{CreateTenant, Tenant, TenantSettings, TenantStatus, UpdateTenant};
pub use token::{DenyListEntry, ImpersonationSession, RefreshTokenRecord};
pub use user::{
    ChangePassword, NewUser, PrincipalType, UpdateUser, User, UserMetadata, UserProfile,
    UserStatus,
};
