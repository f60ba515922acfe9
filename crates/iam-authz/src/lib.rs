pub mod capability;
pub mod error;
pub mod permission;
pub mod reserved_role;
pub mod role_admin;

pub use capability::{CapabilityDecision, CapabilityResolver, DenyReason};
pub use error::{AuthzError, Result};
pub use permission::PermissionChecker;
pub use reserved_role::ReservedRoleGuard;
pub use role_admin::RoleAdminService;
