use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

/// Wire-stable error codes per the authentication kernel's error taxonomy.
/// `code()` is what crosses the service boundary; the `Display` impl is for
/// logs only and may carry more detail than the code does.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed request")]
    InvalidRequest,

    #[error("malformed identifier")]
    InvalidId,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("account is not eligible to authenticate")]
    AccountDisabled,

    #[error("mfa step-up required")]
    MfaRequired { mfa_session_id: uuid::Uuid },

    #[error("mfa session expired")]
    MfaSessionExpired,

    #[error("mfa session not found")]
    MfaSessionNotFound,

    #[error("mfa code did not verify")]
    MfaInvalidCode,

    #[error("token is not valid")]
    InvalidToken,

    #[error("token has expired")]
    ExpiredToken,

    #[error("token has been revoked")]
    TokenRevoked,

    #[error("permission or tenant-isolation check failed")]
    AccessDenied,

    #[error("capability is not available: {0}")]
    CapabilityNotAvailable(String),

    #[error("tenant is not allowed to use capability: {0}")]
    TenantNotAllowed(String),

    #[error("mfa feature is not enabled for this tenant")]
    MfaFeatureNotEnabled,

    #[error("system limit exceeded for capability: {0}")]
    SystemLimitExceeded(String),

    #[error("cannot remove last holder of reserved role: {0}")]
    CannotRemoveLastOwner(String),

    #[error("role assignment forbidden: {0}")]
    RoleAssignmentForbidden(String),

    #[error("storage error: {0}")]
    Storage(#[from] iam_storage::DatabaseError),

    #[error("cache error: {0}")]
    Cache(#[from] iam_cache::CacheError),

    #[error("authorization error: {0}")]
    Authz(#[from] iam_authz::AuthzError),

    #[error("tenant resolution error: {0}")]
    Tenant(#[from] iam_tenant::TenantError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// The stable wire code clients may branch on.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidRequest => "invalid_request",
            AuthError::InvalidId => "invalid_id",
            AuthError::AuthenticationFailed => "authentication_failed",
            AuthError::AccountDisabled => "account_disabled",
            AuthError::MfaRequired { .. } => "mfa_required",
            AuthError::MfaSessionExpired => "mfa_session_expired",
            AuthError::MfaSessionNotFound => "mfa_session_not_found",
            AuthError::MfaInvalidCode => "mfa_invalid_code",
            AuthError::InvalidToken => "invalid_token",
            AuthError::ExpiredToken => "expired_token",
            AuthError::TokenRevoked => "token_revoked",
            AuthError::AccessDenied => "access_denied",
            AuthError::CapabilityNotAvailable(_) => "capability_not_available",
            AuthError::TenantNotAllowed(_) => "tenant_not_allowed",
            AuthError::MfaFeatureNotEnabled => "mfa_feature_not_enabled",
            AuthError::SystemLimitExceeded(_) => "system_limit_exceeded",
            AuthError::CannotRemoveLastOwner(_) => "cannot_remove_last_owner",
            AuthError::RoleAssignmentForbidden(_) => "access_denied",
            AuthError::Authz(inner) => match inner {
                iam_authz::AuthzError::Unsupported(_) => "capability_not_available",
                iam_authz::AuthzError::SystemLimitExceeded(_) => "system_limit_exceeded",
                iam_authz::AuthzError::TenantNotAllowed(_) => "tenant_not_allowed",
                iam_authz::AuthzError::TenantNotEnabled(_) => "mfa_feature_not_enabled",
                iam_authz::AuthzError::UserNotEnrolled(_) => "access_denied",
                iam_authz::AuthzError::PermissionDenied(_) => "access_denied",
                iam_authz::AuthzError::CannotRemoveLastOwner(_) => "cannot_remove_last_owner",
                iam_authz::AuthzError::RoleAssignmentForbidden(_) => "access_denied",
                iam_authz::AuthzError::Storage(_) | iam_authz::AuthzError::Cache(_) | iam_authz::AuthzError::Internal(_) => {
                    "internal_error"
                }
            },
            AuthError::Storage(_) | AuthError::Cache(_) | AuthError::Tenant(_) | AuthError::Internal(_) => "internal_error",
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::Internal(format!("password hash error: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        }
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(_err: validator::ValidationErrors) -> Self {
        AuthError::InvalidRequest
    }
}
