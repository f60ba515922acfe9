pub mod account_lockout;
pub mod claims;
pub mod error;
pub mod impersonation;
pub mod introspection;
pub mod issuance;
pub mod lifetime;
pub mod login;
pub mod mfa;
pub mod password;
pub mod refresh;
pub mod sessions;
pub mod token;

pub use account_lockout::AccountLockoutGuard;
pub use claims::{ActorClaim, Claims, ClaimsBuilder, ClaimsInput};
pub use error::{AuthError, Result};
pub use impersonation::{ImpersonationService, PERMISSION_IMPERSONATE};
pub use introspection::{IntrospectionResponse, IntrospectionService};
pub use issuance::TokenIssuer;
pub use lifetime::{GlobalDefaults, LifetimeResolver, ResolvedLifetimes};
pub use login::{LoginOutcome, LoginRequest, LoginService, MfaChallengeRequest, TokenBundle};
pub use password::{KdfParams, PasswordHasher};
pub use refresh::RefreshService;
pub use sessions::{SessionService, SessionSummary};
pub use token::{IssuedRefreshToken, KeySet, SigningKey, TokenService, TokenServiceConfig};
