//! Domain primitives, services, and ports.
//!
//! Purpose: Define strongly typed engagement entities and the services that
//! operate on them. Adapters reach the domain only through [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - UserAccount, Role: account identity and the ledger it writes to.
//! - PointsService, EngagementService, RateLimiter: core services.

pub mod account;
pub mod admin;
pub mod auth;
pub mod badges;
pub mod engagement;
pub mod error;
pub mod login;
pub mod points;
pub mod ports;
pub mod rate_limit;
pub mod registration;
pub mod trace_id;

pub use self::account::{
    AccountValidationError, DisplayName, Email, LedgerKind, NewAccount, Role, RoleKind,
    UserAccount, UserId, VolunteerStatus, normalise_organisation,
};
pub use self::admin::{AdminService, account_key};
pub use self::auth::{
    AuthenticatedUser, LoginValidationError, RecoveryCredentials, SignInToken, constant_time_eq,
};
pub use self::engagement::{EngagementService, EngagementSnapshot, LeaderboardEntry, LeaderboardKey};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::login::{AccountLoginService, AdminRecovery};
pub use self::points::PointsService;
pub use self::rate_limit::{RateLimitDecision, RateLimiter};
pub use self::registration::RegistrationService;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use recruit_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
