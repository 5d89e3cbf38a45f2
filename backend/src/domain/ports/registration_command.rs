//! Driving port for account registration and sign-in links.

use async_trait::async_trait;

use crate::domain::{DisplayName, Email, Error, Role, RoleKind, UserId};

/// Validated registration form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub email: Email,
    pub display_name: DisplayName,
    pub role: RoleKind,
    pub organisation: Option<String>,
}

/// Account created by a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub user_id: UserId,
    pub role: Role,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistrationCommand: Send + Sync {
    /// Create an unconfirmed account and email a confirmation token.
    async fn register(&self, request: &RegistrationRequest) -> Result<RegistrationOutcome, Error>;

    /// Email a sign-in token (or a fresh confirmation token) if the account
    /// exists. Unknown addresses succeed silently.
    async fn request_sign_in_link(&self, email: &Email) -> Result<(), Error>;
}
