//! Driving port for sign-in use-cases.
//!
//! Inbound adapters exchange tokens or recovery credentials for an
//! [`AuthenticatedUser`] and store it in the session.

use async_trait::async_trait;

use crate::domain::{AuthenticatedUser, Error, RecoveryCredentials, SignInToken};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Consume an emailed token, confirming the address on first use.
    async fn redeem_token(&self, token: &SignInToken) -> Result<AuthenticatedUser, Error>;

    /// Admin break-glass login using the configured recovery code.
    async fn recover_admin(
        &self,
        credentials: &RecoveryCredentials,
    ) -> Result<AuthenticatedUser, Error>;
}
