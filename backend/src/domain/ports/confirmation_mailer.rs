//! Driven port for outbound account emails.

use async_trait::async_trait;

use crate::domain::{DisplayName, Email, SignInToken};

use super::{TokenPurpose, define_port_error};

define_port_error! {
    /// Errors raised by mailer adapters.
    pub enum MailerError {
        /// The message could not be handed to the provider.
        Delivery { message: String } => "email delivery failed: {message}",
    }
}

/// Email carrying a confirmation or sign-in token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEmail {
    pub to: Email,
    pub display_name: DisplayName,
    pub purpose: TokenPurpose,
    pub token: SignInToken,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfirmationMailer: Send + Sync {
    /// Deliver a token email.
    async fn send(&self, email: &TokenEmail) -> Result<(), MailerError>;
}
