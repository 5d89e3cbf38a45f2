//! Driven port for single-use email tokens.
//!
//! Only SHA-256 digests are stored; the raw token exists in the email alone.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Error, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by token store adapters.
    pub enum EmailTokenRepositoryError {
        /// Store connection could not be established.
        Connection { message: String } => "email token store connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } => "email token store query failed: {message}",
    }
}

/// Why a token was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    /// Confirms the address given at registration.
    Confirmation,
    /// Passwordless sign-in for a confirmed account.
    SignIn,
}

impl TokenPurpose {
    /// Storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmation => "confirmation",
            Self::SignIn => "sign_in",
        }
    }

    /// How long a token of this purpose stays redeemable.
    pub fn ttl(self) -> Duration {
        match self {
            Self::Confirmation => Duration::hours(24),
            Self::SignIn => Duration::minutes(15),
        }
    }

    /// Parse the storage representation.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "confirmation" => Some(Self::Confirmation),
            "sign_in" => Some(Self::SignIn),
            _ => None,
        }
    }
}

/// Stored token digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTokenRecord {
    pub digest: String,
    pub user_id: UserId,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailTokenRepository: Send + Sync {
    /// Store a token digest.
    async fn store(&self, record: &EmailTokenRecord) -> Result<(), EmailTokenRepositoryError>;

    /// Remove and return an unexpired token; expired or unknown digests yield `None`.
    async fn consume(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<EmailTokenRecord>, EmailTokenRepositoryError>;
}

impl From<EmailTokenRepositoryError> for Error {
    fn from(err: EmailTokenRepositoryError) -> Self {
        match err {
            EmailTokenRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("token store unavailable: {message}"))
            }
            EmailTokenRepositoryError::Query { message } => {
                Error::internal(format!("token store error: {message}"))
            }
        }
    }
}
