//! Driven port for account persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::PageRequest;
use uuid::Uuid;

use crate::domain::{Email, Error, NewAccount, UserAccount, UserId, VolunteerStatus};

use super::define_port_error;

/// Ordering key for account listings (newest first).
pub type AccountKey = (DateTime<Utc>, Uuid);

define_port_error! {
    /// Persistence errors raised by account repository adapters.
    pub enum AccountRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "account repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "account repository query failed: {message}",
        /// Another account already uses the email address.
        DuplicateEmail { email: String } => "an account already exists for {email}",
        /// Another account already uses the identifier.
        DuplicateId { id: String } => "an account already exists with id {id}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account with a zero balance.
    ///
    /// Never replaces an existing row: a taken id is `DuplicateId`, a taken
    /// email is `DuplicateEmail`.
    async fn create(&self, account: &NewAccount) -> Result<UserAccount, AccountRepositoryError>;

    /// Fetch an account by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, AccountRepositoryError>;

    /// Fetch an account by normalised email.
    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserAccount>, AccountRepositoryError>;

    /// List accounts newest first; returns up to `probe_limit` rows.
    async fn list(
        &self,
        page: &PageRequest<AccountKey>,
    ) -> Result<Vec<UserAccount>, AccountRepositoryError>;

    /// Record that the email address was confirmed, keeping the first timestamp.
    async fn mark_email_confirmed(
        &self,
        id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<UserAccount>, AccountRepositoryError>;

    /// Update a volunteer recruiter's approval status.
    ///
    /// Returns `None` when no volunteer recruiter has this id.
    async fn set_volunteer_status(
        &self,
        id: &UserId,
        status: VolunteerStatus,
    ) -> Result<Option<UserAccount>, AccountRepositoryError>;

    /// Delete an account together with its ledger and tokens.
    async fn delete(&self, id: &UserId) -> Result<bool, AccountRepositoryError>;
}

impl From<AccountRepositoryError> for Error {
    fn from(err: AccountRepositoryError) -> Self {
        match err {
            AccountRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("account store unavailable: {message}"))
            }
            AccountRepositoryError::Query { message } => {
                Error::internal(format!("account store error: {message}"))
            }
            AccountRepositoryError::DuplicateEmail { email } => {
                Error::conflict("an account already exists for this email")
                    .with_details(serde_json::json!({ "field": "email", "email": email }))
            }
            AccountRepositoryError::DuplicateId { id } => {
                Error::conflict("an account already exists with this id")
                    .with_details(serde_json::json!({ "field": "userId", "userId": id }))
            }
        }
    }
}
