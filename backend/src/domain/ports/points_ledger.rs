//! Driven port for the participation ledger.
//!
//! Adapters own the transaction boundary: `apply_credit` must increment the
//! balance and append the log entry atomically, or do neither.

use async_trait::async_trait;
use pagination::PageRequest;

use crate::domain::{Error, UserId};
use crate::domain::engagement::LeaderboardKey;
use crate::domain::points::{
    ActivityCounts, ActivityEntry, BalanceAudit, CreditApplied, HistoryKey, LedgerCredit,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by ledger adapters.
    pub enum PointsLedgerError {
        /// Ledger store connection could not be established.
        Connection { message: String } => "points ledger connection failed: {message}",
        /// Query or transaction failed during execution.
        Query { message: String } => "points ledger query failed: {message}",
    }
}

/// Ranked leaderboard row as read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub rank: u64,
    pub user_id: UserId,
    pub display_name: String,
    pub balance: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PointsLedger: Send + Sync {
    /// Atomically add the credit to the balance and append the log entry.
    ///
    /// The returned per-activity counts are read in the same transaction,
    /// after the insert. Returns `None`, with nothing written, when the account does not exist.
    async fn apply_credit(
        &self,
        credit: &LedgerCredit,
    ) -> Result<Option<CreditApplied>, PointsLedgerError>;

    /// Number of log entries per activity slug.
    async fn activity_counts(&self, user_id: &UserId) -> Result<ActivityCounts, PointsLedgerError>;

    /// Log entries newest first; returns up to `probe_limit` rows.
    async fn history(
        &self,
        user_id: &UserId,
        page: &PageRequest<HistoryKey>,
    ) -> Result<Vec<ActivityEntry>, PointsLedgerError>;

    /// Compare the stored balance with the log total.
    async fn audit(&self, user_id: &UserId) -> Result<Option<BalanceAudit>, PointsLedgerError>;

    /// Set the balance to the log total, returning the audit taken beforehand.
    async fn reconcile(&self, user_id: &UserId) -> Result<Option<BalanceAudit>, PointsLedgerError>;

    /// Ranked accounts ordered by balance desc then id; up to `probe_limit` rows.
    async fn leaderboard(
        &self,
        page: &PageRequest<LeaderboardKey>,
    ) -> Result<Vec<LeaderboardRow>, PointsLedgerError>;

    /// Competition rank of a ranked account (ties share a rank).
    async fn rank_of(&self, user_id: &UserId) -> Result<Option<u64>, PointsLedgerError>;
}

impl From<PointsLedgerError> for Error {
    fn from(err: PointsLedgerError) -> Self {
        match err {
            PointsLedgerError::Connection { message } => {
                Error::service_unavailable(format!("points ledger unavailable: {message}"))
            }
            PointsLedgerError::Query { message } => {
                Error::internal(format!("points ledger error: {message}"))
            }
        }
    }
}
