//! Driving ports for the points service.

use async_trait::async_trait;
use pagination::{Page, PageRequest};

use crate::domain::points::{
    ActivityEntry, AwardOutcome, AwardRequest, BalanceAudit, DirectAwardRequest, HistoryKey,
};
use crate::domain::{Error, UserId};

/// Self-reported activity from a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityReport {
    pub user_id: UserId,
    pub activity: String,
    pub description: Option<String>,
}

/// Commands that change balances.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PointsCommand: Send + Sync {
    /// Credit an existing account.
    async fn award(&self, request: &AwardRequest) -> Result<AwardOutcome, Error>;

    /// Admin credit that creates a recruit account when none exists.
    async fn award_direct(&self, request: &DirectAwardRequest) -> Result<AwardOutcome, Error>;

    /// Credit a catalogue activity reported by the user.
    async fn record_activity(&self, report: &ActivityReport) -> Result<AwardOutcome, Error>;

    /// Reset the balance to the log total, returning the audit taken first.
    async fn reconcile(&self, user_id: &UserId) -> Result<BalanceAudit, Error>;
}

/// Ledger reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PointsQuery: Send + Sync {
    /// Compare the stored balance with the activity log.
    async fn audit(&self, user_id: &UserId) -> Result<BalanceAudit, Error>;

    /// Activity log entries, newest first.
    async fn history(
        &self,
        user_id: &UserId,
        page: &PageRequest<HistoryKey>,
    ) -> Result<Page<ActivityEntry>, Error>;
}
