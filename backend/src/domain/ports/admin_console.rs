//! Driving port for back-office operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::{Page, PageRequest};

use crate::domain::{Error, UserAccount, UserId};

use super::AccountKey;

/// Outcome of reviewing a volunteer recruiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolunteerDecision {
    Approve,
    Reject,
}

/// Health of one backing dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyStatus {
    pub name: &'static str,
    pub healthy: bool,
    pub detail: Option<String>,
    pub latency_ms: u64,
}

/// Diagnostics snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsReport {
    pub checked_at: DateTime<Utc>,
    pub dependencies: Vec<DependencyStatus>,
}

impl DiagnosticsReport {
    /// Whether every dependency answered.
    pub fn is_healthy(&self) -> bool {
        self.dependencies.iter().all(|status| status.healthy)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdminConsole: Send + Sync {
    /// Accounts newest first.
    async fn list_accounts(
        &self,
        page: &PageRequest<AccountKey>,
    ) -> Result<Page<UserAccount>, Error>;

    /// Delete an account and its ledger.
    async fn delete_account(&self, user_id: &UserId) -> Result<(), Error>;

    /// Approve or reject a volunteer recruiter.
    async fn decide_volunteer(
        &self,
        user_id: &UserId,
        decision: VolunteerDecision,
    ) -> Result<UserAccount, Error>;

    /// Probe every backing dependency.
    async fn diagnostics(&self) -> Result<DiagnosticsReport, Error>;
}
