//! Back-office service: account management, volunteer review, diagnostics.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use mockable::Clock;
use pagination::{Page, PageRequest};
use tokio::time::Instant;
use tracing::{info, warn};

use super::ports::{
    AccountKey, AccountRepository, AdminConsole, DependencyProbe, DependencyStatus,
    DiagnosticsReport, EngagementEvent, EngagementEventBus, VolunteerDecision,
};
use super::{Error, UserAccount, UserId, VolunteerStatus};

/// Listing key for an account.
pub fn account_key(account: &UserAccount) -> AccountKey {
    (account.created_at, *account.id.as_uuid())
}

/// Admin service.
#[derive(Clone)]
pub struct AdminService<A> {
    accounts: Arc<A>,
    events: Arc<dyn EngagementEventBus>,
    probes: Vec<Arc<dyn DependencyProbe>>,
    clock: Arc<dyn Clock>,
}

impl<A> AdminService<A> {
    /// Create the service.
    pub fn new(
        accounts: Arc<A>,
        events: Arc<dyn EngagementEventBus>,
        probes: Vec<Arc<dyn DependencyProbe>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            events,
            probes,
            clock,
        }
    }
}

async fn probe(dependency: Arc<dyn DependencyProbe>) -> DependencyStatus {
    let started = Instant::now();
    let result = dependency.check().await;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match result {
        Ok(()) => DependencyStatus {
            name: dependency.name(),
            healthy: true,
            detail: None,
            latency_ms,
        },
        Err(err) => {
            warn!(dependency = dependency.name(), error = %err, "dependency probe failed");
            DependencyStatus {
                name: dependency.name(),
                healthy: false,
                detail: Some(err.to_string()),
                latency_ms,
            }
        }
    }
}

#[async_trait]
impl<A> AdminConsole for AdminService<A>
where
    A: AccountRepository,
{
    async fn list_accounts(
        &self,
        page: &PageRequest<AccountKey>,
    ) -> Result<Page<UserAccount>, Error> {
        let rows = self.accounts.list(page).await?;
        Page::from_probe(rows, page.limit(), account_key)
            .map_err(|err| Error::internal(format!("failed to encode account cursor: {err}")))
    }

    async fn delete_account(&self, user_id: &UserId) -> Result<(), Error> {
        if !self.accounts.delete(user_id).await? {
            return Err(Error::not_found("account not found"));
        }
        self.events
            .publish(EngagementEvent::AccountRemoved { user_id: *user_id });
        info!(%user_id, "account deleted");
        Ok(())
    }

    async fn decide_volunteer(
        &self,
        user_id: &UserId,
        decision: VolunteerDecision,
    ) -> Result<UserAccount, Error> {
        let status = match decision {
            VolunteerDecision::Approve => VolunteerStatus::Approved,
            VolunteerDecision::Reject => VolunteerStatus::Rejected,
        };
        let account = self
            .accounts
            .set_volunteer_status(user_id, status)
            .await?
            .ok_or_else(|| Error::not_found("volunteer recruiter not found"))?;
        info!(%user_id, status = status.as_str(), "volunteer recruiter reviewed");
        Ok(account)
    }

    async fn diagnostics(&self) -> Result<DiagnosticsReport, Error> {
        let dependencies = join_all(self.probes.iter().cloned().map(probe)).await;
        Ok(DiagnosticsReport {
            checked_at: self.clock.utc(),
            dependencies,
        })
    }
}
