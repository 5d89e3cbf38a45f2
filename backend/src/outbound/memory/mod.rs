//! Process-local store implementing the account, ledger, and token ports.
//!
//! Every operation takes the single state mutex, so a credit updates the
//! balance and appends the log entry as one step, matching the Diesel
//! adapters' transactions. Used for local development without PostgreSQL
//! and by the integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use pagination::PageRequest;

use crate::domain::engagement::LeaderboardKey;
use crate::domain::points::{
    ActivityCounts, ActivityEntry, BalanceAudit, CreditApplied, HistoryKey, LedgerCredit,
};
use crate::domain::ports::{
    AccountKey, AccountRepository, AccountRepositoryError, DependencyProbe, EmailTokenRecord,
    EmailTokenRepository, EmailTokenRepositoryError, LeaderboardRow, PointsLedger,
    PointsLedgerError, ProbeError,
};
use crate::domain::{Email, NewAccount, Role, UserAccount, UserId, VolunteerStatus};

const POISONED: &str = "in-memory store lock poisoned";

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<UserId, UserAccount>,
    entries: Vec<ActivityEntry>,
    tokens: HashMap<String, EmailTokenRecord>,
}

impl State {
    fn audit(&self, user_id: &UserId) -> Option<BalanceAudit> {
        let account = self.accounts.get(user_id)?;
        let (ledger_total, entry_count) = self
            .entries
            .iter()
            .filter(|entry| entry.user_id == *user_id)
            .fold((0_u64, 0_u64), |(total, count), entry| {
                (total + u64::from(entry.points), count + 1)
            });
        Some(BalanceAudit {
            user_id: *user_id,
            recorded_balance: account.participation_count,
            ledger_total,
            entry_count,
        })
    }

    fn activity_counts(&self, user_id: &UserId) -> ActivityCounts {
        let mut counts = ActivityCounts::new();
        for entry in self.entries.iter().filter(|entry| entry.user_id == *user_id) {
            *counts.entry(entry.activity.clone()).or_insert(0) += 1;
        }
        counts
    }

    fn ranked(&self) -> impl Iterator<Item = &UserAccount> {
        self.accounts
            .values()
            .filter(|account| account.role.is_ranked())
    }

    fn rank_for_balance(&self, balance: u64) -> u64 {
        let higher = self
            .ranked()
            .filter(|account| account.participation_count > balance)
            .count();
        1 + higher as u64
    }
}

/// In-memory engagement store.
pub struct MemoryEngagementStore {
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
}

impl MemoryEngagementStore {
    /// Create an empty store stamping rows with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, &'static str> {
        self.state.lock().map_err(|_| POISONED)
    }
}

#[async_trait]
impl AccountRepository for MemoryEngagementStore {
    async fn create(&self, account: &NewAccount) -> Result<UserAccount, AccountRepositoryError> {
        let now = self.clock.utc();
        let mut state = self.lock().map_err(AccountRepositoryError::query)?;
        if state.accounts.contains_key(&account.id) {
            return Err(AccountRepositoryError::duplicate_id(account.id.to_string()));
        }
        if state
            .accounts
            .values()
            .any(|existing| existing.email == account.email)
        {
            return Err(AccountRepositoryError::duplicate_email(account.email.as_ref()));
        }
        let stored = UserAccount {
            id: account.id,
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            role: account.role,
            organisation: account.organisation.clone(),
            email_confirmed_at: account.email_confirmed_at,
            participation_count: 0,
            created_at: now,
            updated_at: now,
        };
        state.accounts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, AccountRepositoryError> {
        let state = self.lock().map_err(AccountRepositoryError::query)?;
        Ok(state.accounts.get(id).cloned())
    }

    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserAccount>, AccountRepositoryError> {
        let state = self.lock().map_err(AccountRepositoryError::query)?;
        Ok(state
            .accounts
            .values()
            .find(|account| account.email == *email)
            .cloned())
    }

    async fn list(
        &self,
        page: &PageRequest<AccountKey>,
    ) -> Result<Vec<UserAccount>, AccountRepositoryError> {
        let state = self.lock().map_err(AccountRepositoryError::query)?;
        let key_of = |account: &UserAccount| (account.created_at, *account.id.as_uuid());
        let mut rows: Vec<UserAccount> = state
            .accounts
            .values()
            .filter(|account| page.after_key().is_none_or(|after| key_of(account) < *after))
            .cloned()
            .collect();
        rows.sort_by(|a, b| key_of(b).cmp(&key_of(a)));
        rows.truncate(page.probe_limit());
        Ok(rows)
    }

    async fn mark_email_confirmed(
        &self,
        id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<UserAccount>, AccountRepositoryError> {
        let mut state = self.lock().map_err(AccountRepositoryError::query)?;
        Ok(state.accounts.get_mut(id).map(|account| {
            if account.email_confirmed_at.is_none() {
                account.email_confirmed_at = Some(at);
                account.updated_at = at;
            }
            account.clone()
        }))
    }

    async fn set_volunteer_status(
        &self,
        id: &UserId,
        status: VolunteerStatus,
    ) -> Result<Option<UserAccount>, AccountRepositoryError> {
        let now = self.clock.utc();
        let mut state = self.lock().map_err(AccountRepositoryError::query)?;
        Ok(state
            .accounts
            .get_mut(id)
            .filter(|account| matches!(account.role, Role::VolunteerRecruiter(_)))
            .map(|account| {
                account.role = Role::VolunteerRecruiter(status);
                account.updated_at = now;
                account.clone()
            }))
    }

    async fn delete(&self, id: &UserId) -> Result<bool, AccountRepositoryError> {
        let mut state = self.lock().map_err(AccountRepositoryError::query)?;
        if state.accounts.remove(id).is_none() {
            return Ok(false);
        }
        state.entries.retain(|entry| entry.user_id != *id);
        state.tokens.retain(|_, token| token.user_id != *id);
        Ok(true)
    }
}

#[async_trait]
impl PointsLedger for MemoryEngagementStore {
    async fn apply_credit(
        &self,
        credit: &LedgerCredit,
    ) -> Result<Option<CreditApplied>, PointsLedgerError> {
        let mut state = self.lock().map_err(PointsLedgerError::query)?;
        let Some(account) = state.accounts.get_mut(&credit.user_id) else {
            return Ok(None);
        };
        account.participation_count += u64::from(credit.points.get());
        account.updated_at = credit.recorded_at;
        let new_balance = account.participation_count;
        let entry = ActivityEntry {
            id: credit.entry_id,
            user_id: credit.user_id,
            points: credit.points.get(),
            activity: credit.activity.to_string(),
            description: credit
                .description
                .as_ref()
                .map(|text| text.as_ref().to_owned()),
            ledger: credit.ledger,
            created_at: credit.recorded_at,
        };
        state.entries.push(entry.clone());
        let activity_counts = state.activity_counts(&credit.user_id);
        Ok(Some(CreditApplied {
            new_balance,
            entry,
            activity_counts,
        }))
    }

    async fn activity_counts(&self, user_id: &UserId) -> Result<ActivityCounts, PointsLedgerError> {
        let state = self.lock().map_err(PointsLedgerError::query)?;
        Ok(state.activity_counts(user_id))
    }

    async fn history(
        &self,
        user_id: &UserId,
        page: &PageRequest<HistoryKey>,
    ) -> Result<Vec<ActivityEntry>, PointsLedgerError> {
        let state = self.lock().map_err(PointsLedgerError::query)?;
        let mut rows: Vec<ActivityEntry> = state
            .entries
            .iter()
            .filter(|entry| entry.user_id == *user_id)
            .filter(|entry| {
                page.after_key()
                    .is_none_or(|after| entry.history_key() < *after)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.history_key().cmp(&a.history_key()));
        rows.truncate(page.probe_limit());
        Ok(rows)
    }

    async fn audit(&self, user_id: &UserId) -> Result<Option<BalanceAudit>, PointsLedgerError> {
        let state = self.lock().map_err(PointsLedgerError::query)?;
        Ok(state.audit(user_id))
    }

    async fn reconcile(&self, user_id: &UserId) -> Result<Option<BalanceAudit>, PointsLedgerError> {
        let now = self.clock.utc();
        let mut state = self.lock().map_err(PointsLedgerError::query)?;
        let Some(audit) = state.audit(user_id) else {
            return Ok(None);
        };
        if let Some(account) = state.accounts.get_mut(user_id) {
            account.participation_count = audit.ledger_total;
            account.updated_at = now;
        }
        Ok(Some(audit))
    }

    async fn leaderboard(
        &self,
        page: &PageRequest<LeaderboardKey>,
    ) -> Result<Vec<LeaderboardRow>, PointsLedgerError> {
        let state = self.lock().map_err(PointsLedgerError::query)?;
        let mut ranked: Vec<&UserAccount> = state.ranked().collect();
        ranked.sort_by(|a, b| {
            b.participation_count
                .cmp(&a.participation_count)
                .then_with(|| a.id.cmp(&b.id))
        });
        let rows = ranked
            .into_iter()
            .filter(|account| {
                page.after_key().is_none_or(|(balance, id)| {
                    account.participation_count < *balance
                        || (account.participation_count == *balance && account.id > *id)
                })
            })
            .take(page.probe_limit())
            .map(|account| LeaderboardRow {
                rank: state.rank_for_balance(account.participation_count),
                user_id: account.id,
                display_name: account.display_name.to_string(),
                balance: account.participation_count,
            })
            .collect();
        Ok(rows)
    }

    async fn rank_of(&self, user_id: &UserId) -> Result<Option<u64>, PointsLedgerError> {
        let state = self.lock().map_err(PointsLedgerError::query)?;
        Ok(state
            .accounts
            .get(user_id)
            .filter(|account| account.role.is_ranked())
            .map(|account| state.rank_for_balance(account.participation_count)))
    }
}

#[async_trait]
impl EmailTokenRepository for MemoryEngagementStore {
    async fn store(&self, record: &EmailTokenRecord) -> Result<(), EmailTokenRepositoryError> {
        let mut state = self.lock().map_err(EmailTokenRepositoryError::query)?;
        state.tokens.insert(record.digest.clone(), record.clone());
        Ok(())
    }

    async fn consume(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<EmailTokenRecord>, EmailTokenRepositoryError> {
        let mut state = self.lock().map_err(EmailTokenRepositoryError::query)?;
        Ok(state
            .tokens
            .remove(digest)
            .filter(|record| record.expires_at > now))
    }
}

#[async_trait]
impl DependencyProbe for MemoryEngagementStore {
    fn name(&self) -> &'static str {
        "memory_store"
    }

    async fn check(&self) -> Result<(), ProbeError> {
        self.lock().map(|_| ()).map_err(ProbeError::unavailable)
    }
}
