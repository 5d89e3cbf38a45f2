//! Engagement read models: per-user snapshots and the ranked leaderboard.
//!
//! Snapshots are complete, self-describing payloads. Observers never merge
//! them; the most recent one replaces whatever came before.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use pagination::{Page, PageRequest};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::badges::{AwardTier, BadgeKind, BadgeProgress, BadgeRarity, BadgeStatus, evaluate_badges};
use super::ports::{AccountRepository, EngagementQuery, LeaderboardRow, PointsLedger};
use super::{Error, UserAccount, UserId};

/// Leaderboard ordering key: balance descending, then user id ascending.
pub type LeaderboardKey = (u64, UserId);

/// Badge status as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BadgeView {
    pub id: String,
    pub name: String,
    pub kind: BadgeKind,
    pub rarity: BadgeRarity,
    pub status: BadgeStatus,
    pub current: u64,
    pub target: u64,
}

impl From<BadgeProgress> for BadgeView {
    fn from(progress: BadgeProgress) -> Self {
        Self {
            id: progress.badge.id.to_owned(),
            name: progress.badge.name.to_owned(),
            kind: progress.badge.kind,
            rarity: progress.badge.rarity,
            status: progress.status,
            current: progress.current,
            target: progress.target,
        }
    }
}

/// Next award tier and the points still needed to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NextTier {
    pub tier: AwardTier,
    pub points_needed: u64,
}

/// Everything a client needs to render a user's engagement state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngagementSnapshot {
    #[schema(value_type = String, format = Uuid)]
    pub user_id: UserId,
    pub display_name: String,
    pub balance: u64,
    /// Absent for accounts that are not ranked (admins).
    pub rank: Option<u64>,
    pub tier: Option<AwardTier>,
    pub next_tier: Option<NextTier>,
    pub badges: Vec<BadgeView>,
    pub generated_at: DateTime<Utc>,
}

/// One ranked leaderboard line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u64,
    #[schema(value_type = String, format = Uuid)]
    pub user_id: UserId,
    pub display_name: String,
    pub balance: u64,
    pub tier: Option<AwardTier>,
}

impl LeaderboardEntry {
    /// Key used to continue pagination after this entry.
    pub const fn key(&self) -> LeaderboardKey {
        (self.balance, self.user_id)
    }
}

impl From<LeaderboardRow> for LeaderboardEntry {
    fn from(row: LeaderboardRow) -> Self {
        Self {
            rank: row.rank,
            user_id: row.user_id,
            display_name: row.display_name,
            balance: row.balance,
            tier: AwardTier::for_balance(row.balance),
        }
    }
}

/// Engagement query service backed by the account store and ledger.
#[derive(Clone)]
pub struct EngagementService<A, L> {
    accounts: Arc<A>,
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
}

impl<A, L> EngagementService<A, L> {
    /// Create the service.
    pub fn new(accounts: Arc<A>, ledger: Arc<L>, clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts,
            ledger,
            clock,
        }
    }
}

impl<A, L> EngagementService<A, L>
where
    A: AccountRepository,
    L: PointsLedger,
{
    async fn load_account(&self, user_id: &UserId) -> Result<UserAccount, Error> {
        self.accounts
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| Error::not_found("account not found"))
    }

    async fn badge_views(&self, account: &UserAccount) -> Result<Vec<BadgeView>, Error> {
        let counts = self.ledger.activity_counts(&account.id).await?;
        Ok(evaluate_badges(account.participation_count, &counts)
            .into_iter()
            .map(BadgeView::from)
            .collect())
    }
}

#[async_trait]
impl<A, L> EngagementQuery for EngagementService<A, L>
where
    A: AccountRepository,
    L: PointsLedger,
{
    async fn profile(&self, user_id: &UserId) -> Result<UserAccount, Error> {
        self.load_account(user_id).await
    }

    async fn summary(&self, user_id: &UserId) -> Result<EngagementSnapshot, Error> {
        let account = self.load_account(user_id).await?;
        let badges = self.badge_views(&account).await?;
        let rank = if account.role.is_ranked() {
            self.ledger.rank_of(&account.id).await?
        } else {
            None
        };
        let balance = account.participation_count;
        Ok(EngagementSnapshot {
            user_id: account.id,
            display_name: account.display_name.to_string(),
            balance,
            rank,
            tier: AwardTier::for_balance(balance),
            next_tier: AwardTier::next_after(balance)
                .map(|(tier, points_needed)| NextTier { tier, points_needed }),
            badges,
            generated_at: self.clock.utc(),
        })
    }

    async fn badges(&self, user_id: &UserId) -> Result<Vec<BadgeView>, Error> {
        let account = self.load_account(user_id).await?;
        self.badge_views(&account).await
    }

    async fn leaderboard(
        &self,
        page: &PageRequest<LeaderboardKey>,
    ) -> Result<Page<LeaderboardEntry>, Error> {
        let rows = self.ledger.leaderboard(page).await?;
        let entries = rows.into_iter().map(LeaderboardEntry::from).collect();
        Page::from_probe(entries, page.limit(), LeaderboardEntry::key)
            .map_err(|err| Error::internal(format!("failed to encode leaderboard cursor: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockAccountRepository, MockPointsLedger};
    use crate::domain::{DisplayName, Email, ErrorCode, Role};
    use chrono::TimeZone;
    use mockable::MockClock;
    use rstest::{fixture, rstest};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[fixture]
    fn clock() -> Arc<dyn Clock> {
        let mut clock = MockClock::new();
        clock.expect_utc().returning(fixed_now);
        Arc::new(clock)
    }

    fn account(role: Role, balance: u64) -> UserAccount {
        UserAccount {
            id: UserId::random(),
            email: Email::new("recruit@example.org").expect("email"),
            display_name: DisplayName::new("Deputy Dana").expect("name"),
            role,
            organisation: None,
            email_confirmed_at: Some(fixed_now()),
            participation_count: balance,
            created_at: fixed_now(),
            updated_at: fixed_now(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn summary_combines_balance_rank_tier_and_badges(clock: Arc<dyn Clock>) {
        let stored = account(Role::Recruit, 1_200);
        let user_id = stored.id;
        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        let mut ledger = MockPointsLedger::new();
        ledger.expect_activity_counts().returning(|_| {
            Ok([("trivia_completed".to_owned(), 2)].into_iter().collect())
        });
        ledger.expect_rank_of().returning(|_| Ok(Some(4)));

        let service = EngagementService::new(Arc::new(accounts), Arc::new(ledger), clock);
        let snapshot = service.summary(&user_id).await.expect("summary");

        assert_eq!(snapshot.balance, 1_200);
        assert_eq!(snapshot.rank, Some(4));
        assert_eq!(snapshot.tier, Some(AwardTier::Bronze));
        assert_eq!(
            snapshot.next_tier,
            Some(NextTier {
                tier: AwardTier::Silver,
                points_needed: 1_300
            })
        );
        assert_eq!(snapshot.generated_at, fixed_now());
        let rookie = snapshot
            .badges
            .iter()
            .find(|badge| badge.id == "trivia_rookie")
            .expect("badge present");
        assert_eq!(rookie.status, BadgeStatus::Earned);
    }

    #[rstest]
    #[tokio::test]
    async fn admins_are_not_ranked(clock: Arc<dyn Clock>) {
        let stored = account(Role::Admin, 0);
        let user_id = stored.id;
        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        let mut ledger = MockPointsLedger::new();
        ledger
            .expect_activity_counts()
            .returning(|_| Ok(Default::default()));
        ledger.expect_rank_of().never();

        let service = EngagementService::new(Arc::new(accounts), Arc::new(ledger), clock);
        let snapshot = service.summary(&user_id).await.expect("summary");
        assert_eq!(snapshot.rank, None);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_account_is_not_found(clock: Arc<dyn Clock>) {
        let mut accounts = MockAccountRepository::new();
        accounts.expect_find_by_id().returning(|_| Ok(None));
        let service =
            EngagementService::new(Arc::new(accounts), Arc::new(MockPointsLedger::new()), clock);
        let err = service.badges(&UserId::random()).await.expect_err("missing");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn leaderboard_trims_probe_row_into_cursor(clock: Arc<dyn Clock>) {
        let rows: Vec<LeaderboardRow> = (0..3_u64)
            .map(|i| LeaderboardRow {
                rank: i + 1,
                user_id: UserId::random(),
                display_name: format!("Recruit {i}"),
                balance: 3_000 - i * 100,
            })
            .collect();
        let mut ledger = MockPointsLedger::new();
        ledger
            .expect_leaderboard()
            .withf(|page| page.probe_limit() == 3)
            .returning(move |_| Ok(rows.clone()));

        let service =
            EngagementService::new(Arc::new(MockAccountRepository::new()), Arc::new(ledger), clock);
        let page = service
            .leaderboard(&PageRequest::first(2))
            .await
            .expect("page");
        assert_eq!(page.items().len(), 2);
        assert!(page.next_cursor().is_some());
        assert_eq!(page.items()[0].tier, Some(AwardTier::Silver));
    }
}
