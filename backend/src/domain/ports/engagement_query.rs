//! Driving port for engagement read models.
//!
//! HTTP handlers and the SSE stream read snapshots through this port without
//! knowing which stores back them.

use async_trait::async_trait;
use pagination::{Page, PageRequest};

use crate::domain::engagement::{BadgeView, EngagementSnapshot, LeaderboardEntry, LeaderboardKey};
use crate::domain::{Error, UserAccount, UserId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngagementQuery: Send + Sync {
    /// Account details for the signed-in user.
    async fn profile(&self, user_id: &UserId) -> Result<UserAccount, Error>;

    /// Balance, rank, tier, and badge statuses.
    async fn summary(&self, user_id: &UserId) -> Result<EngagementSnapshot, Error>;

    /// Badge statuses only.
    async fn badges(&self, user_id: &UserId) -> Result<Vec<BadgeView>, Error>;

    /// One page of the ranked leaderboard.
    async fn leaderboard(
        &self,
        page: &PageRequest<LeaderboardKey>,
    ) -> Result<Page<LeaderboardEntry>, Error>;
}
