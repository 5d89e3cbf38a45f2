//! Driven port for in-process engagement notifications.
//!
//! Events only say *that* something changed; subscribers re-query the
//! current snapshot, so a dropped or lagged event costs one refresh at most.

use tokio::sync::broadcast;

use crate::domain::UserId;

/// Change notification published after a ledger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementEvent {
    /// Points were credited.
    PointsAwarded { user_id: UserId, new_balance: u64 },
    /// The balance was reset to the log total.
    BalanceReconciled { user_id: UserId },
    /// The account was deleted.
    AccountRemoved { user_id: UserId },
}

impl EngagementEvent {
    /// Account the event concerns.
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::PointsAwarded { user_id, .. }
            | Self::BalanceReconciled { user_id }
            | Self::AccountRemoved { user_id } => *user_id,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait EngagementEventBus: Send + Sync {
    /// Publish an event; having no subscribers is not an error.
    fn publish(&self, event: EngagementEvent);

    /// Subscribe to events published from now on.
    fn subscribe(&self) -> broadcast::Receiver<EngagementEvent>;
}
