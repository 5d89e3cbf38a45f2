//! Badge catalogue and NFT award tiers.
//!
//! Nothing here is persisted: a badge's status is recomputed from the
//! balance and the per-activity counts every time it is read.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::points::ActivityCounts;

/// Badge theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BadgeKind {
    Participation,
    Knowledge,
    Application,
    Advocacy,
    Milestone,
}

/// Badge rarity shown by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BadgeRarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

/// What a user must achieve to earn a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeCriterion {
    /// Balance reaches the threshold.
    PointsAtLeast(u64),
    /// The activity has been recorded at least `count` times.
    ActivityCount {
        activity: &'static str,
        count: u64,
    },
}

impl BadgeCriterion {
    /// Current progress and target for the given engagement state.
    pub fn progress(self, balance: u64, counts: &ActivityCounts) -> (u64, u64) {
        match self {
            Self::PointsAtLeast(target) => (balance, target),
            Self::ActivityCount { activity, count } => {
                (counts.get(activity).copied().unwrap_or(0), count)
            }
        }
    }
}

/// Static badge definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: BadgeKind,
    pub rarity: BadgeRarity,
    pub criterion: BadgeCriterion,
}

pub const BADGE_CATALOGUE: &[Badge] = &[
    Badge {
        id: "first_steps",
        name: "First Steps",
        kind: BadgeKind::Participation,
        rarity: BadgeRarity::Common,
        criterion: BadgeCriterion::PointsAtLeast(10),
    },
    Badge {
        id: "regular_visitor",
        name: "Regular Visitor",
        kind: BadgeKind::Participation,
        rarity: BadgeRarity::Uncommon,
        criterion: BadgeCriterion::ActivityCount {
            activity: "daily_check_in",
            count: 7,
        },
    },
    Badge {
        id: "trivia_rookie",
        name: "Trivia Rookie",
        kind: BadgeKind::Knowledge,
        rarity: BadgeRarity::Common,
        criterion: BadgeCriterion::ActivityCount {
            activity: "trivia_completed",
            count: 1,
        },
    },
    Badge {
        id: "trivia_master",
        name: "Trivia Master",
        kind: BadgeKind::Knowledge,
        rarity: BadgeRarity::Rare,
        criterion: BadgeCriterion::ActivityCount {
            activity: "trivia_completed",
            count: 10,
        },
    },
    Badge {
        id: "advocate",
        name: "Advocate",
        kind: BadgeKind::Advocacy,
        rarity: BadgeRarity::Uncommon,
        criterion: BadgeCriterion::ActivityCount {
            activity: "content_shared",
            count: 5,
        },
    },
    Badge {
        id: "event_regular",
        name: "Event Regular",
        kind: BadgeKind::Participation,
        rarity: BadgeRarity::Rare,
        criterion: BadgeCriterion::ActivityCount {
            activity: "event_attended",
            count: 3,
        },
    },
    Badge {
        id: "applicant",
        name: "Applicant",
        kind: BadgeKind::Application,
        rarity: BadgeRarity::Rare,
        criterion: BadgeCriterion::ActivityCount {
            activity: "application_submission",
            count: 1,
        },
    },
    Badge {
        id: "dedicated_candidate",
        name: "Dedicated Candidate",
        kind: BadgeKind::Milestone,
        rarity: BadgeRarity::Epic,
        criterion: BadgeCriterion::PointsAtLeast(1_000),
    },
    Badge {
        id: "elite_recruit",
        name: "Elite Recruit",
        kind: BadgeKind::Milestone,
        rarity: BadgeRarity::Legendary,
        criterion: BadgeCriterion::PointsAtLeast(5_000),
    },
];

/// Derived badge status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BadgeStatus {
    Earned,
    InProgress { percent: u8 },
    Locked,
}

impl BadgeStatus {
    fn from_progress(current: u64, target: u64) -> Self {
        if current >= target {
            return Self::Earned;
        }
        if current == 0 {
            return Self::Locked;
        }
        // current < target here, so the quotient is below 100.
        let percent = current.saturating_mul(100) / target.max(1);
        Self::InProgress {
            percent: u8::try_from(percent.clamp(1, 99)).unwrap_or(99),
        }
    }
}

/// One badge with its status for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeProgress {
    pub badge: &'static Badge,
    pub status: BadgeStatus,
    pub current: u64,
    pub target: u64,
}

/// Evaluate every catalogue badge.
pub fn evaluate_badges(balance: u64, counts: &ActivityCounts) -> Vec<BadgeProgress> {
    BADGE_CATALOGUE
        .iter()
        .map(|badge| {
            let (current, target) = badge.criterion.progress(balance, counts);
            BadgeProgress {
                badge,
                status: BadgeStatus::from_progress(current, target),
                current,
                target,
            }
        })
        .collect()
}

/// Ids of badges earned in `after` but not in `before`.
pub fn newly_earned(
    (before_balance, before_counts): (u64, &ActivityCounts),
    (after_balance, after_counts): (u64, &ActivityCounts),
) -> Vec<&'static str> {
    BADGE_CATALOGUE
        .iter()
        .filter(|badge| {
            let (was, target) = badge.criterion.progress(before_balance, before_counts);
            let (now, _) = badge.criterion.progress(after_balance, after_counts);
            was < target && now >= target
        })
        .map(|badge| badge.id)
        .collect()
}

/// NFT award tier derived from the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AwardTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl AwardTier {
    /// Tiers in ascending order.
    pub const ALL: [Self; 4] = [Self::Bronze, Self::Silver, Self::Gold, Self::Platinum];

    /// Balance needed to reach the tier.
    pub const fn threshold(self) -> u64 {
        match self {
            Self::Bronze => 1_000,
            Self::Silver => 2_500,
            Self::Gold => 5_000,
            Self::Platinum => 10_000,
        }
    }

    /// Highest tier reached by `balance`.
    ///
    /// # Examples
    /// ```
    /// use recruit_backend::domain::badges::AwardTier;
    ///
    /// assert_eq!(AwardTier::for_balance(999), None);
    /// assert_eq!(AwardTier::for_balance(2_500), Some(AwardTier::Silver));
    /// ```
    pub fn for_balance(balance: u64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .rev()
            .find(|tier| balance >= tier.threshold())
    }

    /// Next tier above `balance` and the points still needed.
    pub fn next_after(balance: u64) -> Option<(Self, u64)> {
        Self::ALL
            .into_iter()
            .find(|tier| balance < tier.threshold())
            .map(|tier| (tier, tier.threshold() - balance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn counts(pairs: &[(&str, u64)]) -> ActivityCounts {
        pairs
            .iter()
            .map(|(slug, n)| ((*slug).to_owned(), *n))
            .collect()
    }

    fn status_of(progress: &[BadgeProgress], id: &str) -> BadgeStatus {
        progress
            .iter()
            .find(|p| p.badge.id == id)
            .map(|p| p.status)
            .expect("badge in catalogue")
    }

    #[rstest]
    fn new_account_has_everything_locked() {
        let progress = evaluate_badges(0, &ActivityCounts::new());
        assert!(progress.iter().all(|p| p.status == BadgeStatus::Locked));
        assert_eq!(progress.len(), BADGE_CATALOGUE.len());
    }

    #[rstest]
    fn partial_progress_reports_percentage() {
        let progress = evaluate_badges(20, &counts(&[("trivia_completed", 3)]));
        assert_eq!(status_of(&progress, "trivia_rookie"), BadgeStatus::Earned);
        assert_eq!(
            status_of(&progress, "trivia_master"),
            BadgeStatus::InProgress { percent: 30 }
        );
        assert_eq!(status_of(&progress, "first_steps"), BadgeStatus::Earned);
    }

    #[rstest]
    fn tiny_progress_rounds_up_to_one_percent() {
        let progress = evaluate_badges(1, &ActivityCounts::new());
        assert_eq!(
            status_of(&progress, "elite_recruit"),
            BadgeStatus::InProgress { percent: 1 }
        );
    }

    #[rstest]
    fn newly_earned_lists_only_crossed_thresholds() {
        let before = counts(&[]);
        let after = counts(&[("application_submission", 1)]);
        let unlocked = newly_earned((0, &before), (500, &after));
        assert_eq!(unlocked, vec!["first_steps", "applicant"]);
        assert!(newly_earned((500, &after), (510, &after)).is_empty());
    }

    #[rstest]
    #[case(0, None)]
    #[case(1_000, Some(AwardTier::Bronze))]
    #[case(4_999, Some(AwardTier::Silver))]
    #[case(50_000, Some(AwardTier::Platinum))]
    fn tier_for_balance(#[case] balance: u64, #[case] expected: Option<AwardTier>) {
        assert_eq!(AwardTier::for_balance(balance), expected);
    }

    #[rstest]
    fn next_tier_reports_remaining_points() {
        assert_eq!(AwardTier::next_after(900), Some((AwardTier::Bronze, 100)));
        assert_eq!(AwardTier::next_after(10_000), None);
    }

    #[rstest]
    fn status_serialises_with_state_tag() {
        let value = serde_json::to_value(BadgeStatus::InProgress { percent: 40 }).expect("json");
        assert_eq!(value, serde_json::json!({"state": "in_progress", "percent": 40}));
    }
}
