//! Participation points: validated award inputs, ledger entries, and the
//! outcome of crediting an account.
//!
//! ## Invariants
//! - An account's `participation_count` equals the sum of its
//!   [`ActivityEntry`] points; every write applies both in one transaction.
//! - Credits are strictly positive and bounded by [`PointAmount::MAX`].

mod catalogue;
mod service;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::badges::AwardTier;
use super::{DisplayName, Email, LedgerKind, UserId};

pub use catalogue::{ACTIVITY_CATALOGUE, CatalogueActivity, lookup_activity};
pub use service::PointsService;

/// Maximum length of an activity slug.
pub const ACTIVITY_SLUG_MAX: usize = 64;
/// Maximum length of a free-text description.
pub const DESCRIPTION_MAX: usize = 280;

/// Number of entries recorded per activity slug.
pub type ActivityCounts = BTreeMap<String, u64>;

/// Ordering key for activity history pages (newest first).
pub type HistoryKey = (DateTime<Utc>, Uuid);

/// Validation failures for award inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PointsValidationError {
    #[error("points must be between 1 and {max}")]
    PointsOutOfRange { max: u32 },
    #[error("activity must be 1 to {max} characters of a-z, 0-9, or _")]
    InvalidActivity { max: usize },
    #[error("description must be at most {max} characters")]
    DescriptionTooLong { max: usize },
}

impl PointsValidationError {
    /// Request field the failure relates to.
    pub const fn field(&self) -> &'static str {
        match self {
            Self::PointsOutOfRange { .. } => "points",
            Self::InvalidActivity { .. } => "activity",
            Self::DescriptionTooLong { .. } => "description",
        }
    }
}

/// Positive, bounded number of points in a single credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PointAmount(u32);

impl PointAmount {
    /// Largest single credit.
    pub const MAX: u32 = 10_000;

    /// Validate a point amount.
    ///
    /// # Examples
    /// ```
    /// use recruit_backend::domain::points::PointAmount;
    ///
    /// assert!(PointAmount::new(0).is_err());
    /// assert_eq!(PointAmount::new(500).map(PointAmount::get), Ok(500));
    /// ```
    pub const fn new(points: u32) -> Result<Self, PointsValidationError> {
        if points == 0 || points > Self::MAX {
            return Err(PointsValidationError::PointsOutOfRange { max: Self::MAX });
        }
        Ok(Self(points))
    }

    /// Raw value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Activity slug such as `trivia_completed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActivityType(String);

impl ActivityType {
    /// Validate a slug of lower-case letters, digits, and underscores.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, PointsValidationError> {
        let slug = raw.as_ref().trim();
        let valid = !slug.is_empty()
            && slug.len() <= ACTIVITY_SLUG_MAX
            && slug
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
        if !valid {
            return Err(PointsValidationError::InvalidActivity {
                max: ACTIVITY_SLUG_MAX,
            });
        }
        Ok(Self(slug.to_owned()))
    }
}

impl AsRef<str> for ActivityType {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optional free text stored with an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDescription(String);

impl ActivityDescription {
    /// Trim and validate a description; blank input yields `None`.
    pub fn parse(raw: Option<&str>) -> Result<Option<Self>, PointsValidationError> {
        let Some(trimmed) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return Ok(None);
        };
        if trimmed.chars().count() > DESCRIPTION_MAX {
            return Err(PointsValidationError::DescriptionTooLong {
                max: DESCRIPTION_MAX,
            });
        }
        Ok(Some(Self(trimmed.to_owned())))
    }
}

impl AsRef<str> for ActivityDescription {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Validated request to credit an existing account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardRequest {
    pub user_id: UserId,
    pub points: PointAmount,
    pub activity: ActivityType,
    pub description: Option<ActivityDescription>,
}

/// Details used to create a recruit account during a direct award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecruitDetails {
    pub email: Email,
    pub display_name: DisplayName,
}

/// Admin award that may create the recipient first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectAwardRequest {
    pub award: AwardRequest,
    pub new_account: Option<NewRecruitDetails>,
}

/// Credit handed to the ledger adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCredit {
    pub entry_id: Uuid,
    pub user_id: UserId,
    pub points: PointAmount,
    pub activity: ActivityType,
    pub description: Option<ActivityDescription>,
    pub ledger: LedgerKind,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only activity log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub user_id: UserId,
    pub points: u32,
    pub activity: String,
    pub description: Option<String>,
    pub ledger: LedgerKind,
    pub created_at: DateTime<Utc>,
}

impl ActivityEntry {
    /// Key used to continue history pagination after this entry.
    pub const fn history_key(&self) -> HistoryKey {
        (self.created_at, self.id)
    }
}

/// Result of applying a credit inside one transaction.
///
/// `activity_counts` is read in the same transaction and includes `entry`,
/// so concurrent credits each see a distinct post-credit state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditApplied {
    pub new_balance: u64,
    pub entry: ActivityEntry,
    pub activity_counts: ActivityCounts,
}

impl CreditApplied {
    /// Balance and per-activity counts as they stood before this credit.
    pub fn before(&self) -> (u64, ActivityCounts) {
        let mut counts = self.activity_counts.clone();
        if let Some(count) = counts.get_mut(&self.entry.activity) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&self.entry.activity);
            }
        }
        (
            self.new_balance.saturating_sub(u64::from(self.entry.points)),
            counts,
        )
    }
}

/// Outcome returned to callers of the points service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardOutcome {
    pub user_id: UserId,
    pub points_awarded: u32,
    pub new_balance: u64,
    pub entry_id: Uuid,
    pub unlocked_badges: Vec<&'static str>,
    pub tier: Option<AwardTier>,
}

/// Comparison between the stored balance and the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceAudit {
    pub user_id: UserId,
    pub recorded_balance: u64,
    pub ledger_total: u64,
    pub entry_count: u64,
}

impl BalanceAudit {
    /// Signed difference `recorded_balance - ledger_total`.
    pub fn drift(&self) -> i128 {
        i128::from(self.recorded_balance) - i128::from(self.ledger_total)
    }

    /// Whether the balance matches the log.
    pub const fn is_consistent(&self) -> bool {
        self.recorded_balance == self.ledger_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(10_000, true)]
    #[case(10_001, false)]
    fn point_amount_bounds(#[case] raw: u32, #[case] valid: bool) {
        assert_eq!(PointAmount::new(raw).is_ok(), valid);
    }

    #[rstest]
    #[case("trivia_completed", true)]
    #[case("  video_watched ", true)]
    #[case("Trivia", false)]
    #[case("has-dash", false)]
    #[case("", false)]
    fn activity_slug_validation(#[case] raw: &str, #[case] valid: bool) {
        assert_eq!(ActivityType::new(raw).is_ok(), valid);
    }

    #[rstest]
    fn activity_slug_length_is_bounded() {
        assert!(ActivityType::new("a".repeat(ACTIVITY_SLUG_MAX)).is_ok());
        assert!(ActivityType::new("a".repeat(ACTIVITY_SLUG_MAX + 1)).is_err());
    }

    #[rstest]
    fn description_is_optional_and_bounded() {
        assert_eq!(ActivityDescription::parse(Some("   ")), Ok(None));
        let long = "x".repeat(DESCRIPTION_MAX + 1);
        let err = ActivityDescription::parse(Some(&long)).expect_err("too long");
        assert_eq!(err.field(), "description");
    }

    fn applied(activity: &str, points: u32, balance: u64, counts: &[(&str, u64)]) -> CreditApplied {
        CreditApplied {
            new_balance: balance,
            entry: ActivityEntry {
                id: Uuid::new_v4(),
                user_id: UserId::random(),
                points,
                activity: activity.to_owned(),
                description: None,
                ledger: LedgerKind::Recruit,
                created_at: Utc::now(),
            },
            activity_counts: counts
                .iter()
                .map(|(slug, count)| ((*slug).to_owned(), *count))
                .collect(),
        }
    }

    #[rstest]
    fn before_state_removes_this_credit() {
        let credit = applied(
            "trivia_completed",
            20,
            120,
            &[("trivia_completed", 3), ("video_watched", 1)],
        );
        let (balance, counts) = credit.before();
        assert_eq!(balance, 100);
        assert_eq!(counts.get("trivia_completed"), Some(&2));
        assert_eq!(counts.get("video_watched"), Some(&1));
    }

    #[rstest]
    fn first_entry_of_an_activity_leaves_no_prior_count() {
        let credit = applied("event_attended", 50, 50, &[("event_attended", 1)]);
        let (balance, counts) = credit.before();
        assert_eq!(balance, 0);
        assert!(counts.is_empty());
    }

    #[rstest]
    #[case(120, 100, 20)]
    #[case(80, 100, -20)]
    fn audit_reports_signed_drift(#[case] recorded: u64, #[case] total: u64, #[case] drift: i128) {
        let audit = BalanceAudit {
            user_id: UserId::random(),
            recorded_balance: recorded,
            ledger_total: total,
            entry_count: 3,
        };
        assert_eq!(audit.drift(), drift);
        assert!(!audit.is_consistent());
    }
}
