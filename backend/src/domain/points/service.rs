//! Points service: the only write path into the participation ledger.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::{Page, PageRequest};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    ACTIVITY_CATALOGUE, ActivityDescription, ActivityEntry, ActivityType, AwardOutcome,
    AwardRequest, BalanceAudit, DirectAwardRequest, HistoryKey, LedgerCredit, NewRecruitDetails,
    PointAmount, PointsValidationError, lookup_activity,
};
use crate::domain::badges::{AwardTier, newly_earned};
use crate::domain::ports::{
    AccountRepository, AccountRepositoryError, ActivityReport, EngagementEvent, EngagementEventBus, PointsCommand,
    PointsLedger, PointsQuery,
};
use crate::domain::{Error, NewAccount, Role, UserAccount, UserId};

fn validation_error(err: PointsValidationError) -> Error {
    Error::invalid_request(err.to_string()).with_details(json!({ "field": err.field() }))
}

/// Points service over an account store and the ledger.
#[derive(Clone)]
pub struct PointsService<A, L> {
    accounts: Arc<A>,
    ledger: Arc<L>,
    events: Arc<dyn EngagementEventBus>,
    clock: Arc<dyn Clock>,
}

impl<A, L> PointsService<A, L> {
    /// Create the service.
    pub fn new(
        accounts: Arc<A>,
        ledger: Arc<L>,
        events: Arc<dyn EngagementEventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            ledger,
            events,
            clock,
        }
    }
}

impl<A, L> PointsService<A, L>
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

    /// Create the recruit for a direct award.
    ///
    /// A concurrent award may create the same id between our lookup and
    /// insert; the account it created is credited instead.
    async fn create_recruit(
        &self,
        user_id: UserId,
        details: &NewRecruitDetails,
    ) -> Result<UserAccount, Error> {
        let created = self
            .accounts
            .create(&NewAccount {
                id: user_id,
                email: details.email.clone(),
                display_name: details.display_name.clone(),
                role: Role::Recruit,
                organisation: None,
                email_confirmed_at: None,
            })
            .await;
        match created {
            Ok(account) => {
                info!(user_id = %account.id, "created recruit account for direct award");
                Ok(account)
            }
            Err(
                err @ (AccountRepositoryError::DuplicateId { .. }
                | AccountRepositoryError::DuplicateEmail { .. }),
            ) => match self.accounts.find_by_id(&user_id).await? {
                Some(account) => {
                    info!(%user_id, "recruit created concurrently; crediting existing account");
                    Ok(account)
                }
                None => Err(err.into()),
            },
            Err(err) => Err(err.into()),
        }
    }

    async fn credit(
        &self,
        account: &UserAccount,
        request: &AwardRequest,
    ) -> Result<AwardOutcome, Error> {
        if !account.role.can_earn_points() {
            return Err(
                Error::forbidden("volunteer recruiter has not been approved")
                    .with_details(json!({ "userId": account.id.to_string() })),
            );
        }

        let credit = LedgerCredit {
            entry_id: Uuid::new_v4(),
            user_id: account.id,
            points: request.points,
            activity: request.activity.clone(),
            description: request.description.clone(),
            ledger: account.role.ledger(),
            recorded_at: self.clock.utc(),
        };
        let applied = self
            .ledger
            .apply_credit(&credit)
            .await?
            .ok_or_else(|| Error::not_found("account not found"))?;

        let points = request.points.get();
        let (before_balance, before_counts) = applied.before();
        let unlocked_badges = newly_earned(
            (before_balance, &before_counts),
            (applied.new_balance, &applied.activity_counts),
        );

        self.events.publish(EngagementEvent::PointsAwarded {
            user_id: account.id,
            new_balance: applied.new_balance,
        });
        info!(
            user_id = %account.id,
            points,
            activity = %request.activity,
            ledger = credit.ledger.as_str(),
            new_balance = applied.new_balance,
            unlocked = unlocked_badges.len(),
            "participation points awarded"
        );

        Ok(AwardOutcome {
            user_id: account.id,
            points_awarded: points,
            new_balance: applied.new_balance,
            entry_id: applied.entry.id,
            unlocked_badges,
            tier: AwardTier::for_balance(applied.new_balance),
        })
    }
}

#[async_trait]
impl<A, L> PointsCommand for PointsService<A, L>
where
    A: AccountRepository,
    L: PointsLedger,
{
    async fn award(&self, request: &AwardRequest) -> Result<AwardOutcome, Error> {
        let account = self.load_account(&request.user_id).await?;
        self.credit(&account, request).await
    }

    async fn award_direct(&self, request: &DirectAwardRequest) -> Result<AwardOutcome, Error> {
        let user_id = request.award.user_id;
        let account = match self.accounts.find_by_id(&user_id).await? {
            Some(account) => account,
            None => {
                let Some(details) = request.new_account.as_ref() else {
                    return Err(Error::not_found(
                        "account not found; email and display name are required to create it",
                    ));
                };
                self.create_recruit(user_id, details).await?
            }
        };
        self.credit(&account, &request.award).await
    }

    async fn record_activity(&self, report: &ActivityReport) -> Result<AwardOutcome, Error> {
        let Some(entry) = lookup_activity(&report.activity) else {
            let allowed: Vec<&str> = ACTIVITY_CATALOGUE
                .iter()
                .filter(|activity| activity.self_reportable)
                .map(|activity| activity.slug)
                .collect();
            return Err(Error::invalid_request("unknown activity")
                .with_details(json!({ "field": "activity", "allowed": allowed })));
        };
        if !entry.self_reportable {
            return Err(Error::forbidden("activity can only be awarded by an admin")
                .with_details(json!({ "activity": entry.slug })));
        }

        let request = AwardRequest {
            user_id: report.user_id,
            points: PointAmount::new(entry.points).map_err(validation_error)?,
            activity: ActivityType::new(entry.slug).map_err(validation_error)?,
            description: ActivityDescription::parse(report.description.as_deref())
                .map_err(validation_error)?,
        };
        self.award(&request).await
    }

    async fn reconcile(&self, user_id: &UserId) -> Result<BalanceAudit, Error> {
        let audit = self
            .ledger
            .reconcile(user_id)
            .await?
            .ok_or_else(|| Error::not_found("account not found"))?;
        if audit.is_consistent() {
            info!(%user_id, balance = audit.ledger_total, "balance already matches ledger");
        } else {
            warn!(
                %user_id,
                recorded = audit.recorded_balance,
                ledger_total = audit.ledger_total,
                "balance reset to ledger total"
            );
        }
        self.events
            .publish(EngagementEvent::BalanceReconciled { user_id: *user_id });
        Ok(audit)
    }
}

#[async_trait]
impl<A, L> PointsQuery for PointsService<A, L>
where
    A: AccountRepository,
    L: PointsLedger,
{
    async fn audit(&self, user_id: &UserId) -> Result<BalanceAudit, Error> {
        self.ledger
            .audit(user_id)
            .await?
            .ok_or_else(|| Error::not_found("account not found"))
    }

    async fn history(
        &self,
        user_id: &UserId,
        page: &PageRequest<HistoryKey>,
    ) -> Result<Page<ActivityEntry>, Error> {
        let rows = self.ledger.history(user_id, page).await?;
        Page::from_probe(rows, page.limit(), ActivityEntry::history_key)
            .map_err(|err| Error::internal(format!("failed to encode history cursor: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockAccountRepository, MockEngagementEventBus, MockPointsLedger};
    use crate::domain::points::CreditApplied;
    use crate::domain::{DisplayName, Email, ErrorCode, LedgerKind, VolunteerStatus};
    use chrono::{DateTime, TimeZone, Utc};
    use mockable::MockClock;
    use rstest::{fixture, rstest};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 2, 18, 30, 0)
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
            email: Email::new("cadet@example.org").expect("email"),
            display_name: DisplayName::new("Cadet Casey").expect("name"),
            role,
            organisation: None,
            email_confirmed_at: Some(fixed_now()),
            participation_count: balance,
            created_at: fixed_now(),
            updated_at: fixed_now(),
        }
    }

    fn award_request(user_id: UserId, points: u32, activity: &str) -> AwardRequest {
        AwardRequest {
            user_id,
            points: PointAmount::new(points).expect("points"),
            activity: ActivityType::new(activity).expect("activity"),
            description: None,
        }
    }

    /// First entry of its activity, applied on top of `balance`.
    fn applied(credit: &LedgerCredit, balance: u64) -> CreditApplied {
        CreditApplied {
            new_balance: balance + u64::from(credit.points.get()),
            entry: ActivityEntry {
                id: credit.entry_id,
                user_id: credit.user_id,
                points: credit.points.get(),
                activity: credit.activity.to_string(),
                description: None,
                ledger: credit.ledger,
                created_at: credit.recorded_at,
            },
            activity_counts: [(credit.activity.to_string(), 1)].into_iter().collect(),
        }
    }

    /// Ledger that applies credits on top of `balance`.
    fn crediting_ledger(balance: u64) -> MockPointsLedger {
        let mut ledger = MockPointsLedger::new();
        ledger
            .expect_apply_credit()
            .returning(move |credit| Ok(Some(applied(credit, balance))));
        ledger
    }

    fn quiet_events() -> Arc<dyn EngagementEventBus> {
        let mut events = MockEngagementEventBus::new();
        events.expect_publish().returning(|_| ());
        Arc::new(events)
    }

    #[rstest]
    #[tokio::test]
    async fn award_credits_balance_and_reports_unlocks(clock: Arc<dyn Clock>) {
        let stored = account(Role::Recruit, 995);
        let user_id = stored.id;
        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        let mut events = MockEngagementEventBus::new();
        events
            .expect_publish()
            .withf(move |event| {
                *event
                    == EngagementEvent::PointsAwarded {
                        user_id,
                        new_balance: 1_015,
                    }
            })
            .times(1)
            .returning(|_| ());
        let service = PointsService::new(
            Arc::new(accounts),
            Arc::new(crediting_ledger(995)),
            Arc::new(events),
            clock,
        );

        let outcome = service
            .award(&award_request(user_id, 20, "trivia_completed"))
            .await
            .expect("award");

        assert_eq!(outcome.new_balance, 1_015);
        assert_eq!(outcome.points_awarded, 20);
        assert_eq!(outcome.tier, Some(AwardTier::Bronze));
        assert!(outcome.unlocked_badges.contains(&"dedicated_candidate"));
        assert!(outcome.unlocked_badges.contains(&"trivia_rookie"));
    }

    #[rstest]
    #[case(Role::Recruit, LedgerKind::Recruit)]
    #[case(Role::VolunteerRecruiter(VolunteerStatus::Approved), LedgerKind::Volunteer)]
    #[case(Role::Admin, LedgerKind::Generic)]
    #[tokio::test]
    async fn role_selects_the_ledger(
        clock: Arc<dyn Clock>,
        #[case] role: Role,
        #[case] expected: LedgerKind,
    ) {
        let stored = account(role, 0);
        let user_id = stored.id;
        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        let mut ledger = MockPointsLedger::new();
        ledger
            .expect_apply_credit()
            .withf(move |credit| credit.ledger == expected && credit.recorded_at == fixed_now())
            .times(1)
            .returning(|credit| Ok(Some(applied(credit, 0))));
        let service =
            PointsService::new(Arc::new(accounts), Arc::new(ledger), quiet_events(), clock);

        service
            .award(&award_request(user_id, 5, "daily_check_in"))
            .await
            .expect("award");
    }

    #[rstest]
    #[case(VolunteerStatus::Pending)]
    #[case(VolunteerStatus::Rejected)]
    #[tokio::test]
    async fn unapproved_volunteers_cannot_earn(
        clock: Arc<dyn Clock>,
        #[case] status: VolunteerStatus,
    ) {
        let stored = account(Role::VolunteerRecruiter(status), 0);
        let user_id = stored.id;
        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        let mut ledger = MockPointsLedger::new();
        ledger.expect_apply_credit().never();
        let service =
            PointsService::new(Arc::new(accounts), Arc::new(ledger), quiet_events(), clock);

        let err = service
            .award(&award_request(user_id, 10, "video_watched"))
            .await
            .expect_err("forbidden");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[rstest]
    #[tokio::test]
    async fn award_to_unknown_account_is_not_found(clock: Arc<dyn Clock>) {
        let mut accounts = MockAccountRepository::new();
        accounts.expect_find_by_id().returning(|_| Ok(None));
        let service = PointsService::new(
            Arc::new(accounts),
            Arc::new(MockPointsLedger::new()),
            quiet_events(),
            clock,
        );
        let err = service
            .award(&award_request(UserId::random(), 10, "video_watched"))
            .await
            .expect_err("missing");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn direct_award_creates_missing_recruit(clock: Arc<dyn Clock>) {
        let user_id = UserId::random();
        let mut accounts = MockAccountRepository::new();
        accounts.expect_find_by_id().returning(|_| Ok(None));
        accounts
            .expect_create()
            .withf(move |new| new.id == user_id && new.role == Role::Recruit)
            .times(1)
            .returning(|new| {
                let mut created = account(new.role, 0);
                created.id = new.id;
                created.email_confirmed_at = None;
                Ok(created)
            });
        let service = PointsService::new(
            Arc::new(accounts),
            Arc::new(crediting_ledger(0)),
            quiet_events(),
            clock,
        );

        let outcome = service
            .award_direct(&DirectAwardRequest {
                award: award_request(user_id, 500, "application_submission"),
                new_account: Some(NewRecruitDetails {
                    email: Email::new("new.recruit@example.org").expect("email"),
                    display_name: DisplayName::new("New Recruit").expect("name"),
                }),
            })
            .await
            .expect("award");

        assert_eq!(outcome.user_id, user_id);
        assert_eq!(outcome.new_balance, 500);
        assert!(outcome.unlocked_badges.contains(&"applicant"));
    }

    #[rstest]
    #[tokio::test]
    async fn direct_award_credits_a_recruit_created_concurrently(clock: Arc<dyn Clock>) {
        let existing = account(Role::Recruit, 120);
        let user_id = existing.id;
        let looked_up = Arc::new(AtomicBool::new(false));
        let mut accounts = MockAccountRepository::new();
        accounts.expect_find_by_id().times(2).returning(move |_| {
            if looked_up.swap(true, Ordering::SeqCst) {
                Ok(Some(existing.clone()))
            } else {
                Ok(None)
            }
        });
        accounts
            .expect_create()
            .times(1)
            .returning(|new| Err(AccountRepositoryError::duplicate_id(new.id.to_string())));
        let service = PointsService::new(
            Arc::new(accounts),
            Arc::new(crediting_ledger(120)),
            quiet_events(),
            clock,
        );

        let outcome = service
            .award_direct(&DirectAwardRequest {
                award: award_request(user_id, 500, "application_submission"),
                new_account: Some(NewRecruitDetails {
                    email: Email::new("walk-in@example.org").expect("email"),
                    display_name: DisplayName::new("Walk In").expect("name"),
                }),
            })
            .await
            .expect("credited existing account");

        assert_eq!(outcome.user_id, user_id);
        assert_eq!(outcome.new_balance, 620);
    }

    #[rstest]
    #[tokio::test]
    async fn direct_award_without_details_is_not_found(clock: Arc<dyn Clock>) {
        let mut accounts = MockAccountRepository::new();
        accounts.expect_find_by_id().returning(|_| Ok(None));
        accounts.expect_create().never();
        let service = PointsService::new(
            Arc::new(accounts),
            Arc::new(MockPointsLedger::new()),
            quiet_events(),
            clock,
        );
        let err = service
            .award_direct(&DirectAwardRequest {
                award: award_request(UserId::random(), 500, "application_submission"),
                new_account: None,
            })
            .await
            .expect_err("missing");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn direct_award_with_taken_email_conflicts(clock: Arc<dyn Clock>) {
        let mut accounts = MockAccountRepository::new();
        accounts.expect_find_by_id().returning(|_| Ok(None));
        accounts.expect_create().returning(|new| {
            Err(AccountRepositoryError::duplicate_email(new.email.to_string()))
        });
        let service = PointsService::new(
            Arc::new(accounts),
            Arc::new(MockPointsLedger::new()),
            quiet_events(),
            clock,
        );
        let err = service
            .award_direct(&DirectAwardRequest {
                award: award_request(UserId::random(), 500, "application_submission"),
                new_account: Some(NewRecruitDetails {
                    email: Email::new("taken@example.org").expect("email"),
                    display_name: DisplayName::new("Taken").expect("name"),
                }),
            })
            .await
            .expect_err("conflict");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[rstest]
    #[case("made_up_activity", ErrorCode::InvalidRequest)]
    #[case("application_submission", ErrorCode::Forbidden)]
    #[tokio::test]
    async fn self_reports_are_limited_to_the_catalogue(
        clock: Arc<dyn Clock>,
        #[case] activity: &str,
        #[case] code: ErrorCode,
    ) {
        let mut accounts = MockAccountRepository::new();
        accounts.expect_find_by_id().never();
        let service = PointsService::new(
            Arc::new(accounts),
            Arc::new(MockPointsLedger::new()),
            quiet_events(),
            clock,
        );
        let err = service
            .record_activity(&ActivityReport {
                user_id: UserId::random(),
                activity: activity.to_owned(),
                description: None,
            })
            .await
            .expect_err("rejected");
        assert_eq!(err.code(), code);
    }

    #[rstest]
    #[tokio::test]
    async fn self_reported_activity_uses_catalogue_points(clock: Arc<dyn Clock>) {
        let stored = account(Role::Recruit, 100);
        let user_id = stored.id;
        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        let service = PointsService::new(
            Arc::new(accounts),
            Arc::new(crediting_ledger(100)),
            quiet_events(),
            clock,
        );
        let outcome = service
            .record_activity(&ActivityReport {
                user_id,
                activity: "event_attended".to_owned(),
                description: Some("Open day at the station".to_owned()),
            })
            .await
            .expect("recorded");
        assert_eq!(outcome.points_awarded, 50);
        assert_eq!(outcome.new_balance, 150);
    }

    #[rstest]
    #[tokio::test]
    async fn reconcile_returns_prior_audit_and_notifies(clock: Arc<dyn Clock>) {
        let user_id = UserId::random();
        let mut ledger = MockPointsLedger::new();
        ledger.expect_reconcile().returning(move |id| {
            Ok(Some(BalanceAudit {
                user_id: *id,
                recorded_balance: 130,
                ledger_total: 100,
                entry_count: 4,
            }))
        });
        let mut events = MockEngagementEventBus::new();
        events
            .expect_publish()
            .withf(move |event| *event == EngagementEvent::BalanceReconciled { user_id })
            .times(1)
            .returning(|_| ());
        let service = PointsService::new(
            Arc::new(MockAccountRepository::new()),
            Arc::new(ledger),
            Arc::new(events),
            clock,
        );

        let audit = service.reconcile(&user_id).await.expect("audit");
        assert_eq!(audit.drift(), 30);
    }

    #[rstest]
    #[tokio::test]
    async fn history_pages_newest_first(clock: Arc<dyn Clock>) {
        let user_id = UserId::random();
        let entries: Vec<ActivityEntry> = (0..2)
            .map(|minutes| ActivityEntry {
                id: Uuid::new_v4(),
                user_id,
                points: 5,
                activity: "daily_check_in".to_owned(),
                description: None,
                ledger: LedgerKind::Recruit,
                created_at: fixed_now() - chrono::Duration::minutes(minutes),
            })
            .collect();
        let mut ledger = MockPointsLedger::new();
        ledger
            .expect_history()
            .returning(move |_, _| Ok(entries.clone()));
        let service = PointsService::new(
            Arc::new(MockAccountRepository::new()),
            Arc::new(ledger),
            quiet_events(),
            clock,
        );

        let page = service
            .history(&user_id, &PageRequest::first(1))
            .await
            .expect("history");
        assert_eq!(page.items().len(), 1);
        assert!(page.next_cursor().is_some());
    }
}
