//! PostgreSQL-backed `PointsLedger` using Diesel.
//!
//! Credits run `UPDATE … SET participation_count = participation_count + n`
//! and the log insert inside one transaction; there is no read-modify-write.

use async_trait::async_trait;
use diesel::dsl::{count_star, sum};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Nullable, Uuid as SqlUuid};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use pagination::PageRequest;
use uuid::Uuid;

use crate::domain::engagement::LeaderboardKey;
use crate::domain::points::{
    ActivityCounts, ActivityEntry, BalanceAudit, CreditApplied, HistoryKey, LedgerCredit,
};
use crate::domain::ports::{LeaderboardRow, PointsLedger, PointsLedgerError};
use crate::domain::{RoleKind, UserId};

use super::error_mapping::{classify, map_basic, pool_message};
use super::models::{
    ActivityLogRow, NewActivityLogRow, RankedAccountRow, non_negative, to_bigint,
};
use super::pool::DbPool;
use super::schema::{point_activity_log, user_accounts};

const LEADERBOARD_SQL: &str = "\
SELECT id, display_name, participation_count, rank FROM (
    SELECT id, display_name, participation_count,
           RANK() OVER (ORDER BY participation_count DESC) AS rank
    FROM user_accounts
    WHERE role <> 'admin'
) ranked
WHERE ($1::bigint IS NULL
       OR participation_count < $1
       OR (participation_count = $1 AND id > $2))
ORDER BY participation_count DESC, id ASC
LIMIT $3";

/// Diesel-backed participation ledger.
#[derive(Clone)]
pub struct DieselPointsLedger {
    pool: DbPool,
}

impl DieselPointsLedger {
    /// Create a ledger over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> PointsLedgerError {
    map_basic(
        classify(error),
        PointsLedgerError::connection,
        PointsLedgerError::query,
    )
}

fn to_entry(row: ActivityLogRow) -> Result<ActivityEntry, PointsLedgerError> {
    ActivityEntry::try_from(row).map_err(PointsLedgerError::query)
}

/// Balance, log total, and entry count, read under a row lock.
async fn audit_locked(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
) -> Result<Option<BalanceAudit>, diesel::result::Error> {
    let Some(balance) = user_accounts::table
        .find(user_id)
        .select(user_accounts::participation_count)
        .for_update()
        .get_result::<i64>(conn)
        .await
        .optional()?
    else {
        return Ok(None);
    };
    let (total, entries) = point_activity_log::table
        .filter(point_activity_log::user_id.eq(user_id))
        .select((sum(point_activity_log::points), count_star()))
        .first::<(Option<i64>, i64)>(conn)
        .await?;
    Ok(Some(BalanceAudit {
        user_id: UserId::from_uuid(user_id),
        recorded_balance: u64::try_from(balance).unwrap_or(0),
        ledger_total: u64::try_from(total.unwrap_or(0)).unwrap_or(0),
        entry_count: u64::try_from(entries).unwrap_or(0),
    }))
}

/// Entries per activity slug for one account.
async fn count_rows(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
) -> Result<Vec<(String, i64)>, diesel::result::Error> {
    point_activity_log::table
        .filter(point_activity_log::user_id.eq(user_id))
        .group_by(point_activity_log::activity)
        .select((point_activity_log::activity, count_star()))
        .load(conn)
        .await
}

fn to_counts(rows: Vec<(String, i64)>) -> Result<ActivityCounts, PointsLedgerError> {
    rows.into_iter()
        .map(|(activity, count)| {
            non_negative(count)
                .map(|count| (activity, count))
                .map_err(PointsLedgerError::query)
        })
        .collect()
}

#[async_trait]
impl PointsLedger for DieselPointsLedger {
    async fn apply_credit(
        &self,
        credit: &LedgerCredit,
    ) -> Result<Option<CreditApplied>, PointsLedgerError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| PointsLedgerError::connection(pool_message(err)))?;
        let user_id = *credit.user_id.as_uuid();
        let points = i32::try_from(credit.points.get())
            .map_err(|_| PointsLedgerError::query("credit exceeds column range"))?;
        let row = NewActivityLogRow {
            id: credit.entry_id,
            user_id,
            points,
            activity: credit.activity.as_ref(),
            description: credit.description.as_ref().map(AsRef::as_ref),
            ledger: credit.ledger.as_str(),
            created_at: credit.recorded_at,
        };

        let applied = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    let Some(new_balance) = diesel::update(user_accounts::table.find(user_id))
                        .set((
                            user_accounts::participation_count
                                .eq(user_accounts::participation_count + i64::from(points)),
                            user_accounts::updated_at.eq(row.created_at),
                        ))
                        .returning(user_accounts::participation_count)
                        .get_result::<i64>(conn)
                        .await
                        .optional()?
                    else {
                        return Ok(None);
                    };
                    let entry = diesel::insert_into(point_activity_log::table)
                        .values(&row)
                        .returning(ActivityLogRow::as_returning())
                        .get_result(conn)
                        .await?;
                    let counts = count_rows(conn, user_id).await?;
                    Ok(Some((new_balance, entry, counts)))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        let Some((new_balance, entry, counts)) = applied else {
            return Ok(None);
        };
        Ok(Some(CreditApplied {
            new_balance: non_negative(new_balance).map_err(PointsLedgerError::query)?,
            entry: to_entry(entry)?,
            activity_counts: to_counts(counts)?,
        }))
    }

    async fn activity_counts(&self, user_id: &UserId) -> Result<ActivityCounts, PointsLedgerError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| PointsLedgerError::connection(pool_message(err)))?;
        let rows = count_rows(&mut conn, *user_id.as_uuid())
            .await
            .map_err(map_diesel_error)?;
        to_counts(rows)
    }

    async fn history(
        &self,
        user_id: &UserId,
        page: &PageRequest<HistoryKey>,
    ) -> Result<Vec<ActivityEntry>, PointsLedgerError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| PointsLedgerError::connection(pool_message(err)))?;
        let limit = i64::try_from(page.probe_limit()).unwrap_or(i64::MAX);
        let mut query = point_activity_log::table
            .filter(point_activity_log::user_id.eq(*user_id.as_uuid()))
            .select(ActivityLogRow::as_select())
            .order((
                point_activity_log::created_at.desc(),
                point_activity_log::id.desc(),
            ))
            .limit(limit)
            .into_boxed();
        if let Some((created_at, id)) = page.after_key() {
            query = query.filter(
                point_activity_log::created_at
                    .lt(*created_at)
                    .or(point_activity_log::created_at
                        .eq(*created_at)
                        .and(point_activity_log::id.lt(*id))),
            );
        }
        let rows = query.load(&mut conn).await.map_err(map_diesel_error)?;
        rows.into_iter().map(to_entry).collect()
    }

    async fn audit(&self, user_id: &UserId) -> Result<Option<BalanceAudit>, PointsLedgerError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| PointsLedgerError::connection(pool_message(err)))?;
        let user_id = *user_id.as_uuid();
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move { audit_locked(conn, user_id).await }.scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn reconcile(&self, user_id: &UserId) -> Result<Option<BalanceAudit>, PointsLedgerError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| PointsLedgerError::connection(pool_message(err)))?;
        let user_id = *user_id.as_uuid();
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                let Some(audit) = audit_locked(conn, user_id).await? else {
                    return Ok(None);
                };
                if !audit.is_consistent() {
                    diesel::update(user_accounts::table.find(user_id))
                        .set((
                            user_accounts::participation_count
                                .eq(to_bigint(audit.ledger_total)),
                            user_accounts::updated_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)
                        .await?;
                }
                Ok(Some(audit))
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn leaderboard(
        &self,
        page: &PageRequest<LeaderboardKey>,
    ) -> Result<Vec<LeaderboardRow>, PointsLedgerError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| PointsLedgerError::connection(pool_message(err)))?;
        let (after_balance, after_id) = match page.after_key() {
            Some((balance, id)) => (Some(to_bigint(*balance)), *id.as_uuid()),
            None => (None, Uuid::nil()),
        };
        let limit = i64::try_from(page.probe_limit()).unwrap_or(i64::MAX);
        let rows: Vec<RankedAccountRow> = diesel::sql_query(LEADERBOARD_SQL)
            .bind::<Nullable<BigInt>, _>(after_balance)
            .bind::<SqlUuid, _>(after_id)
            .bind::<BigInt, _>(limit)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(|row| LeaderboardRow::try_from(row).map_err(PointsLedgerError::query))
            .collect()
    }

    async fn rank_of(&self, user_id: &UserId) -> Result<Option<u64>, PointsLedgerError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| PointsLedgerError::connection(pool_message(err)))?;
        let Some((balance, role)) = user_accounts::table
            .find(user_id.as_uuid())
            .select((user_accounts::participation_count, user_accounts::role))
            .first::<(i64, String)>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
        else {
            return Ok(None);
        };
        if role == RoleKind::Admin.as_str() {
            return Ok(None);
        }
        let ahead: i64 = user_accounts::table
            .filter(user_accounts::role.ne(RoleKind::Admin.as_str()))
            .filter(user_accounts::participation_count.gt(balance))
            .select(count_star())
            .first(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        non_negative(ahead)
            .map(|ahead| Some(ahead + 1))
            .map_err(PointsLedgerError::query)
    }
}
