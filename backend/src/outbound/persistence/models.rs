//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types validate
//! stored values and report corrupt rows as query errors.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Uuid as SqlUuid, Varchar};
use uuid::Uuid;

use super::schema::{email_tokens, point_activity_log, user_accounts};
use crate::domain::points::ActivityEntry;
use crate::domain::ports::{EmailTokenRecord, LeaderboardRow, TokenPurpose};
use crate::domain::{DisplayName, Email, LedgerKind, Role, UserAccount, UserId};

/// Row read from `user_accounts`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserAccountRow {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub volunteer_status: Option<String>,
    pub organisation: Option<String>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub participation_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserAccountRow> for UserAccount {
    type Error = String;

    fn try_from(row: UserAccountRow) -> Result<Self, Self::Error> {
        let role = Role::from_parts(&row.role, row.volunteer_status.as_deref())
            .map_err(|err| format!("account {}: {err}", row.id))?;
        Ok(Self {
            id: UserId::from_uuid(row.id),
            email: Email::new(&row.email).map_err(|err| format!("account {}: {err}", row.id))?,
            display_name: DisplayName::new(&row.display_name)
                .map_err(|err| format!("account {}: {err}", row.id))?,
            role,
            organisation: row.organisation,
            email_confirmed_at: row.email_confirmed_at,
            participation_count: non_negative(row.participation_count)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Insertable account.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_accounts)]
pub(crate) struct NewUserAccountRow<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub display_name: &'a str,
    pub role: &'a str,
    pub volunteer_status: Option<&'a str>,
    pub organisation: Option<&'a str>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

/// Row read from `point_activity_log`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = point_activity_log)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ActivityLogRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub points: i32,
    pub activity: String,
    pub description: Option<String>,
    pub ledger: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ActivityLogRow> for ActivityEntry {
    type Error = String;

    fn try_from(row: ActivityLogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: UserId::from_uuid(row.user_id),
            points: u32::try_from(row.points)
                .map_err(|_| format!("log entry {} has negative points", row.id))?,
            activity: row.activity,
            description: row.description,
            ledger: row.ledger.parse::<LedgerKind>()?,
            created_at: row.created_at,
        })
    }
}

/// Insertable log entry.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = point_activity_log)]
pub(crate) struct NewActivityLogRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub points: i32,
    pub activity: &'a str,
    pub description: Option<&'a str>,
    pub ledger: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Row read from `email_tokens`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = email_tokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EmailTokenRow {
    pub digest: String,
    pub user_id: Uuid,
    pub purpose: String,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<EmailTokenRow> for EmailTokenRecord {
    type Error = String;

    fn try_from(row: EmailTokenRow) -> Result<Self, Self::Error> {
        let purpose = TokenPurpose::parse(&row.purpose)
            .ok_or_else(|| format!("unknown token purpose '{}'", row.purpose))?;
        Ok(Self {
            digest: row.digest,
            user_id: UserId::from_uuid(row.user_id),
            purpose,
            expires_at: row.expires_at,
        })
    }
}

/// Insertable token digest.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = email_tokens)]
pub(crate) struct NewEmailTokenRow<'a> {
    pub digest: &'a str,
    pub user_id: Uuid,
    pub purpose: &'a str,
    pub expires_at: DateTime<Utc>,
}

/// Ranked row produced by the leaderboard window query.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct RankedAccountRow {
    #[diesel(sql_type = SqlUuid)]
    pub id: Uuid,
    #[diesel(sql_type = Varchar)]
    pub display_name: String,
    #[diesel(sql_type = BigInt)]
    pub participation_count: i64,
    #[diesel(sql_type = BigInt)]
    pub rank: i64,
}

impl TryFrom<RankedAccountRow> for LeaderboardRow {
    type Error = String;

    fn try_from(row: RankedAccountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            rank: non_negative(row.rank)?,
            user_id: UserId::from_uuid(row.id),
            display_name: row.display_name,
            balance: non_negative(row.participation_count)?,
        })
    }
}

/// Convert a stored count to `u64`.
pub(crate) fn non_negative(value: i64) -> Result<u64, String> {
    u64::try_from(value).map_err(|_| format!("stored count {value} is negative"))
}

/// Convert a domain count to the `BIGINT` column type.
pub(crate) fn to_bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
