//! PostgreSQL-backed `AccountRepository` using Diesel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::PageRequest;

use crate::domain::ports::{AccountKey, AccountRepository, AccountRepositoryError};
use crate::domain::{Email, NewAccount, RoleKind, UserAccount, UserId, VolunteerStatus};

use super::error_mapping::{DieselFailure, classify, map_basic, pool_message};
use super::models::{NewUserAccountRow, UserAccountRow};
use super::pool::DbPool;
use super::schema::user_accounts;

const EMAIL_UNIQUE_CONSTRAINT: &str = "user_accounts_email_key";
const PRIMARY_KEY_CONSTRAINT: &str = "user_accounts_pkey";

/// Diesel-backed account store.
#[derive(Clone)]
pub struct DieselAccountRepository {
    pool: DbPool,
}

impl DieselAccountRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> AccountRepositoryError {
    map_basic(
        classify(error),
        AccountRepositoryError::connection,
        AccountRepositoryError::query,
    )
}

/// Map an insert failure, naming which uniqueness rule rejected the row.
fn map_create_error(failure: DieselFailure, account: &NewAccount) -> AccountRepositoryError {
    match failure {
        DieselFailure::UniqueViolation { constraint } => match constraint.as_deref() {
            Some(EMAIL_UNIQUE_CONSTRAINT) => {
                AccountRepositoryError::duplicate_email(account.email.as_ref())
            }
            Some(PRIMARY_KEY_CONSTRAINT) => {
                AccountRepositoryError::duplicate_id(account.id.to_string())
            }
            other => AccountRepositoryError::query(format!(
                "unique constraint violated: {}",
                other.unwrap_or("unknown")
            )),
        },
        failure => map_basic(
            failure,
            AccountRepositoryError::connection,
            AccountRepositoryError::query,
        ),
    }
}

fn to_account(row: UserAccountRow) -> Result<UserAccount, AccountRepositoryError> {
    UserAccount::try_from(row).map_err(AccountRepositoryError::query)
}

fn to_optional_account(
    row: Option<UserAccountRow>,
) -> Result<Option<UserAccount>, AccountRepositoryError> {
    row.map(to_account).transpose()
}

#[async_trait]
impl AccountRepository for DieselAccountRepository {
    async fn create(&self, account: &NewAccount) -> Result<UserAccount, AccountRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| AccountRepositoryError::connection(pool_message(err)))?;
        let row = NewUserAccountRow {
            id: *account.id.as_uuid(),
            email: account.email.as_ref(),
            display_name: account.display_name.as_ref(),
            role: account.role.kind().as_str(),
            volunteer_status: account.role.volunteer_status().map(VolunteerStatus::as_str),
            organisation: account.organisation.as_deref(),
            email_confirmed_at: account.email_confirmed_at,
        };
        let inserted = diesel::insert_into(user_accounts::table)
            .values(&row)
            .returning(UserAccountRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| map_create_error(classify(err), account))?;
        to_account(inserted)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, AccountRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| AccountRepositoryError::connection(pool_message(err)))?;
        let row = user_accounts::table
            .find(id.as_uuid())
            .select(UserAccountRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        to_optional_account(row)
    }

    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserAccount>, AccountRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| AccountRepositoryError::connection(pool_message(err)))?;
        let row = user_accounts::table
            .filter(user_accounts::email.eq(email.as_ref()))
            .select(UserAccountRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        to_optional_account(row)
    }

    async fn list(
        &self,
        page: &PageRequest<AccountKey>,
    ) -> Result<Vec<UserAccount>, AccountRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| AccountRepositoryError::connection(pool_message(err)))?;
        let limit = i64::try_from(page.probe_limit()).unwrap_or(i64::MAX);
        let mut query = user_accounts::table
            .select(UserAccountRow::as_select())
            .order((user_accounts::created_at.desc(), user_accounts::id.desc()))
            .limit(limit)
            .into_boxed();
        if let Some((created_at, id)) = page.after_key() {
            query = query.filter(
                user_accounts::created_at.lt(*created_at).or(user_accounts::created_at
                    .eq(*created_at)
                    .and(user_accounts::id.lt(*id))),
            );
        }
        let rows = query.load(&mut conn).await.map_err(map_diesel_error)?;
        rows.into_iter().map(to_account).collect()
    }

    async fn mark_email_confirmed(
        &self,
        id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<UserAccount>, AccountRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| AccountRepositoryError::connection(pool_message(err)))?;
        diesel::update(
            user_accounts::table
                .filter(user_accounts::id.eq(id.as_uuid()))
                .filter(user_accounts::email_confirmed_at.is_null()),
        )
        .set((
            user_accounts::email_confirmed_at.eq(Some(at)),
            user_accounts::updated_at.eq(at),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        let row = user_accounts::table
            .find(id.as_uuid())
            .select(UserAccountRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        to_optional_account(row)
    }

    async fn set_volunteer_status(
        &self,
        id: &UserId,
        status: VolunteerStatus,
    ) -> Result<Option<UserAccount>, AccountRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| AccountRepositoryError::connection(pool_message(err)))?;
        let row = diesel::update(
            user_accounts::table
                .filter(user_accounts::id.eq(id.as_uuid()))
                .filter(user_accounts::role.eq(RoleKind::VolunteerRecruiter.as_str())),
        )
        .set((
            user_accounts::volunteer_status.eq(Some(status.as_str())),
            user_accounts::updated_at.eq(diesel::dsl::now),
        ))
        .returning(UserAccountRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;
        to_optional_account(row)
    }

    async fn delete(&self, id: &UserId) -> Result<bool, AccountRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| AccountRepositoryError::connection(pool_message(err)))?;
        let deleted = diesel::delete(user_accounts::table.find(id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}
