//! PostgreSQL-backed `EmailTokenRepository` using Diesel.
//!
//! `consume` deletes the row and returns it in one statement, so a token can
//! be redeemed at most once even under concurrent requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{EmailTokenRecord, EmailTokenRepository, EmailTokenRepositoryError};

use super::error_mapping::{classify, map_basic, pool_message};
use super::models::{EmailTokenRow, NewEmailTokenRow};
use super::pool::DbPool;
use super::schema::email_tokens;

/// Diesel-backed token store.
#[derive(Clone)]
pub struct DieselEmailTokenRepository {
    pool: DbPool,
}

impl DieselEmailTokenRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> EmailTokenRepositoryError {
    map_basic(
        classify(error),
        EmailTokenRepositoryError::connection,
        EmailTokenRepositoryError::query,
    )
}

#[async_trait]
impl EmailTokenRepository for DieselEmailTokenRepository {
    async fn store(&self, record: &EmailTokenRecord) -> Result<(), EmailTokenRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| EmailTokenRepositoryError::connection(pool_message(err)))?;
        diesel::insert_into(email_tokens::table)
            .values(&NewEmailTokenRow {
                digest: &record.digest,
                user_id: *record.user_id.as_uuid(),
                purpose: record.purpose.as_str(),
                expires_at: record.expires_at,
            })
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn consume(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<EmailTokenRecord>, EmailTokenRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| EmailTokenRepositoryError::connection(pool_message(err)))?;
        let row = diesel::delete(email_tokens::table.find(digest))
            .returning(EmailTokenRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        let Some(row) = row else {
            return Ok(None);
        };
        if row.expires_at <= now {
            return Ok(None);
        }
        EmailTokenRecord::try_from(row)
            .map(Some)
            .map_err(EmailTokenRepositoryError::query)
    }
}
