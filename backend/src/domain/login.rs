//! Sign-in: redeeming emailed tokens and the admin recovery login.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};
use zeroize::Zeroizing;

use super::ports::{AccountRepository, EmailTokenRepository, LoginService};
use super::{
    AuthenticatedUser, DisplayName, Email, Error, NewAccount, RecoveryCredentials, Role, RoleKind,
    SignInToken, UserId, constant_time_eq,
};

const ADMIN_DISPLAY_NAME: &str = "Administrator";

/// Configured break-glass admin identity.
#[derive(Clone)]
pub struct AdminRecovery {
    email: Email,
    code: Zeroizing<String>,
}

impl AdminRecovery {
    /// Pair the admin email with its recovery code.
    pub fn new(email: Email, code: impl Into<String>) -> Self {
        Self {
            email,
            code: Zeroizing::new(code.into()),
        }
    }

    fn matches(&self, credentials: &RecoveryCredentials) -> bool {
        let email_ok = constant_time_eq(
            self.email.as_ref().as_bytes(),
            credentials.email().as_ref().as_bytes(),
        );
        let code_ok = constant_time_eq(self.code.as_bytes(), credentials.recovery_code().as_bytes());
        email_ok & code_ok
    }
}

impl std::fmt::Debug for AdminRecovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminRecovery")
            .field("email", &self.email)
            .field("code", &"<redacted>")
            .finish()
    }
}

/// Login service over the account and token stores.
#[derive(Clone)]
pub struct AccountLoginService<A, T> {
    accounts: Arc<A>,
    tokens: Arc<T>,
    clock: Arc<dyn Clock>,
    admin: Option<AdminRecovery>,
}

impl<A, T> AccountLoginService<A, T> {
    /// Create the service; without `admin` the recovery login is disabled.
    pub fn new(
        accounts: Arc<A>,
        tokens: Arc<T>,
        clock: Arc<dyn Clock>,
        admin: Option<AdminRecovery>,
    ) -> Self {
        Self {
            accounts,
            tokens,
            clock,
            admin,
        }
    }
}

#[async_trait]
impl<A, T> LoginService for AccountLoginService<A, T>
where
    A: AccountRepository,
    T: EmailTokenRepository,
{
    async fn redeem_token(&self, token: &SignInToken) -> Result<AuthenticatedUser, Error> {
        let now = self.clock.utc();
        let record = self
            .tokens
            .consume(&token.digest(), now)
            .await?
            .ok_or_else(|| Error::unauthorized("token is invalid or has expired"))?;
        let account = self
            .accounts
            .mark_email_confirmed(&record.user_id, now)
            .await?
            .ok_or_else(|| Error::unauthorized("token is invalid or has expired"))?;
        info!(user_id = %account.id, purpose = record.purpose.as_str(), "token redeemed");
        Ok(AuthenticatedUser {
            user_id: account.id,
            role: account.role.kind(),
        })
    }

    async fn recover_admin(
        &self,
        credentials: &RecoveryCredentials,
    ) -> Result<AuthenticatedUser, Error> {
        let Some(admin) = self.admin.as_ref() else {
            return Err(Error::unauthorized("invalid credentials"));
        };
        if !admin.matches(credentials) {
            warn!("admin recovery login rejected");
            return Err(Error::unauthorized("invalid credentials"));
        }

        let account = match self.accounts.find_by_email(credentials.email()).await? {
            Some(account) if account.role == Role::Admin => account,
            Some(account) => {
                warn!(user_id = %account.id, "recovery email belongs to a non-admin account");
                return Err(Error::forbidden("recovery email belongs to a non-admin account"));
            }
            None => {
                let display_name = DisplayName::new(ADMIN_DISPLAY_NAME)
                    .map_err(|err| Error::internal(format!("invalid admin display name: {err}")))?;
                let created = self
                    .accounts
                    .create(&NewAccount {
                        id: UserId::random(),
                        email: credentials.email().clone(),
                        display_name,
                        role: Role::Admin,
                        organisation: None,
                        email_confirmed_at: Some(self.clock.utc()),
                    })
                    .await?;
                info!(user_id = %created.id, "admin account provisioned by recovery login");
                created
            }
        };
        info!(user_id = %account.id, "admin recovery login accepted");
        Ok(AuthenticatedUser {
            user_id: account.id,
            role: RoleKind::Admin,
        })
    }
}
