//! Registration and sign-in link issuance.
//!
//! Tokens are minted here, stored as digests, and handed to the mailer. A
//! mailer failure is logged and does not undo the registration; the user can
//! ask for a fresh link.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::json;
use tracing::{debug, info, warn};

use super::ports::{
    AccountRepository, ConfirmationMailer, EmailTokenRecord, EmailTokenRepository,
    RegistrationCommand, RegistrationOutcome, RegistrationRequest, TokenEmail, TokenPurpose,
};
use super::{Email, Error, NewAccount, Role, RoleKind, SignInToken, UserAccount, UserId};

fn mint_token() -> SignInToken {
    let mut bytes = [0_u8; SignInToken::BYTES];
    OsRng.fill_bytes(&mut bytes);
    SignInToken::from_bytes(&bytes)
}

/// Registration service.
#[derive(Clone)]
pub struct RegistrationService<A, T> {
    accounts: Arc<A>,
    tokens: Arc<T>,
    mailer: Arc<dyn ConfirmationMailer>,
    clock: Arc<dyn Clock>,
}

impl<A, T> RegistrationService<A, T> {
    /// Create the service.
    pub fn new(
        accounts: Arc<A>,
        tokens: Arc<T>,
        mailer: Arc<dyn ConfirmationMailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            tokens,
            mailer,
            clock,
        }
    }
}

impl<A, T> RegistrationService<A, T>
where
    A: AccountRepository,
    T: EmailTokenRepository,
{
    async fn issue_token(&self, account: &UserAccount, purpose: TokenPurpose) -> Result<(), Error> {
        let token = mint_token();
        let record = EmailTokenRecord {
            digest: token.digest(),
            user_id: account.id,
            purpose,
            expires_at: self.clock.utc() + purpose.ttl(),
        };
        self.tokens.store(&record).await?;

        let email = TokenEmail {
            to: account.email.clone(),
            display_name: account.display_name.clone(),
            purpose,
            token,
        };
        if let Err(err) = self.mailer.send(&email).await {
            warn!(user_id = %account.id, purpose = purpose.as_str(), error = %err, "failed to send token email");
        }
        Ok(())
    }
}

#[async_trait]
impl<A, T> RegistrationCommand for RegistrationService<A, T>
where
    A: AccountRepository,
    T: EmailTokenRepository,
{
    async fn register(&self, request: &RegistrationRequest) -> Result<RegistrationOutcome, Error> {
        if request.role == RoleKind::Admin {
            return Err(Error::invalid_request("admin accounts cannot be registered")
                .with_details(json!({ "field": "role" })));
        }
        let role = Role::for_registration(request.role);
        let account = self
            .accounts
            .create(&NewAccount {
                id: UserId::random(),
                email: request.email.clone(),
                display_name: request.display_name.clone(),
                role,
                organisation: request.organisation.clone(),
                email_confirmed_at: None,
            })
            .await?;
        // The account exists now; a later sign-in link request re-issues the
        // confirmation token.
        if let Err(err) = self.issue_token(&account, TokenPurpose::Confirmation).await {
            warn!(
                user_id = %account.id,
                code = ?err.code(),
                error = err.message(),
                "confirmation token not issued at registration"
            );
        }
        info!(user_id = %account.id, role = role.kind().as_str(), "account registered");
        Ok(RegistrationOutcome {
            user_id: account.id,
            role,
        })
    }

    async fn request_sign_in_link(&self, email: &Email) -> Result<(), Error> {
        let Some(account) = self.accounts.find_by_email(email).await? else {
            debug!("sign-in link requested for unknown address");
            return Ok(());
        };
        let purpose = if account.is_confirmed() {
            TokenPurpose::SignIn
        } else {
            TokenPurpose::Confirmation
        };
        self.issue_token(&account, purpose).await
    }
}
