//! Mailer adapter that writes token emails to the structured log.
//!
//! Deployments without an email provider use this adapter; operators copy the
//! link from the log. The token itself is logged only at `debug`.

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::domain::ports::{ConfirmationMailer, MailerError, TokenEmail, TokenPurpose};

/// Logs token emails instead of delivering them.
#[derive(Debug, Clone)]
pub struct LoggingMailer {
    link_base: Url,
}

impl LoggingMailer {
    /// Create a mailer building links against `link_base`.
    pub fn new(link_base: Url) -> Self {
        Self { link_base }
    }

    /// Link the recipient follows to redeem the token.
    pub fn link_for(&self, email: &TokenEmail) -> Result<Url, MailerError> {
        let mut link = self
            .link_base
            .join("login/confirm")
            .map_err(|err| MailerError::delivery(err.to_string()))?;
        link.query_pairs_mut()
            .append_pair("token", email.token.expose());
        Ok(link)
    }
}

#[async_trait]
impl ConfirmationMailer for LoggingMailer {
    async fn send(&self, email: &TokenEmail) -> Result<(), MailerError> {
        let link = self.link_for(email)?;
        let subject = match email.purpose {
            TokenPurpose::Confirmation => "Confirm your email address",
            TokenPurpose::SignIn => "Your sign-in link",
        };
        info!(
            to = %email.to,
            purpose = email.purpose.as_str(),
            subject,
            "token email queued"
        );
        debug!(to = %email.to, %link, "token email link");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisplayName, Email, SignInToken};

    fn email() -> TokenEmail {
        TokenEmail {
            to: Email::new("dana@example.org").expect("email"),
            display_name: DisplayName::new("Deputy Dana").expect("name"),
            purpose: TokenPurpose::SignIn,
            token: SignInToken::from_bytes(&[7; SignInToken::BYTES]),
        }
    }

    #[test]
    fn links_carry_the_raw_token() {
        let mailer = LoggingMailer::new(Url::parse("https://recruit.example.org/app/").expect("url"));
        let email = email();
        let link = mailer.link_for(&email).expect("link");
        assert_eq!(link.path(), "/app/login/confirm");
        let token = link
            .query_pairs()
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned());
        assert_eq!(token.as_deref(), Some(email.token.expose()));
    }

    #[tokio::test]
    async fn sending_succeeds() {
        let mailer = LoggingMailer::new(Url::parse("http://localhost:8080/").expect("url"));
        mailer.send(&email()).await.expect("logged");
    }
}
