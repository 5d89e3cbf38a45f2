//! Authentication primitives: recovery credentials and the signed-in user.
//!
//! Inbound adapters validate raw strings here before talking to a login port.

use std::fmt;

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::{Email, RoleKind, UserId};

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Email was missing or malformed.
    InvalidEmail,
    /// Recovery code was blank.
    EmptyRecoveryCode,
    /// Sign-in token was blank or not hex.
    InvalidToken,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEmail => write!(f, "email must be a valid address"),
            Self::EmptyRecoveryCode => write!(f, "recovery code must not be empty"),
            Self::InvalidToken => write!(f, "token is malformed"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Admin recovery credentials.
///
/// ## Invariants
/// - `email` is normalised.
/// - `recovery_code` is non-empty and wiped from memory on drop.
///
/// # Examples
/// ```
/// use recruit_backend::domain::RecoveryCredentials;
///
/// let creds = RecoveryCredentials::try_from_parts("Ops@Example.org", "s3cret").unwrap();
/// assert_eq!(creds.email().as_ref(), "ops@example.org");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryCredentials {
    email: Email,
    recovery_code: Zeroizing<String>,
}

impl RecoveryCredentials {
    /// Construct credentials from raw inputs.
    pub fn try_from_parts(email: &str, recovery_code: &str) -> Result<Self, LoginValidationError> {
        let email = Email::new(email).map_err(|_| LoginValidationError::InvalidEmail)?;
        if recovery_code.is_empty() {
            return Err(LoginValidationError::EmptyRecoveryCode);
        }
        Ok(Self {
            email,
            recovery_code: Zeroizing::new(recovery_code.to_owned()),
        })
    }

    /// Normalised email address.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Recovery code supplied by the caller.
    pub fn recovery_code(&self) -> &str {
        self.recovery_code.as_str()
    }
}

/// Single-use token emailed to a user, held only in memory.
///
/// The digest is what gets stored; the raw value is wiped on drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInToken(Zeroizing<String>);

impl SignInToken {
    /// Number of random bytes behind each token.
    pub const BYTES: usize = 32;

    /// Accept a token echoed back by a client.
    pub fn parse(raw: &str) -> Result<Self, LoginValidationError> {
        let trimmed = raw.trim();
        let valid = trimmed.len() == Self::BYTES * 2 && trimmed.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(LoginValidationError::InvalidToken);
        }
        Ok(Self(Zeroizing::new(trimmed.to_ascii_lowercase())))
    }

    /// Wrap freshly generated random bytes.
    pub fn from_bytes(bytes: &[u8; Self::BYTES]) -> Self {
        Self(Zeroizing::new(hex::encode(bytes)))
    }

    /// Raw token text to deliver to the user.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Hex-encoded SHA-256 digest used as the storage key.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

/// Identity stored in the session once a user signs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub role: RoleKind,
}

impl AuthenticatedUser {
    /// Whether the user may use the back office.
    pub fn is_admin(&self) -> bool {
        self.role == RoleKind::Admin
    }
}

/// Compare two secrets without short-circuiting on the first mismatch.
pub fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("not-an-email", "code", LoginValidationError::InvalidEmail)]
    #[case("ops@example.org", "", LoginValidationError::EmptyRecoveryCode)]
    fn invalid_recovery_credentials(
        #[case] email: &str,
        #[case] code: &str,
        #[case] expected: LoginValidationError,
    ) {
        let err = RecoveryCredentials::try_from_parts(email, code).expect_err("invalid");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn recovery_code_keeps_whitespace() {
        let creds = RecoveryCredentials::try_from_parts("ops@example.org", " pad ").expect("valid");
        assert_eq!(creds.recovery_code(), " pad ");
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case(&"z".repeat(64))]
    fn rejects_malformed_tokens(#[case] raw: &str) {
        assert_eq!(
            SignInToken::parse(raw).expect_err("invalid"),
            LoginValidationError::InvalidToken
        );
    }

    #[rstest]
    fn parsed_token_matches_generated_digest() {
        let generated = SignInToken::from_bytes(&[0xab; SignInToken::BYTES]);
        let echoed = SignInToken::parse(&generated.expose().to_uppercase()).expect("valid");
        assert_eq!(echoed.digest(), generated.digest());
        assert_ne!(generated.digest(), generated.expose());
    }

    #[rstest]
    #[case(b"secret".as_slice(), b"secret".as_slice(), true)]
    #[case(b"secret".as_slice(), b"secreT".as_slice(), false)]
    #[case(b"secret".as_slice(), b"secrets".as_slice(), false)]
    fn compares_in_constant_time(#[case] left: &[u8], #[case] right: &[u8], #[case] equal: bool) {
        assert_eq!(constant_time_eq(left, right), equal);
    }
}
