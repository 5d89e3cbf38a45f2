//! Account identity, roles, and the ledger each role writes to.
//!
//! A volunteer recruiter carries its approval status inside the role so the
//! points service can refuse credits to unapproved partners without a second
//! lookup.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Maximum accepted email length.
pub const EMAIL_MAX: usize = 254;
/// Minimum display name length in characters.
pub const DISPLAY_NAME_MIN: usize = 2;
/// Maximum display name length in characters.
pub const DISPLAY_NAME_MAX: usize = 64;
/// Maximum organisation name length in characters.
pub const ORGANISATION_MAX: usize = 120;

/// Validation failures for account fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountValidationError {
    #[error("user id must be a valid UUID")]
    InvalidId,
    #[error("email must not be empty")]
    EmptyEmail,
    #[error("email must look like name@example.org")]
    InvalidEmail,
    #[error("email must be at most {max} characters")]
    EmailTooLong { max: usize },
    #[error("display name must be at least {min} characters")]
    DisplayNameTooShort { min: usize },
    #[error("display name must be at most {max} characters")]
    DisplayNameTooLong { max: usize },
    #[error("display name must not contain control characters")]
    DisplayNameInvalidCharacters,
    #[error("organisation must be at most {max} characters")]
    OrganisationTooLong { max: usize },
    #[error("unknown role '{value}'")]
    UnknownRole { value: String },
    #[error("unknown volunteer status '{value}'")]
    UnknownVolunteerStatus { value: String },
    #[error("volunteer status must be present exactly for volunteer recruiters")]
    RoleStatusMismatch,
}

impl AccountValidationError {
    /// Field the failure relates to, for structured error details.
    pub const fn field(&self) -> &'static str {
        match self {
            Self::InvalidId => "userId",
            Self::EmptyEmail | Self::InvalidEmail | Self::EmailTooLong { .. } => "email",
            Self::DisplayNameTooShort { .. }
            | Self::DisplayNameTooLong { .. }
            | Self::DisplayNameInvalidCharacters => "displayName",
            Self::OrganisationTooLong { .. } => "organisation",
            Self::UnknownRole { .. } | Self::RoleStatusMismatch => "role",
            Self::UnknownVolunteerStatus { .. } => "volunteerStatus",
        }
    }
}

/// Stable account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a new random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for UserId {
    type Err = AccountValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| AccountValidationError::InvalidId)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lower-cased, trimmed email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Normalise and validate an email address.
    ///
    /// # Examples
    /// ```
    /// use recruit_backend::domain::Email;
    ///
    /// let email = Email::new("  Recruit@Example.ORG ").expect("valid email");
    /// assert_eq!(email.as_ref(), "recruit@example.org");
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self, AccountValidationError> {
        let normalised = raw.as_ref().trim().to_lowercase();
        if normalised.is_empty() {
            return Err(AccountValidationError::EmptyEmail);
        }
        if normalised.chars().count() > EMAIL_MAX {
            return Err(AccountValidationError::EmailTooLong { max: EMAIL_MAX });
        }
        let Some((local, domain)) = normalised.split_once('@') else {
            return Err(AccountValidationError::InvalidEmail);
        };
        let domain_ok = domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.contains('@');
        if local.is_empty() || !domain_ok || normalised.chars().any(char::is_whitespace) {
            return Err(AccountValidationError::InvalidEmail);
        }
        Ok(Self(normalised))
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl TryFrom<String> for Email {
    type Error = AccountValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Public display name shown on leaderboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Trim and validate a display name.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, AccountValidationError> {
        let trimmed = raw.as_ref().trim();
        let length = trimmed.chars().count();
        if length < DISPLAY_NAME_MIN {
            return Err(AccountValidationError::DisplayNameTooShort {
                min: DISPLAY_NAME_MIN,
            });
        }
        if length > DISPLAY_NAME_MAX {
            return Err(AccountValidationError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX,
            });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(AccountValidationError::DisplayNameInvalidCharacters);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = AccountValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Trim an optional organisation name, treating blank input as absent.
pub fn normalise_organisation(
    raw: Option<&str>,
) -> Result<Option<String>, AccountValidationError> {
    let Some(trimmed) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > ORGANISATION_MAX {
        return Err(AccountValidationError::OrganisationTooLong {
            max: ORGANISATION_MAX,
        });
    }
    Ok(Some(trimmed.to_owned()))
}

/// Approval state of a volunteer recruiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VolunteerStatus {
    Pending,
    Approved,
    Rejected,
}

impl VolunteerStatus {
    /// Storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for VolunteerStatus {
    type Err = AccountValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(AccountValidationError::UnknownVolunteerStatus {
                value: other.to_owned(),
            }),
        }
    }
}

/// Role discriminant without volunteer status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Recruit,
    VolunteerRecruiter,
    Admin,
}

impl RoleKind {
    /// Storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recruit => "recruit",
            Self::VolunteerRecruiter => "volunteer_recruiter",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for RoleKind {
    type Err = AccountValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recruit" => Ok(Self::Recruit),
            "volunteer_recruiter" => Ok(Self::VolunteerRecruiter),
            "admin" => Ok(Self::Admin),
            other => Err(AccountValidationError::UnknownRole {
                value: other.to_owned(),
            }),
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Prospective deputy collecting engagement points.
    Recruit,
    /// External partner referring candidates, subject to approval.
    VolunteerRecruiter(VolunteerStatus),
    /// Back-office operator.
    Admin,
}

impl Role {
    /// Rebuild a role from its stored columns.
    ///
    /// # Examples
    /// ```
    /// use recruit_backend::domain::{Role, VolunteerStatus};
    ///
    /// let role = Role::from_parts("volunteer_recruiter", Some("approved")).expect("valid");
    /// assert_eq!(role, Role::VolunteerRecruiter(VolunteerStatus::Approved));
    /// ```
    pub fn from_parts(kind: &str, status: Option<&str>) -> Result<Self, AccountValidationError> {
        match (kind.parse::<RoleKind>()?, status) {
            (RoleKind::Recruit, None) => Ok(Self::Recruit),
            (RoleKind::Admin, None) => Ok(Self::Admin),
            (RoleKind::VolunteerRecruiter, Some(raw)) => Ok(Self::VolunteerRecruiter(raw.parse()?)),
            _ => Err(AccountValidationError::RoleStatusMismatch),
        }
    }

    /// Role assigned at registration time.
    pub const fn for_registration(kind: RoleKind) -> Self {
        match kind {
            RoleKind::Recruit => Self::Recruit,
            RoleKind::VolunteerRecruiter => Self::VolunteerRecruiter(VolunteerStatus::Pending),
            RoleKind::Admin => Self::Admin,
        }
    }

    /// Role discriminant.
    pub const fn kind(self) -> RoleKind {
        match self {
            Self::Recruit => RoleKind::Recruit,
            Self::VolunteerRecruiter(_) => RoleKind::VolunteerRecruiter,
            Self::Admin => RoleKind::Admin,
        }
    }

    /// Volunteer status, present only for volunteer recruiters.
    pub const fn volunteer_status(self) -> Option<VolunteerStatus> {
        match self {
            Self::VolunteerRecruiter(status) => Some(status),
            Self::Recruit | Self::Admin => None,
        }
    }

    /// Ledger the role's point credits are recorded against.
    pub const fn ledger(self) -> LedgerKind {
        match self {
            Self::Recruit => LedgerKind::Recruit,
            Self::VolunteerRecruiter(_) => LedgerKind::Volunteer,
            Self::Admin => LedgerKind::Generic,
        }
    }

    /// Whether the role may receive participation points.
    pub const fn can_earn_points(self) -> bool {
        !matches!(
            self,
            Self::VolunteerRecruiter(VolunteerStatus::Pending | VolunteerStatus::Rejected)
        )
    }

    /// Whether the account appears on the public leaderboard.
    pub const fn is_ranked(self) -> bool {
        !matches!(self, Self::Admin)
    }
}

/// Ledger recorded against each activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Recruit,
    Volunteer,
    Generic,
}

impl LedgerKind {
    /// Storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recruit => "recruit",
            Self::Volunteer => "volunteer",
            Self::Generic => "generic",
        }
    }
}

impl FromStr for LedgerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recruit" => Ok(Self::Recruit),
            "volunteer" => Ok(Self::Volunteer),
            "generic" => Ok(Self::Generic),
            other => Err(format!("unknown ledger '{other}'")),
        }
    }
}

/// Persisted account with its participation balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: UserId,
    pub email: Email,
    pub display_name: DisplayName,
    pub role: Role,
    pub organisation: Option<String>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub participation_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    /// Whether the email address has been confirmed.
    pub const fn is_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

/// Account to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub id: UserId,
    pub email: Email,
    pub display_name: DisplayName,
    pub role: Role,
    pub organisation: Option<String>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", AccountValidationError::EmptyEmail)]
    #[case("no-at-sign", AccountValidationError::InvalidEmail)]
    #[case("@example.org", AccountValidationError::InvalidEmail)]
    #[case("user@localhost", AccountValidationError::InvalidEmail)]
    #[case("user@exa mple.org", AccountValidationError::InvalidEmail)]
    #[case("a@b@example.org", AccountValidationError::InvalidEmail)]
    fn rejects_malformed_emails(#[case] raw: &str, #[case] expected: AccountValidationError) {
        assert_eq!(Email::new(raw).expect_err("invalid"), expected);
    }

    #[rstest]
    fn rejects_overlong_email() {
        let raw = format!("{}@example.org", "a".repeat(250));
        assert_eq!(
            Email::new(raw).expect_err("too long"),
            AccountValidationError::EmailTooLong { max: EMAIL_MAX }
        );
    }

    #[rstest]
    #[case("A", AccountValidationError::DisplayNameTooShort { min: DISPLAY_NAME_MIN })]
    #[case("bad\u{7}name", AccountValidationError::DisplayNameInvalidCharacters)]
    fn rejects_invalid_display_names(#[case] raw: &str, #[case] expected: AccountValidationError) {
        assert_eq!(DisplayName::new(raw).expect_err("invalid"), expected);
    }

    #[rstest]
    fn display_name_is_trimmed() {
        let name = DisplayName::new("  Deputy Dana ").expect("valid");
        assert_eq!(name.as_ref(), "Deputy Dana");
    }

    #[rstest]
    #[case(Some("   "), None)]
    #[case(None, None)]
    #[case(Some(" SF Youth League "), Some("SF Youth League"))]
    fn organisation_is_normalised(#[case] raw: Option<&str>, #[case] expected: Option<&str>) {
        let normalised = normalise_organisation(raw).expect("valid");
        assert_eq!(normalised.as_deref(), expected);
    }

    #[rstest]
    #[case(Role::Recruit, LedgerKind::Recruit, true)]
    #[case(Role::VolunteerRecruiter(VolunteerStatus::Approved), LedgerKind::Volunteer, true)]
    #[case(Role::VolunteerRecruiter(VolunteerStatus::Pending), LedgerKind::Volunteer, false)]
    #[case(Role::VolunteerRecruiter(VolunteerStatus::Rejected), LedgerKind::Volunteer, false)]
    #[case(Role::Admin, LedgerKind::Generic, true)]
    fn role_selects_ledger_and_eligibility(
        #[case] role: Role,
        #[case] ledger: LedgerKind,
        #[case] eligible: bool,
    ) {
        assert_eq!(role.ledger(), ledger);
        assert_eq!(role.can_earn_points(), eligible);
    }

    #[rstest]
    #[case("recruit", Some("pending"))]
    #[case("volunteer_recruiter", None)]
    #[case("admin", Some("approved"))]
    fn role_rejects_mismatched_status(#[case] kind: &str, #[case] status: Option<&str>) {
        assert_eq!(
            Role::from_parts(kind, status).expect_err("mismatch"),
            AccountValidationError::RoleStatusMismatch
        );
    }

    #[rstest]
    fn registration_starts_volunteers_pending() {
        assert_eq!(
            Role::for_registration(RoleKind::VolunteerRecruiter),
            Role::VolunteerRecruiter(VolunteerStatus::Pending)
        );
    }
}
