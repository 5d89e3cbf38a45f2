//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`*Command`, `*Query`, [`LoginService`], [`AdminConsole`])
//! are what inbound adapters call. Driven ports (repositories, the ledger,
//! the rate-limit store, the mailer, the event bus) are what domain services
//! call. Each driven port has its own error enum that maps into
//! [`crate::domain::Error`].

mod macros;
pub(crate) use macros::define_port_error;

mod account_repository;
mod admin_console;
mod confirmation_mailer;
mod delay_sleeper;
mod dependency_probe;
mod email_token_repository;
mod engagement_events;
mod engagement_query;
mod login_service;
mod points_command;
mod points_ledger;
mod rate_limit_metrics;
mod rate_limit_store;
mod registration_command;

#[cfg(test)]
pub use account_repository::MockAccountRepository;
pub use account_repository::{AccountKey, AccountRepository, AccountRepositoryError};
#[cfg(test)]
pub use admin_console::MockAdminConsole;
pub use admin_console::{AdminConsole, DependencyStatus, DiagnosticsReport, VolunteerDecision};
#[cfg(test)]
pub use confirmation_mailer::MockConfirmationMailer;
pub use confirmation_mailer::{ConfirmationMailer, MailerError, TokenEmail};
#[cfg(test)]
pub use delay_sleeper::MockDelaySleeper;
pub use delay_sleeper::{DelaySleeper, TokioSleeper};
#[cfg(test)]
pub use dependency_probe::MockDependencyProbe;
pub use dependency_probe::{DependencyProbe, ProbeError};
#[cfg(test)]
pub use email_token_repository::MockEmailTokenRepository;
pub use email_token_repository::{
    EmailTokenRecord, EmailTokenRepository, EmailTokenRepositoryError, TokenPurpose,
};
#[cfg(test)]
pub use engagement_events::MockEngagementEventBus;
pub use engagement_events::{EngagementEvent, EngagementEventBus};
#[cfg(test)]
pub use engagement_query::MockEngagementQuery;
pub use engagement_query::EngagementQuery;
#[cfg(test)]
pub use login_service::MockLoginService;
pub use login_service::LoginService;
#[cfg(test)]
pub use points_command::{MockPointsCommand, MockPointsQuery};
pub use points_command::{ActivityReport, PointsCommand, PointsQuery};
#[cfg(test)]
pub use points_ledger::MockPointsLedger;
pub use points_ledger::{LeaderboardRow, PointsLedger, PointsLedgerError};
#[cfg(test)]
pub use rate_limit_metrics::MockRateLimitMetrics;
pub use rate_limit_metrics::{NoOpRateLimitMetrics, RateLimitMetrics, RateLimitMetricsError};
#[cfg(test)]
pub use rate_limit_store::MockRateLimitStore;
pub use rate_limit_store::{Consumption, RateLimitStore, RateLimitStoreError};
#[cfg(test)]
pub use registration_command::MockRegistrationCommand;
pub use registration_command::{RegistrationCommand, RegistrationOutcome, RegistrationRequest};
