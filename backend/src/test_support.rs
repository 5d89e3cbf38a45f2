//! Test doubles and in-memory wiring for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Only compiled for tests or with the `test-support` feature.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::{
    ConfirmationMailer, DelaySleeper, DependencyProbe, MailerError, TokenEmail, TokenPurpose,
};
use crate::domain::{
    AccountLoginService, AdminRecovery, AdminService, EngagementService, PointsService,
    RateLimiter, RegistrationService, SignInToken,
};
use crate::inbound::http::state::{HttpState, HttpStatePorts, StreamSettings};
use crate::outbound::events::BroadcastEngagementEvents;
use crate::outbound::memory::MemoryEngagementStore;
use crate::outbound::rate_limit::MemoryRateLimitStore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => panic!("failed to convert {delta:?} to TimeDelta: {error}"),
        };
        *lock(&self.0) += delta;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Sleeper that records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper(Mutex<Vec<Duration>>);

impl RecordingSleeper {
    /// Delays requested so far, in call order.
    pub fn recorded(&self) -> Vec<Duration> {
        lock(&self.0).clone()
    }
}

#[async_trait]
impl DelaySleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        lock(&self.0).push(duration);
    }
}

/// Mailer that keeps every email in memory.
#[derive(Debug, Default)]
pub struct RecordingMailer(Mutex<Vec<TokenEmail>>);

impl RecordingMailer {
    /// Emails sent so far, in send order.
    pub fn sent(&self) -> Vec<TokenEmail> {
        lock(&self.0).clone()
    }

    /// Most recent token of `purpose` mailed to `address`.
    pub fn last_token(&self, address: &str, purpose: TokenPurpose) -> Option<SignInToken> {
        lock(&self.0)
            .iter()
            .rev()
            .find(|email| email.to.as_ref() == address && email.purpose == purpose)
            .map(|email| email.token.clone())
    }
}

#[async_trait]
impl ConfirmationMailer for RecordingMailer {
    async fn send(&self, email: &TokenEmail) -> Result<(), MailerError> {
        lock(&self.0).push(email.clone());
        Ok(())
    }
}

/// Every service wired over the in-memory adapters.
///
/// # Examples
///
/// ```rust
/// use chrono::Utc;
/// use recruit_backend::test_support::MemoryStack;
///
/// let stack = MemoryStack::new(Utc::now());
/// let state = stack.http_state(None);
/// assert!(stack.mailer.sent().is_empty());
/// # drop(state);
/// ```
pub struct MemoryStack {
    pub clock: Arc<MutableClock>,
    pub store: Arc<MemoryEngagementStore>,
    pub rate_limits: Arc<MemoryRateLimitStore>,
    pub sleeper: Arc<RecordingSleeper>,
    pub mailer: Arc<RecordingMailer>,
    pub events: Arc<BroadcastEngagementEvents>,
}

impl MemoryStack {
    /// Empty stores with the clock fixed at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        let clock = Arc::new(MutableClock::new(now));
        Self {
            store: Arc::new(MemoryEngagementStore::new(clock.clone())),
            clock,
            rate_limits: Arc::new(MemoryRateLimitStore::new()),
            sleeper: Arc::new(RecordingSleeper::default()),
            mailer: Arc::new(RecordingMailer::default()),
            events: Arc::new(BroadcastEngagementEvents::default()),
        }
    }

    /// Handler state over the shared stores.
    pub fn http_state(&self, admin: Option<AdminRecovery>) -> HttpState {
        let clock: Arc<dyn Clock> = self.clock.clone();
        let points = Arc::new(PointsService::new(
            self.store.clone(),
            self.store.clone(),
            self.events.clone(),
            clock.clone(),
        ));
        let probes: Vec<Arc<dyn DependencyProbe>> =
            vec![self.store.clone(), self.rate_limits.clone()];
        HttpState::with_stream(
            HttpStatePorts {
                registration: Arc::new(RegistrationService::new(
                    self.store.clone(),
                    self.store.clone(),
                    self.mailer.clone(),
                    clock.clone(),
                )),
                login: Arc::new(AccountLoginService::new(
                    self.store.clone(),
                    self.store.clone(),
                    clock.clone(),
                    admin,
                )),
                engagement: Arc::new(EngagementService::new(
                    self.store.clone(),
                    self.store.clone(),
                    clock.clone(),
                )),
                points: points.clone(),
                points_query: points,
                admin: Arc::new(AdminService::new(
                    self.store.clone(),
                    self.events.clone(),
                    probes,
                    clock,
                )),
                events: self.events.clone(),
            },
            StreamSettings::default(),
        )
    }

    /// Limiter over the shared rate-limit store.
    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(self.rate_limits.clone(), self.sleeper.clone())
    }
}
