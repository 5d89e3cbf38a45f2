//! Builders for HTTP state ports and the rate limiter.
//!
//! PostgreSQL-backed stores are used when a pool is configured, otherwise a
//! single in-memory store serves accounts, the ledger, and tokens. Redis
//! backs the rate limiter when configured.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::warn;

use recruit_backend::domain::ports::{
    AccountRepository, ConfirmationMailer, DependencyProbe, EmailTokenRepository,
    EngagementEventBus, PointsLedger, RateLimitStore, TokioSleeper,
};
use recruit_backend::domain::{
    AccountLoginService, AdminRecovery, AdminService, EngagementService, PointsService,
    RateLimiter, RegistrationService,
};
use recruit_backend::inbound::http::state::{HttpState, HttpStatePorts};
use recruit_backend::outbound::events::BroadcastEngagementEvents;
use recruit_backend::outbound::mail::LoggingMailer;
use recruit_backend::outbound::memory::MemoryEngagementStore;
use recruit_backend::outbound::persistence::{
    DieselAccountRepository, DieselEmailTokenRepository, DieselPointsLedger,
};
#[cfg(feature = "metrics")]
use recruit_backend::outbound::metrics::PrometheusRateLimitMetrics;
use recruit_backend::outbound::rate_limit::MemoryRateLimitStore;

use super::ServerConfig;

/// Collaborators shared by every service regardless of the store backend.
struct SharedPorts {
    events: Arc<dyn EngagementEventBus>,
    mailer: Arc<dyn ConfirmationMailer>,
    clock: Arc<dyn Clock>,
    probes: Vec<Arc<dyn DependencyProbe>>,
    admin: Option<AdminRecovery>,
}

/// Wire every domain service over one account store, ledger, and token store.
fn build_ports<A, L, T>(
    accounts: Arc<A>,
    ledger: Arc<L>,
    tokens: Arc<T>,
    shared: SharedPorts,
) -> HttpStatePorts
where
    A: AccountRepository + 'static,
    L: PointsLedger + 'static,
    T: EmailTokenRepository + 'static,
{
    let SharedPorts {
        events,
        mailer,
        clock,
        probes,
        admin,
    } = shared;
    let points = Arc::new(PointsService::new(
        accounts.clone(),
        ledger.clone(),
        events.clone(),
        clock.clone(),
    ));
    HttpStatePorts {
        registration: Arc::new(RegistrationService::new(
            accounts.clone(),
            tokens.clone(),
            mailer,
            clock.clone(),
        )),
        login: Arc::new(AccountLoginService::new(
            accounts.clone(),
            tokens,
            clock.clone(),
            admin,
        )),
        engagement: Arc::new(EngagementService::new(
            accounts.clone(),
            ledger,
            clock.clone(),
        )),
        points: points.clone(),
        points_query: points,
        admin: Arc::new(AdminService::new(accounts, events.clone(), probes, clock)),
        events,
    }
}

/// Rate-limit store chosen by configuration.
fn rate_limit_store(config: &ServerConfig) -> Arc<dyn RateLimitStore> {
    match &config.redis {
        Some(store) => Arc::new(store.clone()),
        None => {
            warn!("no redis configured; rate limits are counted per process");
            Arc::new(MemoryRateLimitStore::new())
        }
    }
}

/// Build the handler state and the rate limiter from configuration.
pub fn build_http_state(config: &ServerConfig) -> (HttpState, RateLimiter) {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let events: Arc<dyn EngagementEventBus> = Arc::new(BroadcastEngagementEvents::default());
    let mailer: Arc<dyn ConfirmationMailer> =
        Arc::new(LoggingMailer::new(config.link_base.clone()));
    let limits = rate_limit_store(config);

    let mut probes: Vec<Arc<dyn DependencyProbe>> = Vec::new();
    if let Some(store) = &config.redis {
        probes.push(Arc::new(store.clone()));
    }

    let ports = match &config.db_pool {
        Some(pool) => {
            probes.push(Arc::new(pool.clone()));
            build_ports(
                Arc::new(DieselAccountRepository::new(pool.clone())),
                Arc::new(DieselPointsLedger::new(pool.clone())),
                Arc::new(DieselEmailTokenRepository::new(pool.clone())),
                SharedPorts {
                    events,
                    mailer,
                    clock,
                    probes,
                    admin: config.admin.clone(),
                },
            )
        }
        None => {
            warn!("no database configured; accounts and points are kept in memory");
            let store = Arc::new(MemoryEngagementStore::new(clock.clone()));
            probes.push(store.clone());
            build_ports(
                store.clone(),
                store.clone(),
                store,
                SharedPorts {
                    events,
                    mailer,
                    clock,
                    probes,
                    admin: config.admin.clone(),
                },
            )
        }
    };

    let limiter = RateLimiter::new(limits, Arc::new(TokioSleeper));
    (HttpState::with_stream(ports, config.stream), limiter)
}

/// Count rate-limit rejections in the configured Prometheus registry.
///
/// # Errors
/// Returns an error when the rejection counter cannot be registered.
#[cfg(feature = "metrics")]
pub fn attach_rate_limit_metrics(
    limiter: RateLimiter,
    config: &ServerConfig,
) -> std::io::Result<RateLimiter> {
    let Some(prometheus) = &config.prometheus else {
        return Ok(limiter);
    };
    let metrics = PrometheusRateLimitMetrics::new(&prometheus.registry).map_err(|err| {
        std::io::Error::other(format!("rate limit metrics registration failed: {err}"))
    })?;
    Ok(limiter.with_metrics(Arc::new(metrics)))
}
