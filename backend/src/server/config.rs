//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use actix_web::cookie::{Key, SameSite};
#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;
use url::Url;

use recruit_backend::domain::AdminRecovery;
use recruit_backend::inbound::http::state::StreamSettings;
use recruit_backend::outbound::persistence::DbPool;
use recruit_backend::outbound::rate_limit::RedisRateLimitStore;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) link_base: Url,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) redis: Option<RedisRateLimitStore>,
    pub(crate) admin: Option<AdminRecovery>,
    pub(crate) trust_forwarded_for: bool,
    pub(crate) stream: StreamSettings,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    /// Construct a server configuration with in-memory adapters.
    #[must_use]
    pub fn new(
        key: Key,
        cookie_secure: bool,
        same_site: SameSite,
        bind_addr: SocketAddr,
        link_base: Url,
    ) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            link_base,
            db_pool: None,
            redis: None,
            admin: None,
            trust_forwarded_for: false,
            stream: StreamSettings::default(),
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    /// Attach a database connection pool for the account and ledger stores.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Share rate-limit counters through Redis.
    #[must_use]
    pub fn with_redis(mut self, store: RedisRateLimitStore) -> Self {
        self.redis = Some(store);
        self
    }

    /// Enable the break-glass admin login.
    #[must_use]
    pub fn with_admin_recovery(mut self, admin: Option<AdminRecovery>) -> Self {
        self.admin = admin;
        self
    }

    /// Rate limit on the first `X-Forwarded-For` address.
    #[must_use]
    pub fn with_trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// Override event stream timing.
    #[must_use]
    pub fn with_stream(mut self, stream: StreamSettings) -> Self {
        self.stream = stream;
        self
    }

    /// Export request and rate-limit metrics at `/metrics`.
    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
