//! Backend entry-point: loads settings, prepares adapters, and serves the API.

mod server;

use std::io;

use actix_web::web;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use recruit_backend::inbound::http::health::HealthState;
use recruit_backend::inbound::http::session_config::fingerprint::key_fingerprint;
use recruit_backend::inbound::http::session_config::{BuildMode, session_settings_from_env};
use recruit_backend::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use recruit_backend::outbound::rate_limit::RedisRateLimitStore;
#[cfg(feature = "metrics")]
use server::make_metrics;
use server::{AppSettings, ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load().map_err(|err| io::Error::other(err.to_string()))?;
    let session = session_settings_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .map_err(io::Error::other)?;
    info!(fingerprint = %key_fingerprint(&session.key), "session key loaded");

    let mut config = ServerConfig::new(
        session.key,
        session.cookie_secure,
        session.same_site,
        settings.bind_addr().map_err(io::Error::other)?,
        settings.link_base().map_err(io::Error::other)?,
    )
    .with_admin_recovery(settings.admin_recovery().map_err(io::Error::other)?)
    .with_trust_forwarded_for(settings.trust_forwarded_for)
    .with_stream(settings.stream_settings().map_err(io::Error::other)?);

    if let Some(url) = settings.database_url.as_deref() {
        run_pending_migrations(url)
            .await
            .map_err(io::Error::other)?;
        let pool = DbPool::new(PoolConfig::new(url))
            .await
            .map_err(io::Error::other)?;
        info!("connected to postgres");
        config = config.with_db_pool(pool);
    }

    if let Some(url) = settings.redis_url.as_deref() {
        let store = RedisRateLimitStore::connect(url).map_err(io::Error::other)?;
        config = config.with_redis(store);
    }

    #[cfg(feature = "metrics")]
    {
        config = config.with_metrics(Some(make_metrics()?));
        info!("prometheus metrics exported at /metrics");
    }

    let health_state = web::Data::new(HealthState::new());
    info!(addr = %config.bind_addr(), "starting server");
    let server = create_server(health_state, config)?;
    server.await
}
