//! Server construction and middleware wiring.

mod config;
#[cfg(feature = "metrics")]
mod metrics;
mod settings;
mod state_builders;

pub use config::ServerConfig;
#[cfg(feature = "metrics")]
pub use metrics::make_metrics;
pub use settings::{AppSettings, SettingsError};

#[cfg(feature = "metrics")]
use metrics::PrometheusLayer;
#[cfg(feature = "metrics")]
use state_builders::attach_rate_limit_metrics;
use state_builders::build_http_state;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

#[cfg(debug_assertions)]
use recruit_backend::ApiDoc;
use recruit_backend::domain::RateLimiter;
use recruit_backend::inbound::http::configure_api;
use recruit_backend::inbound::http::health::{HealthState, live, ready};
use recruit_backend::inbound::http::state::HttpState;
use recruit_backend::{RateLimit, Trace};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    limiter: RateLimiter,
    trust_forwarded_for: bool,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
    #[cfg(feature = "metrics")]
    metrics: PrometheusLayer,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        limiter,
        trust_forwarded_for,
        key,
        cookie_secure,
        same_site,
        #[cfg(feature = "metrics")]
        metrics,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    let api = web::scope("/api/v1")
        .wrap(session)
        .wrap(RateLimit::new(limiter, trust_forwarded_for))
        .configure(configure_api);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    #[cfg(feature = "metrics")]
    let app = app.wrap(metrics);

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails or, with the
/// `metrics` feature, when the rejection counter cannot be registered.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let (http_state, limiter) = build_http_state(&config);
    #[cfg(feature = "metrics")]
    let limiter = attach_rate_limit_metrics(limiter, &config)?;
    let http_state = web::Data::new(http_state);
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
        trust_forwarded_for,
        #[cfg(feature = "metrics")]
        prometheus,
        ..
    } = config;
    #[cfg(feature = "metrics")]
    let metrics_layer = PrometheusLayer::new(prometheus);

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            limiter: limiter.clone(),
            trust_forwarded_for,
            key: key.clone(),
            cookie_secure,
            same_site,
            #[cfg(feature = "metrics")]
            metrics: metrics_layer.clone(),
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
