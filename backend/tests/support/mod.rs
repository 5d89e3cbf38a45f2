//! Shared wiring for integration tests: the full API over in-memory adapters.

#![allow(dead_code)]

use std::net::SocketAddr;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::ServiceResponse;
use chrono::{DateTime, TimeZone, Utc};

use recruit_backend::domain::{AdminRecovery, Email};

pub const SESSION_COOKIE: &str = "session";
pub const ADMIN_EMAIL: &str = "chief@example.org";
pub const ADMIN_CODE: &str = "correct-horse-battery";

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub fn admin_recovery() -> AdminRecovery {
    AdminRecovery::new(Email::new(ADMIN_EMAIL).expect("admin email"), ADMIN_CODE)
}

pub fn session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name(SESSION_COOKIE.to_owned())
        .cookie_secure(false)
        .build()
}

/// Client address for requests; each test picks its own to keep counters apart.
pub fn peer(last_octet: u8) -> SocketAddr {
    SocketAddr::from(([198, 51, 100, last_octet], 40000))
}

pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Cookie<'static> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(Cookie::into_owned)
        .expect("session cookie set")
}

/// Build the API the way the server mounts it, over `stack`.
macro_rules! recruit_app {
    ($stack:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(
                    $stack.http_state(Some(support::admin_recovery())),
                ))
                .wrap(recruit_backend::Trace)
                .service(
                    actix_web::web::scope("/api/v1")
                        .wrap(support::session_middleware())
                        .wrap(recruit_backend::RateLimit::new($stack.rate_limiter(), false))
                        .configure(recruit_backend::inbound::http::configure_api),
                ),
        )
        .await
    };
}
pub(crate) use recruit_app;

/// Sign in through the break-glass login and return the session cookie.
macro_rules! sign_in_admin {
    ($app:expr, $peer:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/api/v1/login")
            .peer_addr($peer)
            .set_json(serde_json::json!({
                "email": support::ADMIN_EMAIL,
                "recoveryCode": support::ADMIN_CODE,
            }))
            .to_request();
        let res = actix_web::test::call_service(&$app, req).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::OK);
        support::session_cookie(&res)
    }};
}
pub(crate) use sign_in_admin;
