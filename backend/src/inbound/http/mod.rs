//! HTTP inbound adapter exposing REST endpoints.

pub mod admin;
pub mod engagement;
pub mod error;
pub mod health;
pub mod login;
pub mod registration;
pub mod session;
pub mod session_config;
pub mod state;
pub mod stream;
#[cfg(test)]
pub mod test_utils;
pub mod users;
pub mod validation;

pub use crate::domain::ApiResult;

use actix_web::web;

/// Register every `/api/v1` endpoint on a scope.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use recruit_backend::inbound::http::configure_api;
///
/// let app = App::new().service(web::scope("/api/v1").configure(configure_api));
/// ```
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(registration::register)
        .service(login::confirm)
        .service(login::request_link)
        .service(login::recover)
        .service(login::logout)
        .service(users::current_user)
        .service(engagement::summary)
        .service(engagement::badges)
        .service(engagement::leaderboard)
        .service(engagement::record_activity)
        .service(engagement::history)
        .service(stream::engagement_stream)
        .service(
            web::scope("/admin")
                .service(admin::award_points)
                .service(admin::list_users)
                .service(admin::delete_user)
                .service(admin::approve_volunteer)
                .service(admin::reject_volunteer)
                .service(admin::audit_balance)
                .service(admin::reconcile_balance)
                .service(admin::diagnostics),
        );
}
