//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] collects every handler under `inbound::http` together with the
//! shared error schema. Request and response DTOs are picked up from the
//! handler annotations. The document backs Swagger UI in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login/confirm or POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Recruit engagement API",
        description = "Registration, passwordless sign-in, points, badges, leaderboard, and \
                       back-office endpoints for the deputy recruitment programme."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::registration::register,
        crate::inbound::http::login::confirm,
        crate::inbound::http::login::request_link,
        crate::inbound::http::login::recover,
        crate::inbound::http::login::logout,
        crate::inbound::http::users::current_user,
        crate::inbound::http::engagement::summary,
        crate::inbound::http::engagement::badges,
        crate::inbound::http::engagement::history,
        crate::inbound::http::engagement::record_activity,
        crate::inbound::http::engagement::leaderboard,
        crate::inbound::http::stream::engagement_stream,
        crate::inbound::http::admin::award_points,
        crate::inbound::http::admin::list_users,
        crate::inbound::http::admin::delete_user,
        crate::inbound::http::admin::approve_volunteer,
        crate::inbound::http::admin::reject_volunteer,
        crate::inbound::http::admin::audit_balance,
        crate::inbound::http::admin::reconcile_balance,
        crate::inbound::http::admin::diagnostics,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(Error, ErrorCode)),
    tags(
        (name = "registration", description = "Account creation"),
        (name = "login", description = "Passwordless and recovery sign-in"),
        (name = "users", description = "The signed-in account"),
        (name = "engagement", description = "Points, badges, and the leaderboard"),
        (name = "admin", description = "Back-office operations"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
