//! Sign-in endpoints.
//!
//! ```text
//! POST /api/v1/login/confirm {"token":"<64 hex chars>"}
//! POST /api/v1/login/link {"email":"dana@example.org"}
//! POST /api/v1/login {"email":"ops@example.org","recoveryCode":"..."}
//! POST /api/v1/logout
//! ```
//!
//! Recruits and volunteer recruiters sign in with single-use emailed tokens.
//! The admin recovery login is the break-glass path for the back office.

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    AuthenticatedUser, Email, Error, LoginValidationError, RecoveryCredentials, RoleKind,
    SignInToken,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::login_error;

/// Token copied from a confirmation or sign-in email.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBody {
    pub token: String,
}

/// Address to send a sign-in link to.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkBody {
    pub email: String,
}

/// Admin recovery credentials.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryBody {
    pub email: String,
    pub recovery_code: String,
}

impl TryFrom<RecoveryBody> for RecoveryCredentials {
    type Error = LoginValidationError;

    fn try_from(body: RecoveryBody) -> Result<Self, Self::Error> {
        Self::try_from_parts(&body.email, &body.recovery_code)
    }
}

/// Identity established by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignedIn {
    #[schema(value_type = String, format = Uuid)]
    pub user_id: String,
    pub role: RoleKind,
}

fn signed_in(session: &SessionContext, user: &AuthenticatedUser) -> ApiResult<HttpResponse> {
    session.persist_user(user)?;
    Ok(HttpResponse::Ok().json(SignedIn {
        user_id: user.user_id.to_string(),
        role: user.role,
    }))
}

/// Redeem an emailed token and start a session.
///
/// The first redemption of a confirmation token also confirms the address.
#[utoipa::path(
    post,
    path = "/api/v1/login/confirm",
    request_body = ConfirmBody,
    responses(
        (status = 200, description = "Signed in", body = SignedIn,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Malformed token", body = Error),
        (status = 401, description = "Token unknown, used, or expired", body = Error),
        (status = 429, description = "Too many attempts", body = Error)
    ),
    tags = ["login"],
    operation_id = "confirmLogin",
    security([])
)]
#[post("/login/confirm")]
pub async fn confirm(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<ConfirmBody>,
) -> ApiResult<HttpResponse> {
    let token = SignInToken::parse(&payload.token).map_err(login_error)?;
    let user = state.login.redeem_token(&token).await?;
    signed_in(&session, &user)
}

/// Email a sign-in link.
///
/// Answers `202` whether or not the address belongs to an account.
#[utoipa::path(
    post,
    path = "/api/v1/login/link",
    request_body = LinkBody,
    responses(
        (status = 202, description = "Link sent if the account exists"),
        (status = 400, description = "Malformed email", body = Error),
        (status = 429, description = "Too many attempts", body = Error)
    ),
    tags = ["login"],
    operation_id = "requestLoginLink",
    security([])
)]
#[post("/login/link")]
pub async fn request_link(
    state: web::Data<HttpState>,
    payload: web::Json<LinkBody>,
) -> ApiResult<HttpResponse> {
    let email =
        Email::new(&payload.email).map_err(|_| login_error(LoginValidationError::InvalidEmail))?;
    state.registration.request_sign_in_link(&email).await?;
    Ok(HttpResponse::Accepted().finish())
}

/// Admin recovery login.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = RecoveryBody,
    responses(
        (status = 200, description = "Signed in", body = SignedIn,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid credentials", body = Error),
        (status = 429, description = "Too many attempts", body = Error),
        (status = 503, description = "Rate limiter unavailable", body = Error)
    ),
    tags = ["login"],
    operation_id = "recoverAdmin",
    security([])
)]
#[post("/login")]
pub async fn recover(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RecoveryBody>,
) -> ApiResult<HttpResponse> {
    let credentials = RecoveryCredentials::try_from(payload.into_inner()).map_err(login_error)?;
    let user = state.login.recover_admin(&credentials).await?;
    signed_in(&session, &user)
}

/// End the session.
#[utoipa::path(
    post,
    path = "/api/v1/logout",
    responses((status = 204, description = "Signed out")),
    tags = ["login"],
    operation_id = "logout"
)]
#[post("/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.clear();
    HttpResponse::NoContent().finish()
}
