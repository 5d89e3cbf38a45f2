//! Account endpoints for the signed-in user.
//!
//! ```text
//! GET /api/v1/users/me
//! ```

use actix_web::{get, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::badges::AwardTier;
use crate::domain::{Error, RoleKind, UserAccount, VolunteerStatus};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Account as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    #[schema(value_type = String, format = Uuid)]
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: RoleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volunteer_status: Option<VolunteerStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organisation: Option<String>,
    pub email_confirmed: bool,
    pub balance: u64,
    pub tier: Option<AwardTier>,
    pub created_at: DateTime<Utc>,
}

impl From<UserAccount> for AccountResponse {
    fn from(account: UserAccount) -> Self {
        Self {
            id: account.id.to_string(),
            email: account.email.to_string(),
            display_name: account.display_name.to_string(),
            role: account.role.kind(),
            volunteer_status: account.role.volunteer_status(),
            organisation: account.organisation,
            email_confirmed: account.email_confirmed_at.is_some(),
            balance: account.participation_count,
            tier: AwardTier::for_balance(account.participation_count),
            created_at: account.created_at,
        }
    }
}

/// The signed-in account with its balance.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Signed-in account", body = AccountResponse),
        (status = 401, description = "Not signed in", body = Error),
        (status = 404, description = "Account was deleted", body = Error)
    ),
    tags = ["users"],
    operation_id = "currentUser"
)]
#[get("/users/me")]
pub async fn current_user(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<AccountResponse>> {
    let user = session.require_user()?;
    let account = state.engagement.profile(&user.user_id).await?;
    Ok(web::Json(AccountResponse::from(account)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockEngagementQuery;
    use crate::domain::{DisplayName, Email, Role, UserId};
    use crate::inbound::http::test_utils::{
        StateBuilder, session_cookie, sign_in_route, test_session_middleware,
    };
    use actix_web::http::StatusCode;
    use actix_web::{App, test};

    fn account(id: UserId) -> UserAccount {
        let now = Utc::now();
        UserAccount {
            id,
            email: Email::new("vera@example.org").expect("email"),
            display_name: DisplayName::new("Volunteer Vera").expect("name"),
            role: Role::VolunteerRecruiter(VolunteerStatus::Approved),
            organisation: Some("County Rotary".to_owned()),
            email_confirmed_at: Some(now),
            participation_count: 2_600,
            created_at: now,
            updated_at: now,
        }
    }

    #[actix_web::test]
    async fn returns_the_signed_in_account() {
        let user_id = UserId::random();
        let mut engagement = MockEngagementQuery::new();
        engagement
            .expect_profile()
            .withf(move |id| *id == user_id)
            .returning(move |id| Ok(account(*id)));
        let state = StateBuilder::default().engagement(engagement).build();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .wrap(test_session_middleware())
                .route("/sign-in", sign_in_route(user_id, RoleKind::VolunteerRecruiter))
                .service(web::scope("/api/v1").service(current_user)),
        )
        .await;

        let signed_in =
            test::call_service(&app, test::TestRequest::get().uri("/sign-in").to_request()).await;
        let req = test::TestRequest::get()
            .uri("/api/v1/users/me")
            .cookie(session_cookie(&signed_in))
            .to_request();
        let body: AccountResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.id, user_id.to_string());
        assert_eq!(body.volunteer_status, Some(VolunteerStatus::Approved));
        assert_eq!(body.tier, Some(AwardTier::Silver));
    }

    #[actix_web::test]
    async fn anonymous_requests_are_rejected() {
        let state = StateBuilder::default().build();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .wrap(test_session_middleware())
                .service(web::scope("/api/v1").service(current_user)),
        )
        .await;
        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/v1/users/me").to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
