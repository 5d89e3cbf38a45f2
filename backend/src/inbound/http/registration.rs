//! Account registration.
//!
//! ```text
//! POST /api/v1/registrations {"email":"dana@example.org","displayName":"Deputy Dana","role":"recruit"}
//! ```

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::RegistrationRequest;
use crate::domain::{
    AccountValidationError, DisplayName, Email, Error, RoleKind, VolunteerStatus,
    normalise_organisation,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::account_error;

/// Registration form.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationBody {
    pub email: String,
    pub display_name: String,
    /// `recruit` or `volunteer_recruiter`.
    pub role: RoleKind,
    #[serde(default)]
    pub organisation: Option<String>,
}

impl TryFrom<RegistrationBody> for RegistrationRequest {
    type Error = AccountValidationError;

    fn try_from(body: RegistrationBody) -> Result<Self, Self::Error> {
        Ok(Self {
            email: Email::new(&body.email)?,
            display_name: DisplayName::new(&body.display_name)?,
            role: body.role,
            organisation: normalise_organisation(body.organisation.as_deref())?,
        })
    }
}

/// Account created by a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    #[schema(value_type = String, format = Uuid)]
    pub user_id: String,
    pub role: RoleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volunteer_status: Option<VolunteerStatus>,
}

/// Register a recruit or volunteer recruiter and send a confirmation email.
#[utoipa::path(
    post,
    path = "/api/v1/registrations",
    request_body = RegistrationBody,
    responses(
        (status = 201, description = "Account created", body = RegistrationResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 409, description = "Email already registered", body = Error),
        (status = 429, description = "Too many attempts", body = Error)
    ),
    tags = ["registration"],
    operation_id = "register",
    security([])
)]
#[post("/registrations")]
pub async fn register(
    state: web::Data<HttpState>,
    payload: web::Json<RegistrationBody>,
) -> ApiResult<HttpResponse> {
    let request = RegistrationRequest::try_from(payload.into_inner()).map_err(account_error)?;
    let outcome = state.registration.register(&request).await?;
    Ok(HttpResponse::Created().json(RegistrationResponse {
        user_id: outcome.user_id.to_string(),
        role: outcome.role.kind(),
        volunteer_status: outcome.role.volunteer_status(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockRegistrationCommand, RegistrationOutcome};
    use crate::domain::{Role, UserId};
    use crate::inbound::http::test_utils::StateBuilder;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use rstest::rstest;
    use serde_json::{Value, json};

    async fn post(registration: MockRegistrationCommand, body: Value) -> (StatusCode, Value) {
        let state = StateBuilder::default().registration(registration).build();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(web::scope("/api/v1").service(register)),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/v1/registrations")
            .set_json(body)
            .to_request();
        let res = test::call_service(&app, req).await;
        let status = res.status();
        let body: Value = test::read_body_json(res).await;
        (status, body)
    }

    #[actix_web::test]
    async fn volunteer_recruiters_start_pending() {
        let mut registration = MockRegistrationCommand::new();
        registration
            .expect_register()
            .withf(|req| {
                req.email.as_ref() == "vera@example.org"
                    && req.organisation.as_deref() == Some("County Rotary")
            })
            .times(1)
            .returning(|req| {
                Ok(RegistrationOutcome {
                    user_id: UserId::random(),
                    role: Role::for_registration(req.role),
                })
            });

        let (status, body) = post(
            registration,
            json!({
                "email": " Vera@Example.org ",
                "displayName": "Volunteer Vera",
                "role": "volunteer_recruiter",
                "organisation": "  County Rotary "
            }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["role"], "volunteer_recruiter");
        assert_eq!(body["volunteerStatus"], "pending");
    }

    #[actix_web::test]
    async fn duplicate_email_is_a_conflict() {
        let mut registration = MockRegistrationCommand::new();
        registration
            .expect_register()
            .returning(|_| Err(Error::conflict("an account already exists for this email")));

        let (status, body) = post(
            registration,
            json!({
                "email": "dana@example.org",
                "displayName": "Deputy Dana",
                "role": "recruit"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "conflict");
    }

    #[rstest]
    #[case(json!({"email": "nope", "displayName": "Deputy Dana", "role": "recruit"}), "email")]
    #[case(json!({"email": "dana@example.org", "displayName": "D", "role": "recruit"}), "displayName")]
    #[actix_web::test]
    async fn invalid_fields_never_reach_the_service(#[case] body: Value, #[case] field: &str) {
        let mut registration = MockRegistrationCommand::new();
        registration.expect_register().never();

        let (status, body) = post(registration, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], field);
    }
}
