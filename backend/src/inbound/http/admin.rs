//! Back-office endpoints.
//!
//! ```text
//! POST   /api/v1/admin/points/award
//! GET    /api/v1/admin/users?limit=25&cursor=...
//! DELETE /api/v1/admin/users/{id}
//! POST   /api/v1/admin/volunteers/{id}/approve
//! POST   /api/v1/admin/volunteers/{id}/reject
//! GET    /api/v1/admin/points/{id}/audit
//! POST   /api/v1/admin/points/{id}/reconcile
//! GET    /api/v1/admin/diagnostics
//! ```
//!
//! Every handler checks for an admin session before touching a port.

use actix_web::{HttpResponse, delete, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::points::{
    ActivityDescription, ActivityType, AwardRequest, BalanceAudit, DirectAwardRequest,
    NewRecruitDetails, PointAmount,
};
use crate::domain::ports::{AccountKey, DependencyStatus, DiagnosticsReport, VolunteerDecision};
use crate::domain::{DisplayName, Email, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::engagement::AwardResponse;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::AccountResponse;
use crate::inbound::http::validation::{
    PageQuery, account_error, list_bounds, parse_user_id, points_error,
};

/// Direct award form.
///
/// `email` and `displayName` are only used when no account has `userId`;
/// the recipient is then created as a recruit.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwardBody {
    #[schema(value_type = String, format = Uuid)]
    pub user_id: String,
    pub points: u32,
    pub activity: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl TryFrom<AwardBody> for DirectAwardRequest {
    type Error = Error;

    fn try_from(body: AwardBody) -> Result<Self, Self::Error> {
        let award = AwardRequest {
            user_id: parse_user_id(&body.user_id)?,
            points: PointAmount::new(body.points).map_err(points_error)?,
            activity: ActivityType::new(&body.activity).map_err(points_error)?,
            description: ActivityDescription::parse(body.description.as_deref())
                .map_err(points_error)?,
        };
        let new_account = match (body.email, body.display_name) {
            (None, None) => None,
            (Some(email), Some(display_name)) => Some(NewRecruitDetails {
                email: Email::new(&email).map_err(account_error)?,
                display_name: DisplayName::new(&display_name).map_err(account_error)?,
            }),
            (email, _) => {
                let missing = if email.is_none() { "email" } else { "displayName" };
                return Err(Error::invalid_request(
                    "email and displayName must be supplied together",
                )
                .with_details(json!({ "field": missing, "code": "missing_field" })));
            }
        };
        Ok(Self { award, new_account })
    }
}

/// Page of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountPage {
    pub items: Vec<AccountResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Stored balance compared with the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditResponse {
    #[schema(value_type = String, format = Uuid)]
    pub user_id: String,
    pub recorded_balance: u64,
    pub ledger_total: u64,
    pub entry_count: u64,
    /// `recordedBalance - ledgerTotal`.
    pub drift: i64,
    pub consistent: bool,
}

impl From<BalanceAudit> for AuditResponse {
    fn from(audit: BalanceAudit) -> Self {
        Self {
            user_id: audit.user_id.to_string(),
            recorded_balance: audit.recorded_balance,
            ledger_total: audit.ledger_total,
            entry_count: audit.entry_count,
            drift: i64::try_from(audit.drift()).unwrap_or(if audit.drift() < 0 {
                i64::MIN
            } else {
                i64::MAX
            }),
            consistent: audit.is_consistent(),
        }
    }
}

/// Result of probing one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependencyStatusResponse {
    pub name: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub latency_ms: u64,
}

impl From<DependencyStatus> for DependencyStatusResponse {
    fn from(status: DependencyStatus) -> Self {
        Self {
            name: status.name.to_owned(),
            healthy: status.healthy,
            detail: status.detail,
            latency_ms: status.latency_ms,
        }
    }
}

/// Diagnostics snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsResponse {
    pub checked_at: DateTime<Utc>,
    pub healthy: bool,
    pub dependencies: Vec<DependencyStatusResponse>,
}

impl From<DiagnosticsReport> for DiagnosticsResponse {
    fn from(report: DiagnosticsReport) -> Self {
        Self {
            checked_at: report.checked_at,
            healthy: report.is_healthy(),
            dependencies: report
                .dependencies
                .into_iter()
                .map(DependencyStatusResponse::from)
                .collect(),
        }
    }
}

/// Credit points, creating the recruit account when it does not exist.
#[utoipa::path(
    post,
    path = "/api/v1/admin/points/award",
    request_body = AwardBody,
    responses(
        (status = 201, description = "Points credited", body = AwardResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Not signed in", body = Error),
        (status = 403, description = "Not an admin, or recipient may not earn points", body = Error),
        (status = 404, description = "Unknown account and no details to create one", body = Error),
        (status = 409, description = "Email belongs to another account", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminAwardPoints"
)]
#[post("/points/award")]
pub async fn award_points(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<AwardBody>,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let request = DirectAwardRequest::try_from(payload.into_inner())?;
    let outcome = state.points.award_direct(&request).await?;
    Ok(HttpResponse::Created().json(AwardResponse::from(outcome)))
}

/// Accounts, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(PageQuery),
    responses(
        (status = 200, description = "Accounts", body = AccountPage),
        (status = 400, description = "Invalid limit or cursor", body = Error),
        (status = 401, description = "Not signed in", body = Error),
        (status = 403, description = "Not an admin", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminListUsers"
)]
#[get("/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<AccountPage>> {
    session.require_admin()?;
    let page = query.into_request::<AccountKey>(list_bounds())?;
    let (items, next_cursor) = state
        .admin
        .list_accounts(&page)
        .await?
        .map(AccountResponse::from)
        .into_parts();
    Ok(web::Json(AccountPage { items, next_cursor }))
}

/// Delete an account together with its activity log.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Malformed id", body = Error),
        (status = 403, description = "Not an admin", body = Error),
        (status = 404, description = "No such account", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminDeleteUser"
)]
#[delete("/users/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let user_id = parse_user_id(&path)?;
    state.admin.delete_account(&user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn decide(
    state: &HttpState,
    session: &SessionContext,
    raw_id: &str,
    decision: VolunteerDecision,
) -> ApiResult<web::Json<AccountResponse>> {
    session.require_admin()?;
    let user_id = parse_user_id(raw_id)?;
    let account = state.admin.decide_volunteer(&user_id, decision).await?;
    Ok(web::Json(AccountResponse::from(account)))
}

/// Approve a volunteer recruiter so they can earn points.
#[utoipa::path(
    post,
    path = "/api/v1/admin/volunteers/{id}/approve",
    params(("id" = String, Path, description = "Volunteer recruiter id")),
    responses(
        (status = 200, description = "Updated account", body = AccountResponse),
        (status = 403, description = "Not an admin", body = Error),
        (status = 404, description = "No such volunteer recruiter", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminApproveVolunteer"
)]
#[post("/volunteers/{id}/approve")]
pub async fn approve_volunteer(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<AccountResponse>> {
    decide(&state, &session, &path, VolunteerDecision::Approve).await
}

/// Reject a volunteer recruiter.
#[utoipa::path(
    post,
    path = "/api/v1/admin/volunteers/{id}/reject",
    params(("id" = String, Path, description = "Volunteer recruiter id")),
    responses(
        (status = 200, description = "Updated account", body = AccountResponse),
        (status = 403, description = "Not an admin", body = Error),
        (status = 404, description = "No such volunteer recruiter", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminRejectVolunteer"
)]
#[post("/volunteers/{id}/reject")]
pub async fn reject_volunteer(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<AccountResponse>> {
    decide(&state, &session, &path, VolunteerDecision::Reject).await
}

/// Compare the stored balance with the activity log.
#[utoipa::path(
    get,
    path = "/api/v1/admin/points/{id}/audit",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Audit", body = AuditResponse),
        (status = 403, description = "Not an admin", body = Error),
        (status = 404, description = "No such account", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminAuditBalance"
)]
#[get("/points/{id}/audit")]
pub async fn audit_balance(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<AuditResponse>> {
    session.require_admin()?;
    let user_id = parse_user_id(&path)?;
    let audit = state.points_query.audit(&user_id).await?;
    Ok(web::Json(AuditResponse::from(audit)))
}

/// Reset the balance to the activity log total.
///
/// Returns the audit taken before the reset.
#[utoipa::path(
    post,
    path = "/api/v1/admin/points/{id}/reconcile",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Audit before reconciling", body = AuditResponse),
        (status = 403, description = "Not an admin", body = Error),
        (status = 404, description = "No such account", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminReconcileBalance"
)]
#[post("/points/{id}/reconcile")]
pub async fn reconcile_balance(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<AuditResponse>> {
    session.require_admin()?;
    let user_id = parse_user_id(&path)?;
    let audit = state.points.reconcile(&user_id).await?;
    Ok(web::Json(AuditResponse::from(audit)))
}

/// Probe the database and rate-limit store.
///
/// Answers `503` with the same body when any dependency is unhealthy.
#[utoipa::path(
    get,
    path = "/api/v1/admin/diagnostics",
    responses(
        (status = 200, description = "All dependencies healthy", body = DiagnosticsResponse),
        (status = 403, description = "Not an admin", body = Error),
        (status = 503, description = "A dependency is unhealthy", body = DiagnosticsResponse)
    ),
    tags = ["admin"],
    operation_id = "adminDiagnostics"
)]
#[get("/diagnostics")]
pub async fn diagnostics(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let report = DiagnosticsResponse::from(state.admin.diagnostics().await?);
    let mut response = if report.healthy {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };
    Ok(response.json(report))
}
