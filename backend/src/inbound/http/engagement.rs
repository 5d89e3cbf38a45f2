//! Engagement read models and self-reported activities.
//!
//! ```text
//! GET  /api/v1/engagement/summary
//! GET  /api/v1/engagement/badges
//! GET  /api/v1/engagement/history?limit=25&cursor=...
//! POST /api/v1/engagement/activities {"activity":"trivia_completed"}
//! GET  /api/v1/leaderboard?limit=25&cursor=...
//! ```

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use pagination::Page;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::badges::AwardTier;
use crate::domain::engagement::{BadgeView, EngagementSnapshot, LeaderboardEntry, LeaderboardKey};
use crate::domain::points::{ActivityEntry, AwardOutcome, HistoryKey};
use crate::domain::ports::ActivityReport;
use crate::domain::Error;
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{PageQuery, list_bounds};

/// Result of a credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwardResponse {
    #[schema(value_type = String, format = Uuid)]
    pub user_id: String,
    pub points_awarded: u32,
    pub new_balance: u64,
    #[schema(value_type = String, format = Uuid)]
    pub entry_id: String,
    /// Badge ids unlocked by this credit.
    pub unlocked_badges: Vec<String>,
    pub tier: Option<AwardTier>,
}

impl From<AwardOutcome> for AwardResponse {
    fn from(outcome: AwardOutcome) -> Self {
        Self {
            user_id: outcome.user_id.to_string(),
            points_awarded: outcome.points_awarded,
            new_balance: outcome.new_balance,
            entry_id: outcome.entry_id.to_string(),
            unlocked_badges: outcome
                .unlocked_badges
                .into_iter()
                .map(str::to_owned)
                .collect(),
            tier: outcome.tier,
        }
    }
}

/// Activity log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntryResponse {
    #[schema(value_type = String, format = Uuid)]
    pub id: String,
    pub points: u32,
    pub activity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ledger the entry was written to.
    pub ledger: String,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityEntry> for ActivityEntryResponse {
    fn from(entry: ActivityEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            points: entry.points,
            activity: entry.activity,
            description: entry.description,
            ledger: entry.ledger.as_str().to_owned(),
            created_at: entry.created_at,
        }
    }
}

/// Page of activity log entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub items: Vec<ActivityEntryResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl From<Page<ActivityEntry>> for HistoryPage {
    fn from(page: Page<ActivityEntry>) -> Self {
        let (items, next_cursor) = page.map(ActivityEntryResponse::from).into_parts();
        Self { items, next_cursor }
    }
}

/// Page of leaderboard entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPage {
    pub items: Vec<LeaderboardEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Self-reported catalogue activity.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityBody {
    /// Catalogue slug such as `trivia_completed`.
    pub activity: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Balance, rank, tier, and badges for the signed-in user.
#[utoipa::path(
    get,
    path = "/api/v1/engagement/summary",
    responses(
        (status = 200, description = "Engagement snapshot", body = EngagementSnapshot),
        (status = 401, description = "Not signed in", body = Error),
        (status = 404, description = "Account was deleted", body = Error)
    ),
    tags = ["engagement"],
    operation_id = "engagementSummary"
)]
#[get("/engagement/summary")]
pub async fn summary(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<EngagementSnapshot>> {
    let user = session.require_user()?;
    let snapshot = state.engagement.summary(&user.user_id).await?;
    Ok(web::Json(snapshot))
}

/// Badge statuses for the signed-in user.
#[utoipa::path(
    get,
    path = "/api/v1/engagement/badges",
    responses(
        (status = 200, description = "Badge statuses", body = [BadgeView]),
        (status = 401, description = "Not signed in", body = Error)
    ),
    tags = ["engagement"],
    operation_id = "engagementBadges"
)]
#[get("/engagement/badges")]
pub async fn badges(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<BadgeView>>> {
    let user = session.require_user()?;
    let badges = state.engagement.badges(&user.user_id).await?;
    Ok(web::Json(badges))
}

/// Activity log of the signed-in user, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/engagement/history",
    params(PageQuery),
    responses(
        (status = 200, description = "Activity history", body = HistoryPage),
        (status = 400, description = "Invalid limit or cursor", body = Error),
        (status = 401, description = "Not signed in", body = Error)
    ),
    tags = ["engagement"],
    operation_id = "engagementHistory"
)]
#[get("/engagement/history")]
pub async fn history(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<HistoryPage>> {
    let user = session.require_user()?;
    let page = query.into_request::<HistoryKey>(list_bounds())?;
    let entries = state.points_query.history(&user.user_id, &page).await?;
    Ok(web::Json(HistoryPage::from(entries)))
}

/// Record a catalogue activity; the server decides the points.
#[utoipa::path(
    post,
    path = "/api/v1/engagement/activities",
    request_body = ActivityBody,
    responses(
        (status = 201, description = "Activity credited", body = AwardResponse),
        (status = 400, description = "Unknown or admin-only activity", body = Error),
        (status = 401, description = "Not signed in", body = Error),
        (status = 403, description = "Account may not earn points", body = Error)
    ),
    tags = ["engagement"],
    operation_id = "recordActivity"
)]
#[post("/engagement/activities")]
pub async fn record_activity(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<ActivityBody>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user()?;
    let ActivityBody {
        activity,
        description,
    } = payload.into_inner();
    let outcome = state
        .points
        .record_activity(&ActivityReport {
            user_id: user.user_id,
            activity,
            description,
        })
        .await?;
    Ok(HttpResponse::Created().json(AwardResponse::from(outcome)))
}

/// Ranked leaderboard, highest balance first.
///
/// A `Link: <...>; rel="next"` header accompanies every page that has a
/// successor.
#[utoipa::path(
    get,
    path = "/api/v1/leaderboard",
    params(PageQuery),
    responses(
        (status = 200, description = "Leaderboard page", body = LeaderboardPage,
            headers(("Link" = String, description = "Next page, when one exists"))),
        (status = 400, description = "Invalid limit or cursor", body = Error)
    ),
    tags = ["engagement"],
    operation_id = "leaderboard",
    security([])
)]
#[get("/leaderboard")]
pub async fn leaderboard(
    req: HttpRequest,
    state: web::Data<HttpState>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let page = query.into_request::<LeaderboardKey>(list_bounds())?;
    let entries = state.engagement.leaderboard(&page).await?;
    let next = entries.next_link(&req.full_url(), page.limit());
    let (items, next_cursor) = entries.into_parts();

    let mut response = HttpResponse::Ok();
    if let Some(next) = next {
        response.insert_header((header::LINK, format!("<{next}>; rel=\"next\"")));
    }
    Ok(response.json(LeaderboardPage { items, next_cursor }))
}
