//! Server-sent engagement snapshots.
//!
//! ```text
//! GET /api/v1/engagement/stream
//! ```
//!
//! The stream opens with a `retry:` hint and the current snapshot, then sends
//! a fresh snapshot after every event concerning the subscriber and on each
//! refresh tick. Events carry no payload worth trusting: every frame is a
//! full re-query, so a lagged receiver just triggers one more snapshot.

use std::convert::Infallible;
use std::sync::Arc;

use actix_web::http::header;
use actix_web::web::Bytes;
use actix_web::{HttpResponse, get, web};
use futures_util::Stream;
use futures_util::stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

use crate::domain::ports::{EngagementEvent, EngagementQuery};
use crate::domain::{Error, ErrorCode, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::error::redact_if_internal;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::{HttpState, StreamSettings};

/// SSE event name carrying an engagement snapshot.
pub const SNAPSHOT_EVENT: &str = "snapshot";
/// SSE event name carrying a terminal error.
pub const ERROR_EVENT: &str = "error";

fn frame(event: &str, data: &str) -> Bytes {
    Bytes::from(format!("event: {event}\ndata: {data}\n\n"))
}

fn error_frame(error: &Error) -> Bytes {
    let data = serde_json::to_string(&redact_if_internal(error))
        .unwrap_or_else(|_| String::from("{\"code\":\"internal_error\"}"));
    frame(ERROR_EVENT, &data)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Retry,
    Initial,
    Waiting,
    Closed,
}

struct Subscription {
    user_id: UserId,
    engagement: Arc<dyn EngagementQuery>,
    events: broadcast::Receiver<EngagementEvent>,
    ticker: Interval,
    retry_hint: u128,
    phase: Phase,
}

enum Wake {
    Refresh,
    Stop,
}

impl Subscription {
    async fn next_wake(&mut self) -> Wake {
        loop {
            tokio::select! {
                _ = self.ticker.tick() => return Wake::Refresh,
                received = self.events.recv() => match received {
                    Ok(EngagementEvent::AccountRemoved { user_id }) if user_id == self.user_id => {
                        return Wake::Stop;
                    }
                    Ok(event) if event.user_id() == self.user_id => return Wake::Refresh,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(user_id = %self.user_id, skipped, "engagement stream lagged");
                        return Wake::Refresh;
                    }
                    Err(RecvError::Closed) => return Wake::Stop,
                },
            }
        }
    }

    async fn snapshot(&mut self) -> Bytes {
        let result = self
            .engagement
            .summary(&self.user_id)
            .await
            .and_then(|snapshot| {
                serde_json::to_string(&snapshot).map_err(|err| {
                    Error::internal(format!("failed to encode engagement snapshot: {err}"))
                })
            });
        match result {
            Ok(data) => frame(SNAPSHOT_EVENT, &data),
            Err(error) => {
                if error.code() != ErrorCode::NotFound {
                    warn!(user_id = %self.user_id, error = %error, "engagement stream query failed");
                }
                self.phase = Phase::Closed;
                error_frame(&error)
            }
        }
    }

    async fn next_frame(mut self) -> Option<(Result<Bytes, Infallible>, Self)> {
        let bytes = match self.phase {
            Phase::Closed => return None,
            Phase::Retry => {
                self.phase = Phase::Initial;
                Bytes::from(format!("retry: {}\n\n", self.retry_hint))
            }
            Phase::Initial => {
                self.phase = Phase::Waiting;
                self.snapshot().await
            }
            Phase::Waiting => match self.next_wake().await {
                Wake::Stop => return None,
                Wake::Refresh => self.snapshot().await,
            },
        };
        Some((Ok(bytes), self))
    }
}

/// Frames for one subscriber.
///
/// The receiver should be subscribed before calling so no event published
/// in between is missed.
pub fn snapshot_stream(
    user_id: UserId,
    engagement: Arc<dyn EngagementQuery>,
    events: broadcast::Receiver<EngagementEvent>,
    settings: StreamSettings,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    let mut ticker = interval_at(
        Instant::now() + settings.refresh_interval,
        settings.refresh_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let subscription = Subscription {
        user_id,
        engagement,
        events,
        ticker,
        retry_hint: settings.retry_hint.as_millis(),
        phase: Phase::Retry,
    };
    stream::unfold(subscription, Subscription::next_frame)
}

/// Live engagement snapshots for the signed-in user.
#[utoipa::path(
    get,
    path = "/api/v1/engagement/stream",
    responses(
        (status = 200, description = "Snapshot event stream", content_type = "text/event-stream", body = String),
        (status = 401, description = "Not signed in", body = Error)
    ),
    tags = ["engagement"],
    operation_id = "engagementStream"
)]
#[get("/engagement/stream")]
pub async fn engagement_stream(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let user = session.require_user()?;
    let events = state.events.subscribe();
    debug!(user_id = %user.user_id, "engagement stream opened");
    let frames = snapshot_stream(user.user_id, state.engagement.clone(), events, state.stream);
    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(frames))
}
