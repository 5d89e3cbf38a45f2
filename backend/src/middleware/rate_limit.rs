//! Per-IP rate limiting for the JSON API.
//!
//! The middleware classifies each request by path, asks the
//! [`RateLimiter`] for a decision, and either forwards the request with
//! `X-RateLimit-*` headers or answers `429` with `Retry-After`. Classes that
//! fail closed surface store outages as `503`.

use std::net::{IpAddr, Ipv4Addr};
use std::rc::Rc;
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use actix_web::{Error, HttpResponse, ResponseError};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{debug, info};

use crate::domain::Error as DomainError;
use crate::domain::rate_limit::{ClientIp, RateLimitClass, RateLimitDecision, RateLimiter};

/// Header carrying the class limit.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Header carrying the points left in the window.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// Header carrying whole seconds until the window resets.
pub const RESET_HEADER: &str = "x-ratelimit-reset";

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Route class for a request path.
///
/// # Examples
/// ```
/// use recruit_backend::domain::rate_limit::RateLimitClass;
/// use recruit_backend::middleware::rate_limit::classify;
///
/// assert_eq!(classify("/api/v1/login/confirm"), RateLimitClass::Login);
/// assert_eq!(classify("/api/v1/admin/users"), RateLimitClass::Admin);
/// assert_eq!(classify("/api/v1/leaderboard"), RateLimitClass::Api);
/// ```
pub fn classify(path: &str) -> RateLimitClass {
    let under = |prefix: &str| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    };
    if under("/api/v1/login") || under("/api/v1/registrations") {
        RateLimitClass::Login
    } else if under("/api/v1/admin") {
        RateLimitClass::Admin
    } else {
        RateLimitClass::Api
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<ClientIp> {
    headers
        .get(FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .parse()
        .ok()
}

fn client_ip(req: &ServiceRequest, trust_forwarded_for: bool) -> ClientIp {
    let forwarded = trust_forwarded_for
        .then(|| forwarded_ip(req.headers()))
        .flatten();
    forwarded
        .or_else(|| req.peer_addr().map(|addr| ClientIp::new(addr.ip())))
        .unwrap_or_else(|| {
            debug!("request without a peer address; using the shared fallback bucket");
            ClientIp::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
        })
}

fn insert_number(headers: &mut HeaderMap, name: &'static str, value: u64) {
    headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
}

fn rejection(limit: u32, retry_after: std::time::Duration) -> HttpResponse {
    let seconds = RateLimitDecision::whole_seconds(retry_after);
    let error = DomainError::too_many_requests("too many requests; retry later")
        .with_details(serde_json::json!({ "retryAfterSeconds": seconds }));
    let mut response = error.error_response();
    let headers = response.headers_mut();
    headers.insert(RETRY_AFTER, HeaderValue::from(seconds));
    insert_number(headers, LIMIT_HEADER, u64::from(limit));
    insert_number(headers, REMAINING_HEADER, 0);
    insert_number(headers, RESET_HEADER, seconds);
    response
}

/// Rate-limiting middleware factory.
///
/// # Examples
/// ```no_run
/// use std::sync::Arc;
///
/// use actix_web::App;
/// use recruit_backend::domain::ports::TokioSleeper;
/// use recruit_backend::domain::rate_limit::RateLimiter;
/// use recruit_backend::middleware::RateLimit;
/// use recruit_backend::outbound::rate_limit::MemoryRateLimitStore;
///
/// let limiter = RateLimiter::new(
///     Arc::new(MemoryRateLimitStore::new()),
///     Arc::new(TokioSleeper),
/// );
/// let app = App::new().wrap(RateLimit::new(limiter, false));
/// ```
#[derive(Clone)]
pub struct RateLimit {
    limiter: RateLimiter,
    trust_forwarded_for: bool,
}

impl RateLimit {
    /// Create the middleware; `trust_forwarded_for` adopts the first
    /// `X-Forwarded-For` entry as the client address.
    pub fn new(limiter: RateLimiter, trust_forwarded_for: bool) -> Self {
        Self {
            limiter,
            trust_forwarded_for,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            trust_forwarded_for: self.trust_forwarded_for,
        }))
    }
}

/// Service wrapper produced by [`RateLimit`].
pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    limiter: RateLimiter,
    trust_forwarded_for: bool,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let limiter = self.limiter.clone();
        let class = classify(req.path());
        let ip = client_ip(&req, self.trust_forwarded_for);

        Box::pin(async move {
            let decision = match limiter.admit(class, ip).await {
                Ok(decision) => decision,
                Err(error) => {
                    let response = error.error_response();
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };
            match decision {
                RateLimitDecision::Rejected { limit, retry_after } => {
                    info!(%class, %ip, retry_after_s = retry_after.as_secs(), "request rate limited");
                    let response = rejection(limit, retry_after);
                    Ok(req.into_response(response).map_into_right_body())
                }
                RateLimitDecision::Unmetered => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                RateLimitDecision::Allowed {
                    limit,
                    remaining,
                    reset_after,
                    ..
                } => {
                    let mut res = service.call(req).await?;
                    let headers = res.headers_mut();
                    insert_number(headers, LIMIT_HEADER, u64::from(limit));
                    insert_number(headers, REMAINING_HEADER, u64::from(remaining));
                    insert_number(
                        headers,
                        RESET_HEADER,
                        RateLimitDecision::whole_seconds(reset_after),
                    );
                    Ok(res.map_into_left_body())
                }
            }
        })
    }
}
