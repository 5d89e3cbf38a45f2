//! Rate limiter service: suspicion check, counting, escalation, and delay.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{ClientIp, RateLimitClass, RateLimitKey, progressive_delay, saturating_millis};
use crate::domain::Error;
use crate::domain::ports::{
    Consumption, DelaySleeper, NoOpRateLimitMetrics, RateLimitMetrics, RateLimitStore,
    RateLimitStoreError,
};

/// Outcome of admitting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The request was counted and may proceed.
    Allowed {
        limit: u32,
        remaining: u32,
        reset_after: Duration,
        /// Back-off already waited before this decision was returned.
        delay: Duration,
    },
    /// The request must be refused with `429`.
    Rejected { limit: u32, retry_after: Duration },
    /// The store was unavailable and the class fails open.
    Unmetered,
}

impl RateLimitDecision {
    /// Round a duration up to whole seconds, never below one.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use recruit_backend::domain::rate_limit::RateLimitDecision;
    ///
    /// assert_eq!(RateLimitDecision::whole_seconds(Duration::from_millis(1_200)), 2);
    /// assert_eq!(RateLimitDecision::whole_seconds(Duration::ZERO), 1);
    /// ```
    pub fn whole_seconds(duration: Duration) -> u64 {
        let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
        secs.max(1)
    }
}

/// Admits requests against the shared store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    sleeper: Arc<dyn DelaySleeper>,
    metrics: Arc<dyn RateLimitMetrics>,
}

impl RateLimiter {
    /// Create a limiter over `store`, sleeping login back-off with `sleeper`.
    ///
    /// Rejections are not counted until [`RateLimiter::with_metrics`] is
    /// called.
    pub fn new(store: Arc<dyn RateLimitStore>, sleeper: Arc<dyn DelaySleeper>) -> Self {
        Self {
            store,
            sleeper,
            metrics: Arc::new(NoOpRateLimitMetrics),
        }
    }

    /// Count rejections with `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn RateLimitMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Count one request from `ip` against `class`.
    ///
    /// Login back-off is slept before returning. Store failures yield
    /// [`RateLimitDecision::Unmetered`] for classes that fail open and a
    /// `service_unavailable` error otherwise.
    pub async fn admit(
        &self,
        class: RateLimitClass,
        ip: ClientIp,
    ) -> Result<RateLimitDecision, Error> {
        let decision = match self.evaluate(class, ip).await {
            Ok(decision) => decision,
            Err(err) if class.fails_open() => {
                warn!(%class, %ip, error = %err, "rate limit store unavailable; admitting request");
                return Ok(RateLimitDecision::Unmetered);
            }
            Err(err) => {
                warn!(%class, %ip, error = %err, "rate limit store unavailable; refusing request");
                return Err(Error::service_unavailable("rate limiting is temporarily unavailable"));
            }
        };
        match decision {
            RateLimitDecision::Allowed { delay, .. } if !delay.is_zero() => {
                debug!(%class, %ip, delay_ms = saturating_millis(delay), "delaying login attempt");
                self.sleeper.sleep(delay).await;
            }
            RateLimitDecision::Rejected { .. } => {
                if let Err(err) = self.metrics.record_rejection(class).await {
                    debug!(%class, error = %err, "rate limit rejection not recorded");
                }
            }
            _ => {}
        }
        Ok(decision)
    }

    async fn evaluate(
        &self,
        class: RateLimitClass,
        ip: ClientIp,
    ) -> Result<RateLimitDecision, RateLimitStoreError> {
        let policy = class.policy();
        let suspicion = RateLimitKey::new(RateLimitClass::Suspicious, ip);
        if let Some(retry_after) = self.store.blocked_for(&suspicion).await? {
            return Ok(RateLimitDecision::Rejected {
                limit: policy.points,
                retry_after,
            });
        }

        let key = RateLimitKey::new(class, ip);
        match self.store.consume(&key, &policy).await? {
            Consumption::Blocked { retry_after } => {
                self.flag_suspicious(ip).await;
                Ok(RateLimitDecision::Rejected {
                    limit: policy.points,
                    retry_after,
                })
            }
            Consumption::Counted {
                consumed,
                reset_after,
            } if consumed > policy.points => {
                self.flag_suspicious(ip).await;
                Ok(RateLimitDecision::Rejected {
                    limit: policy.points,
                    retry_after: policy.block.unwrap_or(reset_after),
                })
            }
            Consumption::Counted {
                consumed,
                reset_after,
            } => {
                let delay = if class.is_progressive() {
                    progressive_delay(consumed.saturating_sub(1))
                } else {
                    Duration::ZERO
                };
                Ok(RateLimitDecision::Allowed {
                    limit: policy.points,
                    remaining: policy.points - consumed,
                    reset_after,
                    delay,
                })
            }
        }
    }

    async fn flag_suspicious(&self, ip: ClientIp) {
        if let Err(err) = self.count_suspicion(ip).await {
            warn!(%ip, error = %err, "failed to record rate limit rejection");
        }
    }

    async fn count_suspicion(&self, ip: ClientIp) -> Result<(), RateLimitStoreError> {
        let class = RateLimitClass::Suspicious;
        let policy = class.policy();
        let key = RateLimitKey::new(class, ip);
        let Consumption::Counted { consumed, .. } = self.store.consume(&key, &policy).await? else {
            return Ok(());
        };
        if consumed < policy.points {
            return Ok(());
        }
        if let Some(block) = policy.block {
            warn!(%ip, rejections = consumed, block_secs = block.as_secs(), "blocking suspicious client");
            self.store.block(&key, block).await?;
        }
        Ok(())
    }
}
