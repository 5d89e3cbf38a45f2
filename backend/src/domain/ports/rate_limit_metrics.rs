//! Driven port for counting rate-limit rejections.
//!
//! Implementations may export to Prometheus or discard the counts when the
//! metrics feature is off.

use async_trait::async_trait;

use crate::domain::rate_limit::RateLimitClass;

use super::define_port_error;

define_port_error! {
    /// Errors exposed when recording rate-limit metrics.
    pub enum RateLimitMetricsError {
        /// Metric exporter rejected the write.
        Export { message: String } => "rate limit metrics exporter failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimitMetrics: Send + Sync {
    /// Record one request refused with `429` for `class`.
    async fn record_rejection(&self, class: RateLimitClass) -> Result<(), RateLimitMetricsError>;
}

/// Discards every count.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpRateLimitMetrics;

#[async_trait]
impl RateLimitMetrics for NoOpRateLimitMetrics {
    async fn record_rejection(&self, _class: RateLimitClass) -> Result<(), RateLimitMetricsError> {
        Ok(())
    }
}
