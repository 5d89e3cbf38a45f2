//! Prometheus adapter for rate-limit rejection counts.

use async_trait::async_trait;
use prometheus::{IntCounterVec, Opts, Registry};

use crate::domain::ports::{RateLimitMetrics, RateLimitMetricsError};
use crate::domain::rate_limit::RateLimitClass;

/// Counts `429` responses per route class.
///
/// - **Name**: `recruit_rate_limit_rejections_total`
/// - **Type**: Counter
/// - **Labels**: `class` (`login`, `api`, or `admin`)
pub struct PrometheusRateLimitMetrics {
    rejections_total: IntCounterVec,
}

impl PrometheusRateLimitMetrics {
    /// Create the counter and register it with `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error when a metric with the same name is already
    /// registered.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let rejections_total = IntCounterVec::new(
            Opts::new(
                "recruit_rate_limit_rejections_total",
                "Requests refused by the rate limiter, by route class",
            ),
            &["class"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;
        Ok(Self { rejections_total })
    }
}

#[async_trait]
impl RateLimitMetrics for PrometheusRateLimitMetrics {
    async fn record_rejection(&self, class: RateLimitClass) -> Result<(), RateLimitMetricsError> {
        self.rejections_total
            .with_label_values(&[class.as_str()])
            .inc();
        Ok(())
    }
}
