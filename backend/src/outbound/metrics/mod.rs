//! Prometheus-backed implementations of domain metrics ports.
//!
//! Everything here is gated behind the `metrics` feature.

mod prometheus_rate_limit;

pub use prometheus_rate_limit::PrometheusRateLimitMetrics;
