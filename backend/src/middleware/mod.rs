//! Request middleware.
//!
//! Purpose: define middleware components for request lifecycle concerns such
//! as tracing and per-IP rate limiting.

pub mod rate_limit;
pub mod trace;

pub use rate_limit::RateLimit;
pub use trace::Trace;
