//! Driven port for shared rate-limit counters and block markers.
//!
//! One `consume` call is one atomic step in the store: check the block
//! marker, count the hit, and set the block marker once a blocking policy is
//! exhausted.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::rate_limit::{RateLimitKey, RateLimitPolicy};

use super::define_port_error;

define_port_error! {
    /// Errors raised by rate-limit store adapters.
    pub enum RateLimitStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "rate limit store connection failed: {message}",
        /// A store command failed.
        Command { message: String } => "rate limit store command failed: {message}",
    }
}

/// Result of counting one hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumption {
    /// The hit was counted; `consumed` includes it and may exceed the limit
    /// for non-blocking policies.
    Counted { consumed: u32, reset_after: Duration },
    /// The key is blocked; nothing was counted.
    Blocked { retry_after: Duration },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one hit against `key` within the policy window.
    async fn consume(
        &self,
        key: &RateLimitKey,
        policy: &RateLimitPolicy,
    ) -> Result<Consumption, RateLimitStoreError>;

    /// Remaining block time for `key`, if blocked.
    async fn blocked_for(&self, key: &RateLimitKey) -> Result<Option<Duration>, RateLimitStoreError>;

    /// Block `key` for `duration`, replacing any shorter block.
    async fn block(&self, key: &RateLimitKey, duration: Duration) -> Result<(), RateLimitStoreError>;
}
