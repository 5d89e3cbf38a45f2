//! Rate-limit store adapters.
//!
//! - **redis**: shared counters for multi-instance deployments.
//! - **memory**: process-local counters for tests and single-node runs.

mod memory_store;
mod redis_store;

pub use memory_store::MemoryRateLimitStore;
pub use redis_store::RedisRateLimitStore;
