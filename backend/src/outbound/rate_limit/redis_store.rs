//! Redis-backed `RateLimitStore` using `bb8-redis`.
//!
//! Each consumption runs one Lua script so the block check, the increment,
//! the window expiry, and block escalation happen atomically on the server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::{Pool, PooledConnection, RunError};
use bb8_redis::redis::{self, RedisError, Script};

use crate::domain::ports::{
    Consumption, DependencyProbe, ProbeError, RateLimitStore, RateLimitStoreError,
};
use crate::domain::rate_limit::{RateLimitKey, RateLimitPolicy, saturating_millis};

/// KEYS: counter, block marker. ARGV: window ms, limit, block ms (0 = none).
/// Returns `{-1, block_ttl_ms}` when blocked, otherwise `{count, window_ttl_ms}`.
const CONSUME_SCRIPT: &str = r"
local blocked = redis.call('PTTL', KEYS[2])
if blocked > 0 then
  return {-1, blocked}
end
local current = redis.call('INCR', KEYS[1])
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
  ttl = tonumber(ARGV[1])
end
local block_ms = tonumber(ARGV[3])
if block_ms > 0 and current > tonumber(ARGV[2]) then
  redis.call('SET', KEYS[2], '1', 'PX', block_ms)
  redis.call('DEL', KEYS[1])
end
return {current, ttl}
";

/// KEYS: block marker. ARGV: block ms. Extends but never shortens a block.
const BLOCK_SCRIPT: &str = r"
local remaining = redis.call('PTTL', KEYS[1])
if remaining < tonumber(ARGV[1]) then
  redis.call('SET', KEYS[1], '1', 'PX', ARGV[1])
end
return 1
";

fn map_redis_error(error: RedisError) -> RateLimitStoreError {
    if error.is_io_error() || error.is_connection_refusal() || error.is_timeout() {
        RateLimitStoreError::connection(error.to_string())
    } else {
        RateLimitStoreError::command(error.to_string())
    }
}

fn map_pool_error(error: RunError<RedisError>) -> RateLimitStoreError {
    match error {
        RunError::User(err) => map_redis_error(err),
        RunError::TimedOut => RateLimitStoreError::connection("timed out waiting for redis"),
    }
}

/// Shared rate-limit store.
#[derive(Clone)]
pub struct RedisRateLimitStore {
    pool: Pool<RedisConnectionManager>,
    consume: Arc<Script>,
    block: Arc<Script>,
}

impl RedisRateLimitStore {
    /// Create a lazily connecting pool for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitStoreError::Connection`] when the URL is invalid.
    pub fn connect(url: &str) -> Result<Self, RateLimitStoreError> {
        let manager = RedisConnectionManager::new(url).map_err(map_redis_error)?;
        let pool = Pool::builder()
            .max_size(16)
            .connection_timeout(Duration::from_secs(2))
            .build_unchecked(manager);
        Ok(Self {
            pool,
            consume: Arc::new(Script::new(CONSUME_SCRIPT)),
            block: Arc::new(Script::new(BLOCK_SCRIPT)),
        })
    }

    async fn connection(
        &self,
    ) -> Result<PooledConnection<'_, RedisConnectionManager>, RateLimitStoreError> {
        self.pool.get().await.map_err(map_pool_error)
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn consume(
        &self,
        key: &RateLimitKey,
        policy: &RateLimitPolicy,
    ) -> Result<Consumption, RateLimitStoreError> {
        let mut conn = self.connection().await?;
        let (count, ttl_ms): (i64, i64) = self
            .consume
            .key(key.counter_key())
            .key(key.block_key())
            .arg(saturating_millis(policy.window))
            .arg(policy.points)
            .arg(policy.block.map_or(0, saturating_millis))
            .invoke_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        let ttl = Duration::from_millis(u64::try_from(ttl_ms).unwrap_or(0));
        if count < 0 {
            return Ok(Consumption::Blocked { retry_after: ttl });
        }
        Ok(Consumption::Counted {
            consumed: u32::try_from(count).unwrap_or(u32::MAX),
            reset_after: ttl,
        })
    }

    async fn blocked_for(&self, key: &RateLimitKey) -> Result<Option<Duration>, RateLimitStoreError> {
        let mut conn = self.connection().await?;
        let ttl_ms: i64 = redis::cmd("PTTL")
            .arg(key.block_key())
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        Ok(u64::try_from(ttl_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis))
    }

    async fn block(&self, key: &RateLimitKey, duration: Duration) -> Result<(), RateLimitStoreError> {
        let mut conn = self.connection().await?;
        let _: i64 = self
            .block
            .key(key.block_key())
            .arg(saturating_millis(duration))
            .invoke_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }
}

#[async_trait]
impl DependencyProbe for RedisRateLimitStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn check(&self) -> Result<(), ProbeError> {
        let mut conn = self
            .connection()
            .await
            .map_err(|err| ProbeError::unavailable(err.to_string()))?;
        let _: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|err| ProbeError::unavailable(err.to_string()))?;
        Ok(())
    }
}
