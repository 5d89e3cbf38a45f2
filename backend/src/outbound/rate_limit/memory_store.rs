//! Process-local `RateLimitStore`.
//!
//! Holds one mutex for the whole check-count-block step, mirroring the
//! atomicity of the Redis script. Uses `tokio::time::Instant` so tests can
//! drive expiry with a paused clock.
//!
//! Expired windows and blocks are dropped by a sweep that runs at most once
//! a minute, on the next call after the interval.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::domain::ports::{
    Consumption, DependencyProbe, ProbeError, RateLimitStore, RateLimitStoreError,
};
use crate::domain::rate_limit::{RateLimitKey, RateLimitPolicy};

/// Minimum time between sweeps of expired entries.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct State {
    windows: HashMap<String, Window>,
    blocks: HashMap<String, Instant>,
    next_sweep: Option<Instant>,
}

impl State {
    fn sweep_expired(&mut self, now: Instant) {
        if self.next_sweep.is_some_and(|at| now < at) {
            return;
        }
        self.windows.retain(|_, window| window.expires_at > now);
        self.blocks.retain(|_, until| *until > now);
        self.next_sweep = Some(now + SWEEP_INTERVAL);
    }

    fn remaining_block(&mut self, key: &str, now: Instant) -> Option<Duration> {
        let until = *self.blocks.get(key)?;
        if until <= now {
            self.blocks.remove(key);
            return None;
        }
        Some(until - now)
    }
}

/// In-memory rate-limit store.
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    state: Mutex<State>,
}

impl MemoryRateLimitStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, RateLimitStoreError> {
        self.state
            .lock()
            .map_err(|_| RateLimitStoreError::command("rate limit state poisoned"))
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn consume(
        &self,
        key: &RateLimitKey,
        policy: &RateLimitPolicy,
    ) -> Result<Consumption, RateLimitStoreError> {
        let now = Instant::now();
        let mut state = self.lock()?;
        state.sweep_expired(now);
        let block_key = key.block_key();
        if let Some(retry_after) = state.remaining_block(&block_key, now) {
            return Ok(Consumption::Blocked { retry_after });
        }

        let counter_key = key.counter_key();
        let window = state
            .windows
            .entry(counter_key.clone())
            .and_modify(|window| {
                if window.expires_at <= now {
                    *window = Window {
                        count: 0,
                        expires_at: now + policy.window,
                    };
                }
            })
            .or_insert(Window {
                count: 0,
                expires_at: now + policy.window,
            });
        window.count = window.count.saturating_add(1);
        let Window { count, expires_at } = *window;

        if let Some(block) = policy.block.filter(|_| count > policy.points) {
            state.blocks.insert(block_key, now + block);
            state.windows.remove(&counter_key);
        }
        Ok(Consumption::Counted {
            consumed: count,
            reset_after: expires_at - now,
        })
    }

    async fn blocked_for(&self, key: &RateLimitKey) -> Result<Option<Duration>, RateLimitStoreError> {
        let now = Instant::now();
        let mut state = self.lock()?;
        Ok(state.remaining_block(&key.block_key(), now))
    }

    async fn block(&self, key: &RateLimitKey, duration: Duration) -> Result<(), RateLimitStoreError> {
        let now = Instant::now();
        let mut state = self.lock()?;
        state.sweep_expired(now);
        let until = now + duration;
        state
            .blocks
            .entry(key.block_key())
            .and_modify(|existing| *existing = (*existing).max(until))
            .or_insert(until);
        Ok(())
    }
}

#[async_trait]
impl DependencyProbe for MemoryRateLimitStore {
    fn name(&self) -> &'static str {
        "rate_limit_memory"
    }

    async fn check(&self) -> Result<(), ProbeError> {
        self.lock()
            .map(|_| ())
            .map_err(|err| ProbeError::unavailable(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rate_limit::{ClientIp, RateLimitClass};
    use rstest::{fixture, rstest};

    #[fixture]
    fn login_key() -> RateLimitKey {
        let ip: ClientIp = "192.0.2.10".parse().expect("ip");
        RateLimitKey::new(RateLimitClass::Login, ip)
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn counts_within_the_window_then_resets(login_key: RateLimitKey) {
        let store = MemoryRateLimitStore::new();
        let policy = RateLimitClass::Api.policy();
        for expected in 1..=3 {
            let consumption = store.consume(&login_key, &policy).await.expect("consume");
            assert!(matches!(consumption, Consumption::Counted { consumed, .. } if consumed == expected));
        }
        tokio::time::advance(policy.window).await;
        let consumption = store.consume(&login_key, &policy).await.expect("consume");
        assert_eq!(
            consumption,
            Consumption::Counted {
                consumed: 1,
                reset_after: policy.window,
            }
        );
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn exhausting_a_blocking_policy_sets_the_block(login_key: RateLimitKey) {
        let store = MemoryRateLimitStore::new();
        let policy = RateLimitClass::Login.policy();
        for _ in 0..=policy.points {
            store.consume(&login_key, &policy).await.expect("consume");
        }
        let consumption = store.consume(&login_key, &policy).await.expect("consume");
        assert_eq!(
            consumption,
            Consumption::Blocked {
                retry_after: Duration::from_secs(3_600),
            }
        );

        tokio::time::advance(Duration::from_secs(3_600)).await;
        assert_eq!(store.blocked_for(&login_key).await.expect("lookup"), None);
    }

    fn api_key(octet: u8, host: u8) -> RateLimitKey {
        let ip: ClientIp = format!("198.51.{octet}.{host}").parse().expect("ip");
        RateLimitKey::new(RateLimitClass::Api, ip)
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn expired_entries_are_swept_once_idle(login_key: RateLimitKey) {
        let store = MemoryRateLimitStore::new();
        let policy = RateLimitClass::Api.policy();
        for octet in 0..4 {
            for host in 0..250 {
                store
                    .consume(&api_key(octet, host), &policy)
                    .await
                    .expect("consume");
            }
        }
        store
            .block(&login_key, Duration::from_secs(600))
            .await
            .expect("block");
        {
            let state = store.lock().expect("state");
            assert_eq!(state.windows.len(), 1_000);
            assert_eq!(state.blocks.len(), 1);
        }

        tokio::time::advance(Duration::from_secs(3_600)).await;
        store
            .consume(&api_key(9, 9), &policy)
            .await
            .expect("consume");

        let state = store.lock().expect("state");
        assert_eq!(state.windows.len(), 1);
        assert!(state.blocks.is_empty());
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn live_entries_survive_a_sweep(login_key: RateLimitKey) {
        let store = MemoryRateLimitStore::new();
        let policy = RateLimitClass::Login.policy();
        store.consume(&login_key, &policy).await.expect("consume");
        tokio::time::advance(SWEEP_INTERVAL).await;
        let consumption = store.consume(&login_key, &policy).await.expect("consume");
        assert!(matches!(consumption, Consumption::Counted { consumed: 2, .. }));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn explicit_blocks_never_shorten(login_key: RateLimitKey) {
        let store = MemoryRateLimitStore::new();
        store
            .block(&login_key, Duration::from_secs(100))
            .await
            .expect("block");
        store
            .block(&login_key, Duration::from_secs(10))
            .await
            .expect("block");
        assert_eq!(
            store.blocked_for(&login_key).await.expect("lookup"),
            Some(Duration::from_secs(100))
        );
    }
}
