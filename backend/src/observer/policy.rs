//! Reconnect policy for engagement observers.
//!
//! The observer prefers the event stream. Consecutive stream failures back
//! off exponentially; once the failure threshold is reached it falls back to
//! fixed-interval polling and probes the stream again after a fixed number of
//! polls. Any message received over the stream resets the policy.

use std::time::Duration;

/// Tunables for [`ObserverPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub failure_threshold: u32,
    pub poll_interval: Duration,
    pub polls_before_retry: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            failure_threshold: 3,
            poll_interval: Duration::from_secs(30),
            polls_before_retry: 10,
        }
    }
}

/// Where the observer currently gets snapshots from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverMode {
    /// Connected to, or about to open, the event stream.
    Streaming,
    /// Waiting before reconnect attempt `attempt` (1-based).
    Backoff { attempt: u32 },
    /// Fetching snapshots on a timer; `polls` completed since falling back.
    Polling { polls: u32 },
}

/// What the observer should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverAction {
    /// Open the event stream after waiting.
    OpenStream { after: Duration },
    /// Fetch one snapshot after waiting.
    Poll { after: Duration },
}

/// Stream/poll state machine.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use recruit_backend::observer::{ObserverAction, ObserverMode, ObserverPolicy};
///
/// let mut policy = ObserverPolicy::default();
/// assert_eq!(
///     policy.on_stream_failure(),
///     ObserverAction::OpenStream { after: Duration::from_secs(1) }
/// );
/// policy.on_stream_failure();
/// policy.on_stream_failure();
/// assert_eq!(policy.mode(), ObserverMode::Polling { polls: 0 });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverPolicy {
    config: PolicyConfig,
    mode: ObserverMode,
    consecutive_failures: u32,
}

impl Default for ObserverPolicy {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

impl ObserverPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            mode: ObserverMode::Streaming,
            consecutive_failures: 0,
        }
    }

    pub fn mode(&self) -> ObserverMode {
        self.mode
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// First action for a fresh observer.
    pub fn start(&self) -> ObserverAction {
        ObserverAction::OpenStream {
            after: Duration::ZERO,
        }
    }

    /// Delay before reconnect attempt `attempt`, doubling from the initial
    /// back-off and capped at the maximum.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.config
            .initial_backoff
            .saturating_mul(1_u32 << exponent)
            .min(self.config.max_backoff)
    }

    /// A snapshot arrived over the stream.
    pub fn on_stream_message(&mut self) {
        self.mode = ObserverMode::Streaming;
        self.consecutive_failures = 0;
    }

    /// The stream could not be opened or ended.
    pub fn on_stream_failure(&mut self) -> ObserverAction {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures >= self.config.failure_threshold {
            self.mode = ObserverMode::Polling { polls: 0 };
            return ObserverAction::Poll {
                after: self.config.poll_interval,
            };
        }
        let attempt = self.consecutive_failures;
        self.mode = ObserverMode::Backoff { attempt };
        ObserverAction::OpenStream {
            after: self.backoff_for(attempt),
        }
    }

    /// A poll finished, successfully or not.
    pub fn on_poll_completed(&mut self) -> ObserverAction {
        let polls = match self.mode {
            ObserverMode::Polling { polls } => polls.saturating_add(1),
            ObserverMode::Streaming | ObserverMode::Backoff { .. } => 1,
        };
        if polls >= self.config.polls_before_retry {
            self.mode = ObserverMode::Streaming;
            return ObserverAction::OpenStream {
                after: Duration::ZERO,
            };
        }
        self.mode = ObserverMode::Polling { polls };
        ObserverAction::Poll {
            after: self.config.poll_interval,
        }
    }
}
