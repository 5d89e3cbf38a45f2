//! Fixed-window rate limiting keyed by client IP and route class.
//!
//! Counters and block markers live in a shared [`RateLimitStore`] so every
//! instance sees the same state. Suspicion is tracked as a fourth class whose
//! block marker rejects an IP across every other class.
//!
//! [`RateLimitStore`]: crate::domain::ports::RateLimitStore

mod delay;
mod service;

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

pub use delay::{MAX_LOGIN_DELAY, progressive_delay, saturating_millis};
pub use service::{RateLimitDecision, RateLimiter};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);

/// Route class a request is counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitClass {
    /// Sign-in and registration.
    Login,
    /// General API traffic.
    Api,
    /// Back-office routes.
    Admin,
    /// Rejections recorded against an IP.
    Suspicious,
}

impl RateLimitClass {
    /// Key segment.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Api => "api",
            Self::Admin => "admin",
            Self::Suspicious => "suspicious",
        }
    }

    /// Limits applied to the class.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use recruit_backend::domain::rate_limit::RateLimitClass;
    ///
    /// let login = RateLimitClass::Login.policy();
    /// assert_eq!(login.points, 5);
    /// assert_eq!(login.block, Some(Duration::from_secs(3600)));
    /// ```
    pub const fn policy(self) -> RateLimitPolicy {
        match self {
            Self::Login => RateLimitPolicy {
                points: 5,
                window: Duration::from_secs(15 * 60),
                block: Some(HOUR),
            },
            Self::Api => RateLimitPolicy {
                points: 100,
                window: MINUTE,
                block: None,
            },
            Self::Admin => RateLimitPolicy {
                points: 50,
                window: MINUTE,
                block: None,
            },
            Self::Suspicious => RateLimitPolicy {
                points: 10,
                window: HOUR,
                block: Some(Duration::from_secs(24 * 60 * 60)),
            },
        }
    }

    /// Whether requests proceed unmetered when the store is unavailable.
    pub const fn fails_open(self) -> bool {
        matches!(self, Self::Api)
    }

    /// Whether admitted requests are slowed by [`progressive_delay`].
    pub const fn is_progressive(self) -> bool {
        matches!(self, Self::Login)
    }
}

impl fmt::Display for RateLimitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Points allowed per window and the block applied once they run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub points: u32,
    pub window: Duration,
    pub block: Option<Duration>,
}

/// Client address a limit is tracked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientIp(IpAddr);

impl ClientIp {
    /// Wrap an address.
    pub const fn new(ip: IpAddr) -> Self {
        Self(ip)
    }

    /// Underlying address.
    pub const fn ip(&self) -> IpAddr {
        self.0
    }
}

impl From<IpAddr> for ClientIp {
    fn from(ip: IpAddr) -> Self {
        Self(ip)
    }
}

impl FromStr for ClientIp {
    type Err = std::net::AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl fmt::Display for ClientIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Store key for one class and IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub class: RateLimitClass,
    pub ip: ClientIp,
}

impl RateLimitKey {
    /// Build a key.
    pub const fn new(class: RateLimitClass, ip: ClientIp) -> Self {
        Self { class, ip }
    }

    /// Counter key, `rl:{class}:{ip}`.
    pub fn counter_key(&self) -> String {
        format!("rl:{}:{}", self.class, self.ip)
    }

    /// Block marker key, `rl:{class}:{ip}:block`.
    pub fn block_key(&self) -> String {
        format!("rl:{}:{}:block", self.class, self.ip)
    }
}
