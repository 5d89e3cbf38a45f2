//! Progressive back-off applied to admitted login attempts.

use std::time::Duration;

/// Upper bound on the login delay.
pub const MAX_LOGIN_DELAY: Duration = Duration::from_secs(30);

/// Delay before handling a login attempt when `used` attempts were already
/// made in the current window: `min(1s * 2^(used - 1), 30s)`, zero when
/// `used` is zero.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use recruit_backend::domain::rate_limit::progressive_delay;
///
/// assert_eq!(progressive_delay(0), Duration::ZERO);
/// assert_eq!(progressive_delay(3), Duration::from_secs(4));
/// assert_eq!(progressive_delay(40), Duration::from_secs(30));
/// ```
pub fn progressive_delay(used: u32) -> Duration {
    if used == 0 {
        return Duration::ZERO;
    }
    let exponent = used - 1;
    if exponent >= 5 {
        return MAX_LOGIN_DELAY;
    }
    Duration::from_secs(1_u64 << exponent).min(MAX_LOGIN_DELAY)
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
