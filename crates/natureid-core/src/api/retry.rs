//! Backoff for rate-limited API calls.
//!
//! The taxa service answers HTTP 429 when the anonymous budget is exhausted.
//! Such responses are retried forever with a doubling delay; every other
//! failure is reported to the caller as a failed lookup.

use std::time::Duration;

/// Calculate the delay before retry number `attempt` (0-based).
///
/// Uses `base_delay * 2^attempt`, saturating instead of overflowing. There is
/// no cap: a rate limit that lasts hours yields hour-long sleeps.
pub fn backoff_duration(attempt: u32, base_delay: Duration) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    base_delay.saturating_mul(factor)
}
