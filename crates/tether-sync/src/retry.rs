//! Reconnection backoff policy.

use std::time::Duration;

/// Exponential backoff with a cap and a bounded attempt budget.
///
/// `delay(n)` is the pause scheduled after the `n`-th consecutive failure
/// (zero-based). Once the budget is exhausted the channel gives up and
/// only an explicit reconnect restarts it.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            cap,
            max_attempts,
        }
    }

    /// `min(base * 2^attempt, cap)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt);
        factor
            .and_then(|f| self.base.checked_mul(f))
            .map(|d| d.min(self.cap))
            .unwrap_or(self.cap)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1000),
            cap: Duration::from_millis(30_000),
            max_attempts: 5,
        }
    }
}
