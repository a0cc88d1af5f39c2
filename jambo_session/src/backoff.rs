use std::time::Duration;

/// Exponential reconnect backoff: `min(base * 2^(attempt - 1), cap)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    /// Retries allowed before giving up and waiting for the operator.
    pub max_attempts: u32,
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-based). Attempt 0 is treated
    /// as the first retry.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }

    #[must_use]
    pub const fn is_exhausted(&self, attempt: u32) -> bool {
        attempt > self.max_attempts
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(3),
            cap: Duration::from_secs(60),
            max_attempts: 10,
        }
    }
}
