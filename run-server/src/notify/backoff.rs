//! Exponential backoff with full jitter
//!
//! ```text
//! Attempt index    Ceiling (base=1s)    Delay drawn from
//! ───────────────────────────────────────────────────────
//!       0                1s               [0s, 1s)
//!       1                2s               [0s, 2s)
//!       2                4s               [0s, 4s)
//!       3                8s               [0s, 8s)
//! ```
//!
//! No delay follows the last attempt; the dispatcher gives up instead.

use rand::Rng;
use std::time::Duration;

/// Default number of send attempts per dispatch
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Backoff policy shared by every dispatch of a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    max_attempts: u32,
    base: Duration,
}

impl Backoff {
    /// Creates a policy doubling from one second
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base: Duration::from_secs(1),
        }
    }

    /// Overrides the ceiling of the first delay
    #[cfg(test)]
    pub fn with_base(mut self, base: Duration) -> Self {
        self.base = base;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Upper bound (exclusive) of the delay after attempt `attempt`, `base * 2^attempt`
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor)
    }

    /// Draws the delay following the failed attempt `attempt` (0-indexed)
    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let ceiling = self.ceiling(attempt);
        if ceiling.is_zero() {
            return Duration::ZERO;
        }

        rng.gen_range(Duration::ZERO..ceiling)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}
