//! Delay applied between a transport close and the next connect cycle.

use std::time::Duration;

use rand::Rng;

use crate::config::DEFAULT_RECONNECT_INTERVAL_MS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Same delay before every attempt.
    Fixed(Duration),
    /// Exponential backoff with full jitter: attempt `n` waits a random
    /// duration in `[0, min(max, base * 2^n)]`. The attempt counter resets
    /// once the gateway confirms registration.
    Backoff { base: Duration, max: Duration },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Fixed(Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_MS))
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `attempt` (zero-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Backoff { base, max } => {
                let ceiling = backoff_ceiling(base, max, attempt);
                let ceiling_ms = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);
                if ceiling_ms == 0 {
                    return Duration::ZERO;
                }
                Duration::from_millis(rand::rng().random_range(0..=ceiling_ms))
            }
        }
    }
}

/// Upper bound for attempt `attempt`: `base * 2^attempt`, capped at `max`.
fn backoff_ceiling(base: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
    base.checked_mul(factor).map_or(max, |d| d.min(max))
}

#[cfg(test)]
#[path = "reconnect_test.rs"]
mod tests;
