use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// Backoff schedule for polling a queued query run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Total number of status checks before giving up.
    pub max_attempts: u32,
    /// Delay after the first check, in milliseconds.
    pub initial_delay_ms: u64,
    /// Exponential backoff multiplier.
    pub backoff_multiplier: f64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Whether to add up to 25% jitter to each delay.
    pub jitter: bool,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            initial_delay_ms: 500,
            backoff_multiplier: 1.5,
            max_delay_ms: 8000,
            jitter: true,
        }
    }
}

impl PollPolicy {
    /// Delay after the given attempt (0-indexed), capped at `max_delay_ms`.
    #[must_use]
    #[allow(
        clippy::cast_possible_wrap,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay_ms as f64);
        let delay_ms = if self.jitter {
            (capped + capped * 0.25 * rand_factor()).min(self.max_delay_ms as f64)
        } else {
            capped
        };
        Duration::from_millis(delay_ms as u64)
    }
}

/// Pseudo-random factor in `[0, 1)`; good enough to spread pollers apart.
fn rand_factor() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    f64::from(nanos % 1000) / 1000.0
}
