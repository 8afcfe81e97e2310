//! Polling and deadline configuration

use std::time::Duration;

/// Deadlines for platform-side asynchronous completion.
///
/// The platform allocates and tears down resources asynchronously; the
/// engine polls reads until readiness or absence, bounded by these
/// deadlines. Callers override them per resource when the platform is
/// known to be slower (large volumes) or the caller wants to give up
/// earlier.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Deadline for a created resource to report ready.
    pub create: Duration,

    /// Deadline for a deleted resource to disappear.
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(10 * 60),
            delete: Duration::from_secs(10 * 60),
        }
    }
}

/// Bounded-interval strategy for polling loops.
///
/// Intervals grow by `backoff_multiplier` up to `max_interval`. No poll
/// loop retries an unbounded number of times; the surrounding deadline
/// in [`Timeouts`] cuts it off.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub backoff_multiplier: f64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(30),
            backoff_multiplier: 1.5,
        }
    }
}

impl PollPolicy {
    /// The interval to sleep after a poll that slept `current`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.mul_f64(self.backoff_multiplier).min(self.max_interval)
    }

    /// An effectively-immediate policy for tests and fakes.
    pub fn immediate() -> Self {
        Self {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(1),
            backoff_multiplier: 1.0,
        }
    }
}
