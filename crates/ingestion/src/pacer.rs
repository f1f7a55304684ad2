//! Request pacing.
//!
//! Each resource fetch owns one [`Pacer`]; it enforces a minimum gap between
//! consecutive requests so the remote throttle is never tripped. Pacing is a
//! scheduling contract with the API and has no effect on fetched data.

use std::time::Duration;

use tokio::time::Instant;

/// Minimum-interval request pacer.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    /// Create a pacer that spaces requests by `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// A pacer that never waits.
    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next request may be sent, then record it as sent.
    ///
    /// The first call returns immediately.
    pub async fn ready(&mut self) {
        match self.last {
            Some(last) if !self.interval.is_zero() => {
                tokio::time::sleep_until(last + self.interval).await;
            }
            _ => {}
        }
        self.last = Some(Instant::now());
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(Duration::from_millis(1_000))
    }
}
