//! Poll-until-converged policy for eventually consistent bucket state.
//!
//! A bucket that was just deleted may still answer an existence probe, and a bucket
//! that was just created may not answer yet. The controller waits for the expected
//! state using the backoff schedule produced here. Failed requests are never retried.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyPolicy {
    pub enabled: bool,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_wait_ms: u64,
}

impl Default for ConsistencyPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: 250,
            max_delay_ms: 4_000,
            max_wait_ms: 60_000,
        }
    }
}

impl ConsistencyPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    /// Sleep durations between successive probes. Doubles from the initial delay,
    /// capped per step at `max_delay_ms`; the sum never exceeds `max_wait_ms`.
    pub fn delays(&self) -> Backoff {
        Backoff {
            next: Duration::from_millis(self.initial_delay_ms.max(1)),
            max_delay: Duration::from_millis(self.max_delay_ms.max(1)),
            remaining: self.max_wait(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max_delay: Duration,
    remaining: Duration,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining.is_zero() {
            return None;
        }
        let delay = self.next.min(self.max_delay).min(self.remaining);
        self.remaining -= delay;
        self.next = self.next.saturating_mul(2);
        Some(delay)
    }
}
