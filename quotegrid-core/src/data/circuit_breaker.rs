//! Circuit breaker guarding the quote provider.
//!
//! Yahoo bans IPs that hammer the chart API. An HTTP 403 trips the breaker
//! immediately; repeated soft failures trip it after a threshold. While open,
//! all requests are refused until the cooldown elapses.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct BreakerState {
    tripped_at: Option<Instant>,
    consecutive_failures: u32,
}

/// Failure-counting breaker with a cooldown.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration, failure_threshold: u32) -> Self {
        Self {
            state: Mutex::new(BreakerState {
                tripped_at: None,
                consecutive_failures: 0,
            }),
            cooldown,
            failure_threshold,
        }
    }

    /// Defaults tuned for Yahoo: 30-minute cooldown, trip after 3 consecutive
    /// failures.
    pub fn default_provider() -> Self {
        Self::new(Duration::from_secs(30 * 60), 3)
    }

    /// Check if requests are currently allowed.
    pub fn is_allowed(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.tripped_at {
            None => true,
            Some(at) if at.elapsed() >= self.cooldown => {
                state.tripped_at = None;
                state.consecutive_failures = 0;
                true
            }
            Some(_) => false,
        }
    }

    /// Record a successful request, resetting the failure counter.
    pub fn record_success(&self) {
        self.state.lock().unwrap().consecutive_failures = 0;
    }

    /// Record a soft failure. Trips the breaker once the threshold is hit.
    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap();
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.failure_threshold {
            state.tripped_at = Some(Instant::now());
        }
    }

    /// Immediately trip the breaker (403 Forbidden / IP ban).
    pub fn trip(&self) {
        self.state.lock().unwrap().tripped_at = Some(Instant::now());
    }

    /// Remaining cooldown time (zero if not tripped).
    pub fn remaining_cooldown(&self) -> Duration {
        let state = self.state.lock().unwrap();
        match state.tripped_at {
            None => Duration::ZERO,
            Some(at) => self.cooldown.saturating_sub(at.elapsed()),
        }
    }
}
