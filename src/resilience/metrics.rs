//! # Circuit Breaker Metrics
//!
//! Point-in-time snapshot of a breaker's counters, captured under the same
//! lock as its state so the numbers always agree with `current_state`.

use crate::resilience::CircuitState;
use serde::{Deserialize, Serialize};

/// Metrics for a single circuit breaker instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Number of recorded successes over the breaker's lifetime
    pub success_count: u64,

    /// Number of recorded failures over the breaker's lifetime
    pub failure_count: u64,

    /// Current consecutive failure count (reset by any success)
    pub consecutive_failures: u32,

    /// How many times the breaker has transitioned into `open`
    pub times_opened: u64,

    /// Current circuit breaker state
    pub current_state: CircuitState,
}

impl CircuitBreakerMetrics {
    /// Total number of recorded outcomes
    pub fn total_calls(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// Failure rate between 0.0 and 1.0 (0.0 when nothing was recorded)
    pub fn failure_rate(&self) -> f64 {
        let total = self.total_calls();
        if total == 0 {
            0.0
        } else {
            self.failure_count as f64 / total as f64
        }
    }
}
