//! # Circuit Breaker Implementation
//!
//! Three-state breaker: Closed (normal operation), Open (failing fast) and
//! Half-Open (probing recovery). State, consecutive failure counter and the
//! opened-at instant live together behind one mutex, so no caller can ever
//! observe a state that disagrees with its counter or timestamp.

use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed,
    /// Failure mode - all calls fail fast without executing
    Open,
    /// Testing recovery - calls are allowed through as probes
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => f.write_str("closed"),
            CircuitState::Open => f.write_str("open"),
            CircuitState::HalfOpen => f.write_str("half_open"),
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    /// Set only on a transition into `Open`
    opened_at: Option<Instant>,
    success_count: u64,
    failure_count: u64,
    times_opened: u64,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            success_count: 0,
            failure_count: 0,
            times_opened: 0,
        }
    }
}

/// Thread-safe circuit breaker guarding a single downstream dependency
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging and metrics
    name: String,

    /// Configuration parameters, immutable after construction
    config: CircuitBreakerConfig,

    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration
    pub fn new(name: String, config: CircuitBreakerConfig) -> Self {
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            recovery_timeout_ms = config.recovery_timeout.as_millis() as u64,
            "Circuit breaker initialized"
        );

        Self {
            name,
            config,
            inner: Mutex::new(BreakerState::new()),
        }
    }

    /// Get component name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failure_threshold(&self) -> u32 {
        self.config.failure_threshold
    }

    pub fn recovery_timeout(&self) -> Duration {
        self.config.recovery_timeout
    }

    /// Get current circuit state, applying the lazy `open → half_open` check
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        self.current_state(&mut inner)
    }

    /// Whether a call to the protected dependency should be attempted.
    ///
    /// True in `Closed` and `HalfOpen`, false in `Open`. Every allowed call
    /// must be followed by `record_success` or `record_failure`.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        let state = self.current_state(&mut inner);
        let allowed = state != CircuitState::Open;
        if !allowed {
            debug!(component = %self.name, "Circuit open, rejecting call");
        }
        allowed
    }

    /// Record a successful call: resets the failure counter and closes the circuit
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.success_count += 1;

        let previous = inner.state;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.state = CircuitState::Closed;

        match previous {
            CircuitState::HalfOpen => {
                info!(component = %self.name, "Circuit breaker closed (recovered)");
            }
            CircuitState::Open => {
                warn!(component = %self.name, "Success recorded while circuit is open; closing");
            }
            CircuitState::Closed => {
                debug!(component = %self.name, "Operation succeeded");
            }
        }
    }

    /// Record a failed call.
    ///
    /// Opens the circuit once the consecutive failure count meets the
    /// threshold; a failed half-open probe reopens it immediately. Either way
    /// the recovery timer restarts from now.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count += 1;
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        warn!(
            component = %self.name,
            consecutive_failures = inner.consecutive_failures,
            "Operation failed"
        );

        let probe_failed = inner.state == CircuitState::HalfOpen;
        if probe_failed || inner.consecutive_failures >= self.config.failure_threshold {
            self.transition_to_open(&mut inner);
        }
    }

    /// Force circuit to open state (for emergency situations)
    pub fn force_open(&self) {
        warn!(component = %self.name, "Circuit breaker forced open");
        let mut inner = self.inner.lock();
        self.transition_to_open(&mut inner);
    }

    /// Force circuit to closed state (for emergency recovery)
    pub fn force_closed(&self) {
        warn!(component = %self.name, "Circuit breaker forced closed");
        let mut inner = self.inner.lock();
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.state = CircuitState::Closed;
    }

    /// Get current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let mut inner = self.inner.lock();
        let current_state = self.current_state(&mut inner);
        CircuitBreakerMetrics {
            success_count: inner.success_count,
            failure_count: inner.failure_count,
            consecutive_failures: inner.consecutive_failures,
            times_opened: inner.times_opened,
            current_state,
        }
    }

    /// Evaluate the state with the guard held; the only place `Open` becomes `HalfOpen`
    fn current_state(&self, inner: &mut BreakerState) -> CircuitState {
        if inner.state == CircuitState::Open {
            if let Some(opened_at) = inner.opened_at {
                if opened_at.elapsed() >= self.config.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    info!(
                        component = %self.name,
                        "Circuit breaker half-open (testing recovery)"
                    );
                }
            }
        }
        inner.state
    }

    fn transition_to_open(&self, inner: &mut BreakerState) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.times_opened += 1;

        error!(
            component = %self.name,
            consecutive_failures = inner.consecutive_failures,
            failure_threshold = self.config.failure_threshold,
            recovery_timeout_ms = self.config.recovery_timeout.as_millis() as u64,
            "Circuit breaker opened (failing fast)"
        );
    }
}
