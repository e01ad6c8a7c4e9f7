//! # Resilience Module
//!
//! Circuit breaker protection for flaky downstream dependencies. A breaker is
//! consulted before a call (`allow_request`) and informed of the outcome
//! afterwards (`record_success` / `record_failure`). The `open → half_open`
//! transition is evaluated lazily whenever the state is read, so no background
//! timer is needed.
//!
//! ## Usage
//!
//! ```rust
//! use submission_intake::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::new(
//!     "risk_api".to_string(),
//!     CircuitBreakerConfig {
//!         failure_threshold: 3,
//!         recovery_timeout: Duration::from_secs(30),
//!     },
//! );
//!
//! if breaker.allow_request() {
//!     // call the dependency, then report the outcome
//!     breaker.record_success();
//! }
//! assert_eq!(breaker.state(), CircuitState::Closed);
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod metrics;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use config::CircuitBreakerConfig;
pub use metrics::CircuitBreakerMetrics;
