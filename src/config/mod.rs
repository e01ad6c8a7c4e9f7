//! # Intake Configuration
//!
//! Every tunable of the pipeline lives here and is passed in at construction
//! time: the excluded-field set for hashing, required fields, breaker
//! thresholds, rule parameters and batch concurrency. Nothing is read from
//! process-global state once a pipeline exists.
//!
//! ## Sources
//!
//! - `config/intake-config.yaml` (required base)
//! - `config/intake-config.{environment}.yaml` (optional overrides)
//! - `INTAKE__SECTION__FIELD` environment variables (highest precedence)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use submission_intake::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let threshold = manager.config().circuit_breaker.failure_threshold;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::{DEFAULT_EXCLUDED_FIELDS, DEFAULT_IDENTIFIER_FIELD, DEFAULT_REQUIRED_FIELDS};
use crate::idempotency::KeyHasher;
use crate::resilience::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub idempotency: IdempotencyConfig,
    pub validation: ValidationConfig,
    pub circuit_breaker: CircuitBreakerSettings,
    pub enrichment: EnrichmentConfig,
    pub batch: BatchConfig,
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdempotencyConfig {
    /// Delivery-metadata fields ignored when computing the idempotency key
    pub excluded_fields: Vec<String>,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            excluded_fields: DEFAULT_EXCLUDED_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub required_fields: Vec<String>,
    /// Field whose value identifies the submission for duplicate checks and enrichment
    pub identifier_field: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            required_fields: DEFAULT_REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect(),
            identifier_field: DEFAULT_IDENTIFIER_FIELD.to_string(),
        }
    }
}

/// Breaker settings as written in YAML; see [`CircuitBreakerConfig`] for the runtime form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub enabled: bool,
    pub failure_threshold: u32,
    pub recovery_timeout_ms: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        let defaults = CircuitBreakerConfig::default();
        Self {
            enabled: true,
            failure_threshold: defaults.failure_threshold,
            recovery_timeout_ms: defaults.recovery_timeout.as_millis() as u64,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn to_resilience_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_millis(self.recovery_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Per-call timeout; unset means the backend call is not bounded
    pub timeout_ms: Option<u64>,
}

impl EnrichmentConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub max_concurrent_submissions: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_submissions: 5,
        }
    }
}

/// Parameters for the bundled decision rules. Each rule is enabled only when
/// its section is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub revenue_appetite: Option<RevenueAppetiteConfig>,
    pub excluded_industries: Vec<String>,
    pub regional_review: Option<RegionalReviewConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueAppetiteConfig {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalReviewConfig {
    pub industry: String,
    pub states: Vec<String>,
}

impl IntakeConfig {
    /// Key hasher using the configured exclusion set
    pub fn key_hasher(&self) -> KeyHasher {
        KeyHasher::new(self.idempotency.excluded_fields.iter())
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> ConfigResult<()> {
        if self.validation.identifier_field.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "validation.identifier_field",
                "",
                "identifier field must not be empty",
            ));
        }

        if self
            .idempotency
            .excluded_fields
            .contains(&self.validation.identifier_field)
        {
            return Err(ConfigurationError::invalid_value(
                "idempotency.excluded_fields",
                self.validation.identifier_field.clone(),
                "the identifier field cannot be excluded from the idempotency key",
            ));
        }

        self.circuit_breaker
            .to_resilience_config()
            .validate()
            .map_err(|e| ConfigurationError::validation_error(format!("circuit_breaker: {e}")))?;

        if self.enrichment.timeout_ms == Some(0) {
            return Err(ConfigurationError::invalid_value(
                "enrichment.timeout_ms",
                "0",
                "timeout must be greater than 0 when set",
            ));
        }

        if self.batch.max_concurrent_submissions == 0 {
            return Err(ConfigurationError::invalid_value(
                "batch.max_concurrent_submissions",
                "0",
                "must be greater than 0",
            ));
        }

        if let Some(appetite) = &self.rules.revenue_appetite {
            if appetite.min > appetite.max {
                return Err(ConfigurationError::validation_error(format!(
                    "rules.revenue_appetite: min ({}) exceeds max ({})",
                    appetite.min, appetite.max
                )));
            }
        }

        if let Some(review) = &self.rules.regional_review {
            if review.states.is_empty() {
                return Err(ConfigurationError::validation_error(
                    "rules.regional_review: at least one state is required",
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = IntakeConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.circuit_breaker.enabled);
        assert_eq!(config.batch.max_concurrent_submissions, 5);
        assert_eq!(config.validation.identifier_field, "company_id");
        assert!(config.enrichment.timeout().is_none());
    }

    #[test]
    fn test_identifier_field_cannot_be_excluded() {
        let mut config = IntakeConfig::default();
        config.idempotency.excluded_fields.push("company_id".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_invalid_breaker_settings_rejected() {
        let mut config = IntakeConfig::default();
        config.circuit_breaker.failure_threshold = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("circuit_breaker"));
    }

    #[test]
    fn test_revenue_bounds_must_be_ordered() {
        let mut config = IntakeConfig::default();
        config.rules.revenue_appetite = Some(RevenueAppetiteConfig {
            min: 10.0,
            max: 1.0,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_batch_concurrency_rejected() {
        let mut config = IntakeConfig::default();
        config.batch.max_concurrent_submissions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_breaker_settings_conversion() {
        let settings = CircuitBreakerSettings {
            enabled: true,
            failure_threshold: 3,
            recovery_timeout_ms: 1500,
        };
        let config = settings.to_resilience_config();
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.recovery_timeout, Duration::from_millis(1500));
    }
}
