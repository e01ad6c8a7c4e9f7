#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Submission Intake
//!
//! Coordination core for processing externally submitted records (such as
//! insurance applications) exactly once, through an ordered chain of decision
//! stages, while protecting a flaky enrichment dependency with a circuit
//! breaker.
//!
//! ## Architecture
//!
//! A payload enters the [`SubmissionService`], which computes a content key
//! and either returns the cached context or runs the [`SubmissionPipeline`]
//! once per key, even under concurrent identical deliveries. The pipeline
//! drives a [`SubmissionContext`] through its stages; each stage decides on
//! its own whether to continue or stop.
//!
//! ## Module Organization
//!
//! - [`idempotency`] - Content keys, result store and the idempotent processor
//! - [`resilience`] - Three-state circuit breaker with lazy recovery
//! - [`pipeline`] - Stage trait and the built-in stages
//! - [`orchestration`] - Pipeline wiring, caching and batch processing
//! - [`rules`] - Decision rules consulted by the decision stage
//! - [`enrichment`] - Enrichment backend contract
//! - [`registry`] - Known-identifier sources for duplicate flagging
//! - [`config`] - YAML + environment configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use submission_intake::config::ConfigManager;
//! use submission_intake::enrichment::StaticEnrichmentBackend;
//! use submission_intake::models::RequestPayload;
//! use submission_intake::orchestration::{SubmissionPipelineBuilder, SubmissionService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config().clone();
//!
//! let pipeline = SubmissionPipelineBuilder::from_config(config.clone())
//!     .with_enrichment_backend(Arc::new(StaticEnrichmentBackend::new()))
//!     .build()?;
//! let service = SubmissionService::from_config(pipeline, &config);
//!
//! let payload = RequestPayload::from_value(serde_json::json!({
//!     "company_id": "ACME-001",
//!     "company_name": "Acme Corp",
//!     "revenue": 5_000_000,
//!     "industry": "Retail",
//!     "state": "CA"
//! }))?;
//! let ctx = service.process(payload).await;
//! println!("{} (replay: {})", ctx.status(), ctx.was_replay());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod enrichment;
pub mod error;
pub mod idempotency;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod pipeline;
pub mod registry;
pub mod resilience;
pub mod rules;

pub use config::{ConfigManager, ConfigurationError, IntakeConfig};
pub use constants::SubmissionStatus;
pub use enrichment::{EnrichmentBackend, EnrichmentData, StaticEnrichmentBackend};
pub use error::{EnrichmentError, IntakeError, Result};
pub use idempotency::{
    IdempotencyKey, IdempotencyStore, IdempotentProcessor, InMemoryIdempotencyStore, KeyHasher,
    ProcessingRecord,
};
pub use models::{RequestPayload, SubmissionContext};
pub use orchestration::{SubmissionPipeline, SubmissionPipelineBuilder, SubmissionService};
pub use pipeline::Stage;
pub use registry::{IdentifierRegistry, KnownIdentifiers};
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use rules::{DecisionRule, Disposition, RuleOutcome, RuleSet};
