//! # Submission Orchestration
//!
//! Owns the wiring between the idempotency layer and the stage chain.
//!
//! ## Core Components
//!
//! - **SubmissionPipeline**: runs one payload through the chain and caches the
//!   finished context under its idempotency key
//! - **SubmissionPipelineBuilder**: wires the default stage order from
//!   configuration, with optional custom stages inserted by position
//! - **SubmissionService**: wraps the pipeline in an [`IdempotentProcessor`]
//!   for exactly-once processing under concurrent deliveries, and processes
//!   batches with bounded concurrency
//!
//! [`IdempotentProcessor`]: crate::idempotency::IdempotentProcessor

pub mod pipeline;
pub mod service;

pub use pipeline::{SubmissionPipeline, SubmissionPipelineBuilder};
pub use service::SubmissionService;
