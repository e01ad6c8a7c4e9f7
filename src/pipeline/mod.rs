//! # Submission Pipeline Stages
//!
//! Chain-of-responsibility stages that a [`SubmissionContext`] flows through.
//! Every stage decides for itself whether to forward to its successor or to
//! return early; no external loop makes that call on its behalf.
//!
//! Default order and semantics:
//!
//! | Stage | Stops the chain when | Otherwise |
//! |-------|----------------------|-----------|
//! | idempotency | cached result exists (returns a replay copy) | records the key |
//! | validation | a required field is absent or null | records the identifier |
//! | decision | a rule rejects | flags for review, or approves |
//! | duplicate | never | flags known identifiers |
//! | enrichment | never | attaches data or a failure marker |
//!
//! [`SubmissionContext`]: crate::models::SubmissionContext

pub mod stage;
pub mod stages;

pub use stage::{link_stages, Stage, Successor};
pub use stages::{DecisionStage, DuplicateStage, EnrichmentStage, IdempotencyStage, ValidationStage};
