//! Built-in pipeline stages.

pub mod decision;
pub mod duplicate;
pub mod enrichment;
pub mod idempotency;
pub mod validation;

pub use decision::DecisionStage;
pub use duplicate::DuplicateStage;
pub use enrichment::EnrichmentStage;
pub use idempotency::IdempotencyStage;
pub use validation::ValidationStage;
