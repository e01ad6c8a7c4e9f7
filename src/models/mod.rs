//! # Models
//!
//! Data carried through the intake system: the immutable request payload as
//! received from the caller, and the mutable context that accumulates the
//! pipeline's findings for one submission.

pub mod payload;
pub mod submission_context;

pub use payload::RequestPayload;
pub use submission_context::SubmissionContext;
