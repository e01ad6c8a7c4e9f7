//! # System Constants
//!
//! Status values, default field sets and enrichment marker keys shared by the
//! pipeline stages and the configuration layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Final (or in-flight) disposition of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Approved,
    Declined,
    ManualReview,
    Duplicate,
    Error,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Declined => "declined",
            SubmissionStatus::ManualReview => "manual_review",
            SubmissionStatus::Duplicate => "duplicate",
            SubmissionStatus::Error => "error",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery metadata that never participates in the idempotency key
pub const DEFAULT_EXCLUDED_FIELDS: &[&str] =
    &["received_at", "correlation_id", "retry_count", "source_ip"];

/// Fields a submission must carry before it is triaged
pub const DEFAULT_REQUIRED_FIELDS: &[&str] =
    &["company_id", "company_name", "revenue", "industry", "state"];

pub const DEFAULT_IDENTIFIER_FIELD: &str = "company_id";

/// Keys written into `enrichment_data` when enrichment could not be used
pub mod enrichment_markers {
    pub const FAILED: &str = "enrichment_failed";
    pub const REASON: &str = "reason";

    pub const CIRCUIT_OPEN: &str = "circuit_open";
    pub const NOT_FOUND: &str = "not_found";
    pub const MISSING_IDENTIFIER: &str = "missing_identifier";
}
