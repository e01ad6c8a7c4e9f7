//! # Submission Context
//!
//! The carrier that flows through the stage chain for one request. Stages
//! read what earlier stages found and add their own results. Warnings and
//! errors are append-only; stages may set the status, identifier, decision
//! reason and enrichment data but can never remove or reorder entries that an
//! earlier stage recorded.

use crate::constants::{enrichment_markers, SubmissionStatus};
use crate::idempotency::IdempotencyKey;
use crate::models::RequestPayload;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionContext {
    payload: RequestPayload,
    status: SubmissionStatus,
    /// Submission identifier extracted during validation
    identifier: Option<String>,
    idempotency_key: Option<IdempotencyKey>,
    decision_reason: Option<String>,
    enrichment_data: Map<String, Value>,
    warnings: Vec<String>,
    errors: Vec<String>,
    was_replay: bool,
}

impl SubmissionContext {
    pub fn new(payload: RequestPayload) -> Self {
        Self {
            payload,
            status: SubmissionStatus::Pending,
            identifier: None,
            idempotency_key: None,
            decision_reason: None,
            enrichment_data: Map::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            was_replay: false,
        }
    }

    pub fn payload(&self) -> &RequestPayload {
        &self.payload
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn idempotency_key(&self) -> Option<&IdempotencyKey> {
        self.idempotency_key.as_ref()
    }

    pub fn decision_reason(&self) -> Option<&str> {
        self.decision_reason.as_deref()
    }

    pub fn enrichment_data(&self) -> &Map<String, Value> {
        &self.enrichment_data
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn was_replay(&self) -> bool {
        self.was_replay
    }

    /// True when enrichment ran but produced a failure marker instead of data
    pub fn enrichment_failed(&self) -> bool {
        self.enrichment_data
            .get(enrichment_markers::FAILED)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_status(&mut self, status: SubmissionStatus) {
        self.status = status;
    }

    pub fn set_identifier(&mut self, identifier: impl Into<String>) {
        self.identifier = Some(identifier.into());
    }

    pub fn set_idempotency_key(&mut self, key: IdempotencyKey) {
        self.idempotency_key = Some(key);
    }

    pub fn set_decision_reason(&mut self, reason: impl Into<String>) {
        self.decision_reason = Some(reason.into());
    }

    pub fn set_enrichment_data(&mut self, data: Map<String, Value>) {
        self.enrichment_data = data;
    }

    /// Replace enrichment data with the failure marker and the given reason
    pub fn mark_enrichment_failed(&mut self, reason: &str) {
        let mut marker = Map::new();
        marker.insert(enrichment_markers::FAILED.to_string(), Value::Bool(true));
        marker.insert(
            enrichment_markers::REASON.to_string(),
            Value::String(reason.to_string()),
        );
        self.enrichment_data = marker;
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(identifier = ?self.identifier, warning = %message, "Pipeline warning");
        self.warnings.push(message);
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(identifier = ?self.identifier, error = %message, "Pipeline error");
        self.errors.push(message);
    }

    /// Copy handed out on a cache hit; the cached original stays untouched
    pub fn replay_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.was_replay = true;
        copy
    }

    pub(crate) fn set_replay(&mut self, was_replay: bool) {
        self.was_replay = was_replay;
    }
}
