//! Stage 2: required-field validation.

use crate::constants::{SubmissionStatus, DEFAULT_IDENTIFIER_FIELD, DEFAULT_REQUIRED_FIELDS};
use crate::models::SubmissionContext;
use crate::pipeline::{Stage, Successor};
use async_trait::async_trait;
use tracing::debug;

/// Hard-stops with status `error` when a required field is absent or null.
/// On success, the identifier field is copied onto the context.
pub struct ValidationStage {
    required_fields: Vec<String>,
    identifier_field: String,
    next: Successor,
}

impl ValidationStage {
    pub fn new(required_fields: Vec<String>, identifier_field: impl Into<String>) -> Self {
        Self {
            required_fields,
            identifier_field: identifier_field.into(),
            next: Successor::default(),
        }
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required_fields
    }
}

impl Default for ValidationStage {
    fn default() -> Self {
        Self::new(
            DEFAULT_REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect(),
            DEFAULT_IDENTIFIER_FIELD,
        )
    }
}

#[async_trait]
impl Stage for ValidationStage {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn handle(&self, mut ctx: SubmissionContext) -> SubmissionContext {
        let missing: Vec<&str> = self
            .required_fields
            .iter()
            .filter(|field| !ctx.payload().has_value(field))
            .map(String::as_str)
            .collect();

        if !missing.is_empty() {
            ctx.set_status(SubmissionStatus::Error);
            ctx.add_error(format!("Missing required fields: {}", missing.join(", ")));
            return ctx;
        }

        if let Some(identifier) = ctx.payload().text_field(&self.identifier_field) {
            ctx.set_identifier(identifier);
        }
        debug!(identifier = ?ctx.identifier(), "Validation passed");

        self.next.forward(ctx).await
    }

    fn set_next(&mut self, next: Box<dyn Stage>) {
        self.next.set(next);
    }
}
