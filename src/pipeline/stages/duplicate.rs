//! Stage 4: duplicate flagging.

use crate::constants::SubmissionStatus;
use crate::models::SubmissionContext;
use crate::pipeline::{Stage, Successor};
use crate::registry::KnownIdentifiers;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Marks submissions whose identifier is already known. Never stops the
/// chain: a flagged duplicate is still enriched for the reviewer.
pub struct DuplicateStage {
    known: Arc<dyn KnownIdentifiers>,
    next: Successor,
}

impl DuplicateStage {
    pub fn new(known: Arc<dyn KnownIdentifiers>) -> Self {
        Self {
            known,
            next: Successor::default(),
        }
    }
}

#[async_trait]
impl Stage for DuplicateStage {
    fn name(&self) -> &'static str {
        "duplicate"
    }

    async fn handle(&self, mut ctx: SubmissionContext) -> SubmissionContext {
        let duplicate = ctx
            .identifier()
            .filter(|identifier| self.known.contains(identifier))
            .map(str::to_owned);

        if let Some(identifier) = duplicate {
            info!(identifier = %identifier, "Duplicate submission flagged");
            ctx.set_status(SubmissionStatus::Duplicate);
            ctx.add_warning(format!(
                "Possible duplicate: submission '{identifier}' has been seen before"
            ));
        }

        self.next.forward(ctx).await
    }

    fn set_next(&mut self, next: Box<dyn Stage>) {
        self.next.set(next);
    }
}
