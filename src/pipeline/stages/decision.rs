//! Stage 3: business-rule decision.

use crate::constants::SubmissionStatus;
use crate::models::SubmissionContext;
use crate::pipeline::{Stage, Successor};
use crate::rules::{Disposition, RuleSet};
use async_trait::async_trait;
use tracing::{debug, info};

/// Applies the first rule that fires. A reject declines and stops the chain;
/// a review flag annotates and continues. With no rule firing, a still
/// pending submission is approved.
pub struct DecisionStage {
    rules: RuleSet,
    next: Successor,
}

impl DecisionStage {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            next: Successor::default(),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

#[async_trait]
impl Stage for DecisionStage {
    fn name(&self) -> &'static str {
        "decision"
    }

    async fn handle(&self, mut ctx: SubmissionContext) -> SubmissionContext {
        let fired = self
            .rules
            .iter()
            .find_map(|rule| rule.evaluate(&ctx).map(|outcome| (rule.name().to_string(), outcome)));

        match fired {
            Some((rule, outcome)) => match outcome.disposition {
                Disposition::Reject => {
                    info!(
                        identifier = ?ctx.identifier(),
                        rule = %rule,
                        reason = %outcome.reason,
                        "Submission declined"
                    );
                    ctx.set_status(SubmissionStatus::Declined);
                    ctx.set_decision_reason(outcome.reason);
                    return ctx;
                }
                Disposition::FlagForReview => {
                    info!(
                        identifier = ?ctx.identifier(),
                        rule = %rule,
                        "Submission flagged for manual review"
                    );
                    ctx.set_status(SubmissionStatus::ManualReview);
                    ctx.add_warning(outcome.reason.clone());
                    ctx.set_decision_reason(outcome.reason);
                }
            },
            None => {
                if ctx.status() == SubmissionStatus::Pending {
                    ctx.set_status(SubmissionStatus::Approved);
                }
                debug!(identifier = ?ctx.identifier(), status = %ctx.status(), "No rule fired");
            }
        }

        self.next.forward(ctx).await
    }

    fn set_next(&mut self, next: Box<dyn Stage>) {
        self.next.set(next);
    }
}
