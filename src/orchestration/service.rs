//! Exactly-once submission processing and batch intake.

use crate::config::IntakeConfig;
use crate::constants::SubmissionStatus;
use crate::idempotency::IdempotentProcessor;
use crate::models::{RequestPayload, SubmissionContext};
use crate::orchestration::SubmissionPipeline;
use futures::{stream, FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info};

/// Front door for submissions.
///
/// Concurrent deliveries of the same content wait on a per-key lock and
/// observe the first caller's result; distinct submissions run in parallel.
#[derive(Debug)]
pub struct SubmissionService {
    processor: IdempotentProcessor<SubmissionContext>,
    pipeline: Arc<SubmissionPipeline>,
    max_concurrent_submissions: usize,
}

impl SubmissionService {
    pub fn new(pipeline: SubmissionPipeline, max_concurrent_submissions: usize) -> Self {
        let pipeline = Arc::new(pipeline);
        let run_pipeline = Arc::clone(&pipeline);

        let processor = IdempotentProcessor::new(
            Arc::clone(pipeline.cache()),
            pipeline.hasher().clone(),
            move |payload: RequestPayload| {
                let pipeline = Arc::clone(&run_pipeline);
                async move { pipeline.run(payload).await }
            },
        );

        Self {
            processor,
            pipeline,
            max_concurrent_submissions: max_concurrent_submissions.max(1),
        }
    }

    /// Build a service whose batch concurrency comes from `batch.max_concurrent_submissions`
    pub fn from_config(pipeline: SubmissionPipeline, config: &IntakeConfig) -> Self {
        Self::new(pipeline, config.batch.max_concurrent_submissions)
    }

    pub fn max_concurrent_submissions(&self) -> usize {
        self.max_concurrent_submissions
    }

    pub fn pipeline(&self) -> &SubmissionPipeline {
        &self.pipeline
    }

    /// Process one submission. The returned context's replay flag is set
    /// whenever the result came from the cache.
    pub async fn process(&self, payload: RequestPayload) -> SubmissionContext {
        let record = self.processor.process(payload).await;
        let mut ctx = record.result;
        ctx.set_replay(record.was_replay || ctx.was_replay());
        ctx
    }

    /// Process many submissions concurrently, returning results in input
    /// order. A submission that panics is reported as an error context and
    /// does not affect the rest of the batch.
    pub async fn process_batch(&self, payloads: Vec<RequestPayload>) -> Vec<SubmissionContext> {
        let total = payloads.len();
        info!(
            total,
            max_concurrent = self.max_concurrent_submissions,
            "Processing submission batch"
        );

        let results: Vec<SubmissionContext> = stream::iter(payloads)
            .map(|payload| self.process_isolated(payload))
            .buffered(self.max_concurrent_submissions)
            .collect()
            .await;

        let failed = results
            .iter()
            .filter(|ctx| ctx.status() == SubmissionStatus::Error)
            .count();
        info!(total, failed, "Submission batch complete");

        results
    }

    async fn process_isolated(&self, payload: RequestPayload) -> SubmissionContext {
        let fallback = SubmissionContext::new(payload.clone());
        match AssertUnwindSafe(self.process(payload)).catch_unwind().await {
            Ok(ctx) => ctx,
            Err(_) => {
                error!("Submission processing panicked; recording as error");
                let mut ctx = fallback;
                ctx.set_status(SubmissionStatus::Error);
                ctx.add_error("Internal error: submission processing panicked");
                ctx
            }
        }
    }
}
