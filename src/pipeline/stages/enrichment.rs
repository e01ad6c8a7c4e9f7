//! Stage 5: external enrichment behind a circuit breaker.
//!
//! Enrichment failure is always soft. It never changes the status and never
//! stops the chain; the context gets a failure marker and a warning instead.
//! Skipped calls (open circuit, no identifier) leave the breaker untouched.

use crate::constants::enrichment_markers;
use crate::enrichment::{EnrichmentBackend, EnrichmentData};
use crate::error::EnrichmentError;
use crate::models::SubmissionContext;
use crate::pipeline::{Stage, Successor};
use crate::resilience::CircuitBreaker;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct EnrichmentStage {
    backend: Arc<dyn EnrichmentBackend>,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
    timeout: Option<Duration>,
    next: Successor,
}

impl EnrichmentStage {
    pub fn new(
        backend: Arc<dyn EnrichmentBackend>,
        circuit_breaker: Option<Arc<CircuitBreaker>>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            backend,
            circuit_breaker,
            timeout,
            next: Successor::default(),
        }
    }

    pub fn circuit_breaker(&self) -> Option<&Arc<CircuitBreaker>> {
        self.circuit_breaker.as_ref()
    }

    async fn fetch(&self, identifier: &str) -> Result<Option<EnrichmentData>, EnrichmentError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.backend.fetch(identifier))
                .await
                .unwrap_or_else(|_| {
                    Err(EnrichmentError::Timeout {
                        timeout_ms: limit.as_millis() as u64,
                    })
                }),
            None => self.backend.fetch(identifier).await,
        }
    }

    fn record_failure(&self) {
        if let Some(breaker) = &self.circuit_breaker {
            breaker.record_failure();
        }
    }

    fn record_success(&self) {
        if let Some(breaker) = &self.circuit_breaker {
            breaker.record_success();
        }
    }
}

#[async_trait]
impl Stage for EnrichmentStage {
    fn name(&self) -> &'static str {
        "enrichment"
    }

    async fn handle(&self, mut ctx: SubmissionContext) -> SubmissionContext {
        let Some(identifier) = ctx.identifier().map(str::to_owned) else {
            ctx.mark_enrichment_failed(enrichment_markers::MISSING_IDENTIFIER);
            ctx.add_warning("Enrichment skipped: submission has no identifier");
            return self.next.forward(ctx).await;
        };

        if let Some(breaker) = &self.circuit_breaker {
            if !breaker.allow_request() {
                warn!(
                    identifier = %identifier,
                    circuit_breaker = %breaker.name(),
                    "Circuit open - skipping enrichment call"
                );
                ctx.mark_enrichment_failed(enrichment_markers::CIRCUIT_OPEN);
                ctx.add_warning("Enrichment unavailable: circuit open");
                return self.next.forward(ctx).await;
            }
        }

        match self.fetch(&identifier).await {
            Ok(Some(data)) if !data.is_empty() => {
                debug!(
                    identifier = %identifier,
                    backend = self.backend.backend_name(),
                    fields = data.len(),
                    "Enrichment succeeded"
                );
                self.record_success();
                ctx.set_enrichment_data(data);
            }
            Ok(_) => {
                self.record_failure();
                ctx.mark_enrichment_failed(enrichment_markers::NOT_FOUND);
                ctx.add_warning(format!("Enrichment returned no data for '{identifier}'"));
            }
            Err(error) => {
                self.record_failure();
                ctx.mark_enrichment_failed(error.marker_reason());
                ctx.add_warning(format!("Enrichment failed: {error}"));
            }
        }

        self.next.forward(ctx).await
    }

    fn set_next(&mut self, next: Box<dyn Stage>) {
        self.next.set(next);
    }
}
