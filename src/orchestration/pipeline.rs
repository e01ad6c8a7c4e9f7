//! Stage chain orchestration and wiring.

use crate::config::IntakeConfig;
use crate::enrichment::EnrichmentBackend;
use crate::error::{IntakeError, Result};
use crate::idempotency::{IdempotencyStore, InMemoryIdempotencyStore, KeyHasher};
use crate::logging::log_submission_outcome;
use crate::models::{RequestPayload, SubmissionContext};
use crate::pipeline::{
    link_stages, DecisionStage, DuplicateStage, EnrichmentStage, IdempotencyStage, Stage,
    ValidationStage,
};
use crate::registry::{IdentifierRegistry, KnownIdentifiers};
use crate::resilience::CircuitBreaker;
use crate::rules::{rules_from_config, RuleSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Runs payloads through a linked stage chain.
///
/// The finished context is stored in the cache only after the whole chain
/// has returned, and never when the chain itself produced a replay.
pub struct SubmissionPipeline {
    head: Box<dyn Stage>,
    stage_names: Vec<&'static str>,
    cache: Arc<dyn IdempotencyStore<SubmissionContext>>,
    hasher: KeyHasher,
}

impl fmt::Debug for SubmissionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionPipeline")
            .field("stages", &self.stage_names)
            .field("cache", &self.cache.provider_name())
            .field("hasher", &self.hasher)
            .finish()
    }
}

impl SubmissionPipeline {
    /// Link the given stages in order. The hasher must match the one used by
    /// the idempotency stage, if the chain has one.
    pub fn from_stages(
        stages: Vec<Box<dyn Stage>>,
        cache: Arc<dyn IdempotencyStore<SubmissionContext>>,
        hasher: KeyHasher,
    ) -> Result<Self> {
        let stage_names: Vec<&'static str> = stages.iter().map(|stage| stage.name()).collect();
        let head = link_stages(stages).ok_or_else(|| {
            IntakeError::ConfigurationError("pipeline requires at least one stage".to_string())
        })?;

        info!(stages = ?stage_names, "Submission pipeline assembled");

        Ok(Self {
            head,
            stage_names,
            cache,
            hasher,
        })
    }

    pub fn builder(config: IntakeConfig) -> SubmissionPipelineBuilder {
        SubmissionPipelineBuilder::from_config(config)
    }

    pub fn stage_names(&self) -> &[&'static str] {
        &self.stage_names
    }

    pub fn cache(&self) -> &Arc<dyn IdempotencyStore<SubmissionContext>> {
        &self.cache
    }

    pub fn hasher(&self) -> &KeyHasher {
        &self.hasher
    }

    /// Process one payload end to end. Never fails: every outcome is
    /// recorded on the returned context.
    pub async fn run(&self, payload: RequestPayload) -> SubmissionContext {
        let ctx = self.head.handle(SubmissionContext::new(payload)).await;

        if !ctx.was_replay() {
            if let Some(key) = ctx.idempotency_key() {
                let stored = self.cache.set_if_absent(key, ctx.clone()).await;
                debug!(idempotency_key = %key.short(), stored, "Cached finished submission");
            }
        }

        log_submission_outcome(&ctx);
        ctx
    }
}

/// Wires the default chain: idempotency → validation → decision →
/// duplicate → enrichment.
///
/// Custom stages are inserted relative to a named stage, so adding one never
/// requires touching the built-in stages.
pub struct SubmissionPipelineBuilder {
    config: IntakeConfig,
    cache: Option<Arc<dyn IdempotencyStore<SubmissionContext>>>,
    backend: Option<Arc<dyn EnrichmentBackend>>,
    known_identifiers: Option<Arc<dyn KnownIdentifiers>>,
    rules: Option<RuleSet>,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
    custom_stages: Vec<(&'static str, Box<dyn Stage>)>,
}

impl SubmissionPipelineBuilder {
    pub fn from_config(config: IntakeConfig) -> Self {
        Self {
            config,
            cache: None,
            backend: None,
            known_identifiers: None,
            rules: None,
            circuit_breaker: None,
            custom_stages: Vec::new(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn IdempotencyStore<SubmissionContext>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_enrichment_backend(mut self, backend: Arc<dyn EnrichmentBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_known_identifiers(mut self, known: Arc<dyn KnownIdentifiers>) -> Self {
        self.known_identifiers = Some(known);
        self
    }

    /// Replace the rules built from configuration
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Use a specific breaker instead of one built from configuration.
    /// Sharing one breaker across pipelines shares its health view.
    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = Some(breaker);
        self
    }

    /// Insert a custom stage directly after the stage named `after`
    pub fn with_stage_after(mut self, after: &'static str, stage: Box<dyn Stage>) -> Self {
        self.custom_stages.push((after, stage));
        self
    }

    pub fn build(self) -> Result<SubmissionPipeline> {
        self.config.validate()?;

        let backend = self.backend.ok_or_else(|| {
            IntakeError::ConfigurationError("an enrichment backend is required".to_string())
        })?;
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(InMemoryIdempotencyStore::<SubmissionContext>::new()));
        let known = self
            .known_identifiers
            .unwrap_or_else(|| Arc::new(IdentifierRegistry::new()));
        let rules = self
            .rules
            .unwrap_or_else(|| rules_from_config(&self.config.rules));
        let circuit_breaker = self.circuit_breaker.or_else(|| {
            self.config.circuit_breaker.enabled.then(|| {
                Arc::new(CircuitBreaker::new(
                    "enrichment".to_string(),
                    self.config.circuit_breaker.to_resilience_config(),
                ))
            })
        });
        let hasher = self.config.key_hasher();

        let mut stages: Vec<Box<dyn Stage>> = vec![
            Box::new(IdempotencyStage::new(hasher.clone(), Arc::clone(&cache))),
            Box::new(ValidationStage::new(
                self.config.validation.required_fields.clone(),
                self.config.validation.identifier_field.clone(),
            )),
            Box::new(DecisionStage::new(rules)),
            Box::new(DuplicateStage::new(known)),
            Box::new(EnrichmentStage::new(
                backend,
                circuit_breaker,
                self.config.enrichment.timeout(),
            )),
        ];

        for (after, stage) in self.custom_stages {
            let position = stages
                .iter()
                .position(|existing| existing.name() == after)
                .ok_or_else(|| {
                    IntakeError::ConfigurationError(format!(
                        "cannot insert stage '{}': no stage named '{after}'",
                        stage.name()
                    ))
                })?;
            stages.insert(position + 1, stage);
        }

        SubmissionPipeline::from_stages(stages, cache, hasher)
    }
}
