//! Stage chain behaviour through the public builder

mod common;

use async_trait::async_trait;
use common::{init_test_logging, payload, test_config, valid_submission, SpyBackend};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use submission_intake::config::RevenueAppetiteConfig;
use submission_intake::constants::{enrichment_markers, SubmissionStatus};
use submission_intake::idempotency::{IdempotencyStore, InMemoryIdempotencyStore};
use submission_intake::models::SubmissionContext;
use submission_intake::orchestration::SubmissionPipelineBuilder;
use submission_intake::pipeline::{Stage, Successor};
use submission_intake::registry::IdentifierRegistry;
use submission_intake::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use submission_intake::rules::{ExcludedIndustryRule, RuleSet};

#[tokio::test]
async fn test_missing_company_name_never_reaches_enrichment() {
    init_test_logging();
    let backend = SpyBackend::new().shared();
    let pipeline = SubmissionPipelineBuilder::from_config(test_config())
        .with_enrichment_backend(backend.clone())
        .build()
        .unwrap();

    let ctx = pipeline
        .run(payload(json!({
            "company_id": "NO-NAME",
            "revenue": 1_000_000,
            "industry": "Retail",
            "state": "CA"
        })))
        .await;

    assert_eq!(ctx.status(), SubmissionStatus::Error);
    assert_eq!(ctx.errors(), ["Missing required fields: company_name"]);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_rejected_submission_never_reaches_enrichment() {
    let backend = SpyBackend::new().shared();
    let rules: RuleSet = vec![Arc::new(ExcludedIndustryRule::new(["Retail"]))];
    let pipeline = SubmissionPipelineBuilder::from_config(test_config())
        .with_enrichment_backend(backend.clone())
        .with_rules(rules)
        .build()
        .unwrap();

    let ctx = pipeline.run(valid_submission("R-1")).await;

    assert_eq!(ctx.status(), SubmissionStatus::Declined);
    assert!(ctx.decision_reason().is_some());
    assert!(ctx.enrichment_data().is_empty());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_configured_rules_decline_out_of_appetite_revenue() {
    let mut config = test_config();
    config.rules.revenue_appetite = Some(RevenueAppetiteConfig {
        min: 10_000.0,
        max: 500_000_000.0,
    });
    let pipeline = SubmissionPipelineBuilder::from_config(config)
        .with_enrichment_backend(SpyBackend::new().shared())
        .build()
        .unwrap();

    let mut fields = valid_submission("BIG-1").as_map().clone();
    fields.insert("revenue".to_string(), json!("$750,000,000"));
    let ctx = pipeline.run(fields.into()).await;

    assert_eq!(ctx.status(), SubmissionStatus::Declined);
}

#[tokio::test]
async fn test_duplicate_is_still_enriched() {
    let backend = SpyBackend::new()
        .with_record("DUP-1", json!({"score": 55}))
        .shared();
    let known: IdentifierRegistry = ["DUP-1"].into_iter().collect();
    let pipeline = SubmissionPipelineBuilder::from_config(test_config())
        .with_enrichment_backend(backend.clone())
        .with_known_identifiers(Arc::new(known))
        .build()
        .unwrap();

    let ctx = pipeline.run(valid_submission("DUP-1")).await;

    assert_eq!(ctx.status(), SubmissionStatus::Duplicate);
    assert_eq!(ctx.enrichment_data().get("score"), Some(&json!(55)));
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_same_payload_twice_is_replayed() {
    let cache = Arc::new(InMemoryIdempotencyStore::<SubmissionContext>::new());
    let backend = SpyBackend::new()
        .with_record("REP-1", json!({"score": 80}))
        .shared();
    let pipeline = SubmissionPipelineBuilder::from_config(test_config())
        .with_enrichment_backend(backend.clone())
        .with_cache(cache.clone())
        .build()
        .unwrap();

    let first = pipeline.run(valid_submission("REP-1")).await;
    let second = pipeline.run(valid_submission("REP-1")).await;

    assert!(!first.was_replay());
    assert!(second.was_replay());
    assert_eq!(first.status(), second.status());
    assert_eq!(first.warnings(), second.warnings());
    assert_eq!(first.errors(), second.errors());
    assert_eq!(first.enrichment_data(), second.enrichment_data());
    assert_eq!(first.idempotency_key(), second.idempotency_key());
    assert_eq!(backend.calls(), 1);

    // The stored copy is the original, not the replay
    let key = first.idempotency_key().unwrap();
    assert!(!cache.get(key).await.unwrap().was_replay());
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_open_circuit_skips_enrichment_calls() {
    let backend = SpyBackend::new()
        .failing_for("CB-1")
        .failing_for("CB-2")
        .with_record("CB-3", json!({"score": 10}))
        .shared();
    let breaker = Arc::new(CircuitBreaker::new(
        "enrichment".to_string(),
        CircuitBreakerConfig {
            failure_threshold: 2,
            recovery_timeout: Duration::from_secs(60),
        },
    ));
    let pipeline = SubmissionPipelineBuilder::from_config(test_config())
        .with_enrichment_backend(backend.clone())
        .with_circuit_breaker(breaker.clone())
        .build()
        .unwrap();

    for id in ["CB-1", "CB-2"] {
        let ctx = pipeline.run(valid_submission(id)).await;
        assert_eq!(ctx.status(), SubmissionStatus::Approved);
        assert!(ctx.enrichment_failed());
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    let ctx = pipeline.run(valid_submission("CB-3")).await;
    assert_eq!(backend.calls(), 2);
    assert_eq!(ctx.status(), SubmissionStatus::Approved);
    assert_eq!(
        ctx.enrichment_data().get(enrichment_markers::REASON),
        Some(&json!(enrichment_markers::CIRCUIT_OPEN))
    );
    assert_eq!(breaker.metrics().failure_count, 2);
}

/// Custom stage that stamps a warning and forwards
struct AuditStage {
    next: Successor,
}

#[async_trait]
impl Stage for AuditStage {
    fn name(&self) -> &'static str {
        "audit"
    }

    async fn handle(&self, mut ctx: SubmissionContext) -> SubmissionContext {
        ctx.add_warning(format!("audited at status {}", ctx.status()));
        self.next.forward(ctx).await
    }

    fn set_next(&mut self, next: Box<dyn Stage>) {
        self.next.set(next);
    }
}

#[tokio::test]
async fn test_custom_stage_runs_in_position() {
    let backend = SpyBackend::new()
        .with_record("AUD-1", json!({"score": 1}))
        .shared();
    let pipeline = SubmissionPipelineBuilder::from_config(test_config())
        .with_enrichment_backend(backend.clone())
        .with_stage_after(
            "decision",
            Box::new(AuditStage {
                next: Successor::default(),
            }),
        )
        .build()
        .unwrap();

    let ctx = pipeline.run(valid_submission("AUD-1")).await;

    // Runs after the decision stage approved, and still forwards to enrichment
    assert_eq!(ctx.warnings(), ["audited at status approved"]);
    assert_eq!(backend.calls(), 1);
}
