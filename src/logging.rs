//! # Structured Logging Module
//!
//! Environment-aware structured logging. Development and test runs get
//! human-readable console output; production emits JSON lines. `RUST_LOG`
//! overrides the environment's default level when set.

use crate::models::SubmissionContext;
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let layer: Box<dyn Layer<Registry> + Send + Sync> = if environment == "production" {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_filter(filter)
                .boxed()
        };

        // A host application may already have installed a subscriber
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

fn get_environment() -> String {
    std::env::var("INTAKE_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
        .to_lowercase()
}

fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log the final disposition of one submission
pub fn log_submission_outcome(ctx: &SubmissionContext) {
    tracing::info!(
        identifier = ctx.identifier(),
        idempotency_key = ctx.idempotency_key().map(|key| key.short()),
        status = %ctx.status(),
        was_replay = ctx.was_replay(),
        warnings = ctx.warnings().len(),
        errors = ctx.errors().len(),
        enrichment_failed = ctx.enrichment_failed(),
        timestamp = %Utc::now().to_rfc3339(),
        "📋 SUBMISSION_OUTCOME"
    );
}
