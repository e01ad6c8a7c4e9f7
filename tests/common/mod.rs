//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use submission_intake::config::IntakeConfig;
use submission_intake::enrichment::{EnrichmentBackend, EnrichmentData};
use submission_intake::error::EnrichmentError;
use submission_intake::models::RequestPayload;
use tracing::Level;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn payload(value: Value) -> RequestPayload {
    RequestPayload::from_value(value).expect("test payload must be an object")
}

pub fn valid_submission(company_id: &str) -> RequestPayload {
    payload(json!({
        "company_id": company_id,
        "company_name": "Acme Corp",
        "revenue": 5_000_000,
        "industry": "Retail",
        "state": "CA"
    }))
}

/// Default configuration without the built-in rules
pub fn test_config() -> IntakeConfig {
    IntakeConfig::default()
}

/// Enrichment backend spy: records every call and serves canned records.
/// Identifiers listed in `failing` return a backend error.
#[derive(Default)]
pub struct SpyBackend {
    records: HashMap<String, EnrichmentData>,
    failing: Vec<String>,
    calls: AtomicUsize,
}

impl SpyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, identifier: &str, data: Value) -> Self {
        let Value::Object(map) = data else {
            panic!("record must be an object");
        };
        self.records.insert(identifier.to_string(), map);
        self
    }

    pub fn failing_for(mut self, identifier: &str) -> Self {
        self.failing.push(identifier.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl EnrichmentBackend for SpyBackend {
    async fn fetch(&self, identifier: &str) -> Result<Option<EnrichmentData>, EnrichmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|id| id == identifier) {
            return Err(EnrichmentError::Unavailable("simulated outage".to_string()));
        }
        Ok(self.records.get(identifier).cloned())
    }

    fn backend_name(&self) -> &'static str {
        "spy"
    }
}

/// Enrichment backend that holds each call open for `delay` and records the
/// highest number of calls in flight at once.
pub struct GaugeBackend {
    delay: std::time::Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl GaugeBackend {
    pub fn new(delay: std::time::Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnrichmentBackend for GaugeBackend {
    async fn fetch(&self, _identifier: &str) -> Result<Option<EnrichmentData>, EnrichmentError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let mut data = EnrichmentData::new();
        data.insert("score".to_string(), json!(50));
        Ok(Some(data))
    }

    fn backend_name(&self) -> &'static str {
        "gauge"
    }
}
