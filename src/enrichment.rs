//! # Enrichment Backends
//!
//! External risk-data lookup consulted by the enrichment stage. A backend
//! answers one question: what do we know about this identifier? Absence and
//! errors are both "no usable data" to the pipeline; the distinction only
//! shows up in the failure marker's reason.

use crate::error::EnrichmentError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub type EnrichmentData = Map<String, Value>;

#[async_trait]
pub trait EnrichmentBackend: Send + Sync {
    /// Look up enrichment data for a submission identifier
    async fn fetch(&self, identifier: &str) -> Result<Option<EnrichmentData>, EnrichmentError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Fixed lookup table, for tests, demos and seeded local runs
#[derive(Debug, Clone, Default)]
pub struct StaticEnrichmentBackend {
    records: HashMap<String, EnrichmentData>,
}

impl StaticEnrichmentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, identifier: impl Into<String>, data: EnrichmentData) -> Self {
        self.records.insert(identifier.into(), data);
        self
    }

    /// Build from a JSON object of `identifier → object` entries; non-object
    /// entries are rejected as malformed.
    pub fn from_json(value: Value) -> Result<Self, EnrichmentError> {
        let Value::Object(entries) = value else {
            return Err(EnrichmentError::MalformedResponse {
                identifier: "*".to_string(),
                reason: "expected an object of identifier → record".to_string(),
            });
        };

        let mut backend = Self::new();
        for (identifier, record) in entries {
            match record {
                Value::Object(data) => {
                    backend.records.insert(identifier, data);
                }
                _ => {
                    return Err(EnrichmentError::MalformedResponse {
                        identifier,
                        reason: "record must be an object".to_string(),
                    })
                }
            }
        }
        Ok(backend)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl EnrichmentBackend for StaticEnrichmentBackend {
    async fn fetch(&self, identifier: &str) -> Result<Option<EnrichmentData>, EnrichmentError> {
        Ok(self.records.get(identifier).cloned())
    }

    fn backend_name(&self) -> &'static str {
        "static"
    }
}
