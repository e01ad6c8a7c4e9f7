//! Content-addressed idempotency keys.
//!
//! The key is the SHA-256 of a canonical JSON rendering of the payload with
//! excluded fields removed. Object keys are sorted at every depth, so neither
//! insertion order nor delivery metadata can change the key.

use crate::constants::DEFAULT_EXCLUDED_FIELDS;
use crate::models::RequestPayload;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Hex-encoded SHA-256 digest identifying a payload's content
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 16-character prefix, enough to correlate log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(16)]
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes idempotency keys, skipping a fixed set of top-level fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHasher {
    excluded_fields: BTreeSet<String>,
}

impl KeyHasher {
    pub fn new<I, S>(excluded_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded_fields: excluded_fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn excluded_fields(&self) -> impl Iterator<Item = &str> {
        self.excluded_fields.iter().map(String::as_str)
    }

    pub fn is_excluded(&self, field: &str) -> bool {
        self.excluded_fields.contains(field)
    }

    /// Canonical JSON of the payload's content fields
    pub fn canonicalize(&self, payload: &RequestPayload) -> String {
        let content: BTreeMap<&String, String> = payload
            .fields()
            .filter(|(name, _)| !self.is_excluded(name))
            .map(|(name, value)| (name, to_canonical_json(value)))
            .collect();
        render_object(content)
    }

    pub fn compute(&self, payload: &RequestPayload) -> IdempotencyKey {
        let mut hasher = Sha256::new();
        hasher.update(self.canonicalize(payload).as_bytes());
        IdempotencyKey(format!("{:x}", hasher.finalize()))
    }
}

impl Default for KeyHasher {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_FIELDS.iter().copied())
    }
}

/// Render a JSON value with object keys sorted at every level
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let tree: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, to_canonical_json(v))).collect();
            render_object(tree)
        }
    }
}

fn render_object(tree: BTreeMap<&String, String>) -> String {
    let items: Vec<String> = tree
        .into_iter()
        .map(|(k, v)| format!("{}:{}", quote(k), v))
        .collect();
    format!("{{{}}}", items.join(","))
}

fn quote(s: &str) -> String {
    Value::String(s.to_owned()).to_string()
}
