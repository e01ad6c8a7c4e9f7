//! Idempotency store contract and in-process implementation.
//!
//! A store maps "I have seen this exact request" to "the result produced the
//! first time". Results are write-once: `set_if_absent` must be atomic with
//! respect to concurrent callers on the same key, which for a shared backend
//! means a native conditional insert (`SET key value NX` in Redis,
//! `INSERT ... ON CONFLICT DO NOTHING` in PostgreSQL).

use crate::idempotency::IdempotencyKey;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Write-once result store keyed by idempotency key.
///
/// No operation fails for a well-formed key; an absent key is a normal
/// outcome reported as `None` / `false`.
#[async_trait]
pub trait IdempotencyStore<T>: Send + Sync
where
    T: Send + 'static,
{
    /// Stored result for `key`, or `None` if this content has not been seen
    async fn get(&self, key: &IdempotencyKey) -> Option<T>;

    /// Store `value` only if `key` is vacant. Returns true iff this call wrote it.
    async fn set_if_absent(&self, key: &IdempotencyKey, value: T) -> bool;

    async fn exists(&self, key: &IdempotencyKey) -> bool;

    /// Get the name of the store provider
    fn provider_name(&self) -> &'static str;
}

/// Process-local store. Not shared across processes and lost on restart.
#[derive(Debug)]
pub struct InMemoryIdempotencyStore<T> {
    entries: DashMap<IdempotencyKey, T>,
}

impl<T> InMemoryIdempotencyStore<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for InMemoryIdempotencyStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> IdempotencyStore<T> for InMemoryIdempotencyStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &IdempotencyKey) -> Option<T> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    async fn set_if_absent(&self, key: &IdempotencyKey, value: T) -> bool {
        // The entry holds the shard lock, making check-and-insert atomic per key
        match self.entries.entry(key.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(value);
                true
            }
        }
    }

    async fn exists(&self, key: &IdempotencyKey) -> bool {
        self.entries.contains_key(key)
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idempotency::KeyHasher;
    use crate::models::RequestPayload;
    use serde_json::json;
    use std::sync::Arc;

    fn key(id: &str) -> IdempotencyKey {
        KeyHasher::default().compute(&RequestPayload::from_value(json!({ "id": id })).unwrap())
    }

    #[tokio::test]
    async fn test_absent_key_is_not_an_error() {
        let store: InMemoryIdempotencyStore<String> = InMemoryIdempotencyStore::new();
        assert_eq!(store.get(&key("a")).await, None);
        assert!(!store.exists(&key("a")).await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_set_if_absent_is_write_once() {
        let store = InMemoryIdempotencyStore::new();
        assert!(store.set_if_absent(&key("a"), "first".to_string()).await);
        assert!(!store.set_if_absent(&key("a"), "second".to_string()).await);

        assert_eq!(store.get(&key("a")).await.as_deref(), Some("first"));
        assert!(store.exists(&key("a")).await);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_set_if_absent_has_single_winner() {
        let store = Arc::new(InMemoryIdempotencyStore::new());
        let target = key("contended");

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                let target = target.clone();
                tokio::spawn(async move { store.set_if_absent(&target, i).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.len(), 1);
    }
}
