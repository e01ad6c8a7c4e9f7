//! # Idempotent Processor
//!
//! Wraps an async processing function so that it runs at most once per
//! distinct payload content within this process.
//!
//! ## Double-checked acquisition
//!
//! 1. Fast path, no lock: a stored result is returned immediately as a replay.
//! 2. Slow path: take the lock for this key only. Unrelated keys never wait on
//!    each other.
//! 3. Re-check under the lock, since another caller may have finished while
//!    this one waited.
//! 4. Still absent: run the function, store with `set_if_absent`, release.
//!
//! Per-key locks are created on demand and dropped from the lock table once
//! the last caller holding them is done, so the table only ever contains keys
//! that are in flight.

use crate::idempotency::{IdempotencyKey, IdempotencyStore, KeyHasher};
use crate::models::RequestPayload;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

type ProcessorFn<T> = dyn Fn(RequestPayload) -> BoxFuture<'static, T> + Send + Sync;
type KeyLockTable = DashMap<IdempotencyKey, KeyLockSlot>;

/// Lock for one key plus the number of live leases on it
#[derive(Default)]
struct KeyLockSlot {
    mutex: Arc<Mutex<()>>,
    leases: usize,
}

/// Outcome of one `process` call
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingRecord<T> {
    pub result: T,
    /// True when the result came from the store instead of a fresh run
    pub was_replay: bool,
    pub idempotency_key: IdempotencyKey,
}

/// Makes any processing function idempotent
pub struct IdempotentProcessor<T: Send + 'static> {
    store: Arc<dyn IdempotencyStore<T>>,
    hasher: KeyHasher,
    processor_fn: Arc<ProcessorFn<T>>,
    key_locks: KeyLockTable,
}

impl<T: Send + 'static> std::fmt::Debug for IdempotentProcessor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotentProcessor")
            .field("store", &self.store.provider_name())
            .field("hasher", &self.hasher)
            .field("in_flight_keys", &self.key_locks.len())
            .finish()
    }
}

impl<T> IdempotentProcessor<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(store: Arc<dyn IdempotencyStore<T>>, hasher: KeyHasher, processor_fn: F) -> Self
    where
        F: Fn(RequestPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self {
            store,
            hasher,
            processor_fn: Arc::new(move |payload| processor_fn(payload).boxed()),
            key_locks: DashMap::new(),
        }
    }

    pub fn hasher(&self) -> &KeyHasher {
        &self.hasher
    }

    /// Number of keys whose lock is currently held or awaited
    pub fn in_flight_keys(&self) -> usize {
        self.key_locks.len()
    }

    /// Process a payload; the wrapped function runs at most once per key
    pub async fn process(&self, payload: RequestPayload) -> ProcessingRecord<T> {
        let key = self.hasher.compute(&payload);

        if let Some(cached) = self.store.get(&key).await {
            info!(idempotency_key = %key.short(), "Idempotency replay: returning cached result");
            return ProcessingRecord {
                result: cached,
                was_replay: true,
                idempotency_key: key,
            };
        }

        let lease = KeyLockLease::acquire(&self.key_locks, &key);
        let _guard = lease.mutex().lock().await;

        if let Some(cached) = self.store.get(&key).await {
            info!(
                idempotency_key = %key.short(),
                "Idempotency replay (post-lock): returning cached result"
            );
            return ProcessingRecord {
                result: cached,
                was_replay: true,
                idempotency_key: key,
            };
        }

        info!(idempotency_key = %key.short(), "Processing new submission");
        let result = (self.processor_fn)(payload).await;

        if !self.store.set_if_absent(&key, result.clone()).await {
            // The wrapped function or another process sharing the store wrote first
            debug!(
                idempotency_key = %key.short(),
                "Result already stored by another writer; keeping the first write"
            );
        }

        ProcessingRecord {
            result,
            was_replay: false,
            idempotency_key: key,
        }
    }
}

/// Lease on a per-key lock. Leases are counted under the table's shard lock
/// and the entry is removed when the count reaches zero, so a lock is
/// evicted once no caller holds or awaits it.
struct KeyLockLease<'a> {
    table: &'a KeyLockTable,
    key: IdempotencyKey,
    mutex: Arc<Mutex<()>>,
}

impl<'a> KeyLockLease<'a> {
    fn acquire(table: &'a KeyLockTable, key: &IdempotencyKey) -> Self {
        let mut slot = table.entry(key.clone()).or_default();
        slot.leases += 1;
        let mutex = Arc::clone(&slot.mutex);
        drop(slot);

        Self {
            table,
            key: key.clone(),
            mutex,
        }
    }

    fn mutex(&self) -> &Mutex<()> {
        &self.mutex
    }
}

impl Drop for KeyLockLease<'_> {
    fn drop(&mut self) {
        if let Entry::Occupied(mut slot) = self.table.entry(self.key.clone()) {
            slot.get_mut().leases -= 1;
            if slot.get().leases == 0 {
                slot.remove();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idempotency::InMemoryIdempotencyStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn payload(id: &str) -> RequestPayload {
        RequestPayload::from_value(json!({ "company_id": id })).unwrap()
    }

    fn counting_processor(calls: Arc<AtomicUsize>) -> IdempotentProcessor<String> {
        IdempotentProcessor::new(
            Arc::new(InMemoryIdempotencyStore::<String>::new()),
            KeyHasher::default(),
            move |payload: RequestPayload| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    payload.text_field("company_id").unwrap_or_default()
                }
            },
        )
    }

    #[tokio::test]
    async fn test_second_call_is_replay() {
        let calls = Arc::new(AtomicUsize::new(0));
        let processor = counting_processor(Arc::clone(&calls));

        let first = processor.process(payload("A")).await;
        let second = processor.process(payload("A")).await;

        assert!(!first.was_replay);
        assert!(second.was_replay);
        assert_eq!(first.result, second.result);
        assert_eq!(first.idempotency_key, second.idempotency_key);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_excluded_fields_hit_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let processor = counting_processor(Arc::clone(&calls));

        processor.process(payload("A")).await;
        let redelivered = RequestPayload::from_value(json!({
            "company_id": "A",
            "received_at": "2024-06-01T12:00:05Z"
        }))
        .unwrap();
        let record = processor.process(redelivered).await;

        assert!(record.was_replay);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lock_table_is_drained_after_processing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let processor = counting_processor(Arc::clone(&calls));

        for id in ["A", "B", "C"] {
            processor.process(payload(id)).await;
        }
        assert_eq!(processor.in_flight_keys(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_identical_payloads_process_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let processor = Arc::new(counting_processor(Arc::clone(&calls)));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let processor = Arc::clone(&processor);
                tokio::spawn(async move { processor.process(payload("same")).await })
            })
            .collect();

        let mut fresh = 0;
        for handle in handles {
            if !handle.await.unwrap().was_replay {
                fresh += 1;
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(fresh, 1);
        assert_eq!(processor.in_flight_keys(), 0);
    }

    #[test]
    fn test_lease_entry_outlives_all_but_last_lease() {
        let table = KeyLockTable::new();
        let key = KeyHasher::default().compute(&payload("A"));

        let first = KeyLockLease::acquire(&table, &key);
        let second = KeyLockLease::acquire(&table, &key);
        assert_eq!(table.get(&key).map(|slot| slot.leases), Some(2));
        assert!(Arc::ptr_eq(&first.mutex, &second.mutex));

        drop(first);
        assert_eq!(table.get(&key).map(|slot| slot.leases), Some(1));
        drop(second);
        assert!(table.is_empty());
    }

    #[test]
    fn test_simultaneous_lease_drops_evict_entry() {
        let table = KeyLockTable::new();
        let key = KeyHasher::default().compute(&payload("A"));

        for _ in 0..500 {
            let barrier = std::sync::Barrier::new(4);
            std::thread::scope(|scope| {
                for _ in 0..4 {
                    scope.spawn(|| {
                        let lease = KeyLockLease::acquire(&table, &key);
                        barrier.wait();
                        drop(lease);
                    });
                }
            });
            assert!(table.is_empty());
        }
    }
}
