//! Stage 1: short-circuit replays of already processed payloads.
//!
//! Only checks the cache. Storing is left to the orchestrator once the whole
//! chain has completed, so a partially processed context is never cached.

use crate::idempotency::{IdempotencyStore, KeyHasher};
use crate::models::SubmissionContext;
use crate::pipeline::{Stage, Successor};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

pub struct IdempotencyStage {
    hasher: KeyHasher,
    cache: Arc<dyn IdempotencyStore<SubmissionContext>>,
    next: Successor,
}

impl IdempotencyStage {
    pub fn new(hasher: KeyHasher, cache: Arc<dyn IdempotencyStore<SubmissionContext>>) -> Self {
        Self {
            hasher,
            cache,
            next: Successor::default(),
        }
    }
}

#[async_trait]
impl Stage for IdempotencyStage {
    fn name(&self) -> &'static str {
        "idempotency"
    }

    async fn handle(&self, mut ctx: SubmissionContext) -> SubmissionContext {
        let key = self.hasher.compute(ctx.payload());

        if let Some(cached) = self.cache.get(&key).await {
            info!(
                idempotency_key = %key.short(),
                "Idempotency hit - returning cached result"
            );
            return cached.replay_copy();
        }

        debug!(idempotency_key = %key.short(), "Idempotency miss");
        ctx.set_idempotency_key(key);
        self.next.forward(ctx).await
    }

    fn set_next(&mut self, next: Box<dyn Stage>) {
        self.next.set(next);
    }
}
