//! # Idempotency
//!
//! At-least-once delivery means the same logical submission can arrive more
//! than once. This module turns any async processing function into one that
//! runs at most once per distinct payload content:
//!
//! - [`KeyHasher`] derives a content key that ignores field order and
//!   delivery metadata such as timestamps or correlation ids.
//! - [`IdempotencyStore`] is the write-once result store contract, with an
//!   in-process implementation in [`InMemoryIdempotencyStore`].
//! - [`IdempotentProcessor`] wraps the processing function with double-checked
//!   acquisition over per-key locks.

pub mod key;
pub mod processor;
pub mod store;

pub use key::{to_canonical_json, IdempotencyKey, KeyHasher};
pub use processor::{IdempotentProcessor, ProcessingRecord};
pub use store::{IdempotencyStore, InMemoryIdempotencyStore};
