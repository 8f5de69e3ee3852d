//! Record store adapter.
//!
//! Bridges the portal's named collections between a real-time record store
//! and local state. The store speaks raw JSON records keyed by string; the
//! typed boundary lives in [`records`], which decodes snapshots into domain
//! entities and rejects malformed payloads.
//!
//! # Backends
//!
//! - [`MemoryStore`] - in-process store, one `watch` channel per collection
//! - [`PgRecordStore`] - `PostgreSQL` table with `LISTEN/NOTIFY` change feed
//!
//! # Subscriptions
//!
//! [`RecordStore::subscribe`] yields a [`Subscription`]: the current snapshot
//! first, then one full snapshot per change. Dropping the subscription
//! releases it. Re-subscribing restarts the sequence from the latest value.
//!
//! # Seeding
//!
//! [`RecordStore::ensure_seeded`] is a bootstrap step guarded by a
//! per-collection marker. It is never called from the read/write path.

pub mod memory;
pub mod postgres;
pub mod records;
pub mod seed;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use lifestream_core::Collection;

pub use memory::MemoryStore;
pub use postgres::PgRecordStore;
pub use records::{Records, TypedSubscription};

/// Full contents of one collection: key to raw record.
pub type RawSnapshot = Arc<BTreeMap<String, Value>>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The record to update does not exist.
    #[error("{collection}/{key} not found")]
    NotFound { collection: Collection, key: String },

    /// A payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored record does not match its entity schema.
    #[error("malformed record at {collection}/{key}: {reason}")]
    Malformed {
        collection: Collection,
        key: String,
        reason: String,
    },

    /// A partial update was not a JSON object.
    #[error("partial update for {collection} must be a JSON object")]
    NotAnObject { collection: Collection },

    /// The write task was cancelled or panicked before acknowledging.
    #[error("write was not acknowledged: {0}")]
    Dispatch(String),
}

impl StoreError {
    /// Whether retrying the same operation later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Dispatch(_))
    }
}

/// Result of a bootstrap seeding attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The collection was empty; this many seed records were written.
    Seeded(usize),
    /// The marker was already set by an earlier bootstrap.
    AlreadySeeded,
    /// The collection already held data; the marker is now set, nothing written.
    NotEmpty,
}

/// Remote record store holding raw JSON records per collection.
///
/// Every operation touches a single key; no multi-key transactions are
/// offered. Concurrent writers resolve by last-write-wins.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Start a snapshot subscription for `collection`.
    async fn subscribe(&self, collection: Collection) -> Result<Subscription, StoreError>;

    /// Write `record` under a freshly assigned key and return the key.
    async fn create(&self, collection: Collection, record: Value) -> Result<String, StoreError>;

    /// Write `record` under a caller-chosen key, replacing any existing value.
    async fn put(&self, collection: Collection, key: &str, record: Value)
    -> Result<(), StoreError>;

    /// Read one record.
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError>;

    /// Shallow-merge `partial` into the record at `key`.
    ///
    /// Fails with [`StoreError::NotFound`] when the key is absent.
    async fn update(
        &self,
        collection: Collection,
        key: &str,
        partial: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Remove the record at `key`. Removing an absent key succeeds.
    async fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError>;

    /// Write `seeds` with fresh keys if this collection was never seeded and
    /// is empty.
    async fn ensure_seeded(
        &self,
        collection: Collection,
        seeds: Vec<Value>,
    ) -> Result<SeedOutcome, StoreError>;
}

/// A live snapshot subscription to one collection.
pub struct Subscription {
    collection: Collection,
    rx: watch::Receiver<RawSnapshot>,
    _feed: Option<AbortOnDrop>,
}

impl Subscription {
    /// Wrap a receiver. The current value is delivered by the first `next()`.
    pub(crate) fn new(
        collection: Collection,
        mut rx: watch::Receiver<RawSnapshot>,
        feed: Option<JoinHandle<()>>,
    ) -> Self {
        rx.mark_changed();
        Self {
            collection,
            rx,
            _feed: feed.map(AbortOnDrop),
        }
    }

    /// Collection this subscription follows.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        self.collection
    }

    /// Latest snapshot without waiting.
    #[must_use]
    pub fn current(&self) -> RawSnapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot. `None` once the store side has gone away.
    pub async fn next(&mut self) -> Option<RawSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("collection", &self.collection)
            .field("records", &self.rx.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Aborts a background feed task when the owning subscription is dropped.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Generate a store key for a new record.
pub(crate) fn new_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Shallow-merge `partial` into `target`.
pub(crate) fn merge_into(target: &mut Value, partial: Map<String, Value>) {
    if let Value::Object(existing) = target {
        existing.extend(partial);
    } else {
        *target = Value::Object(partial);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_merge_into_overwrites_only_given_fields() {
        let mut record = json!({ "status": "Pending", "units": 2 });
        let Value::Object(partial) = json!({ "status": "Fulfilled" }) else {
            unreachable!()
        };
        merge_into(&mut record, partial);
        assert_eq!(record, json!({ "status": "Fulfilled", "units": 2 }));
    }

    #[test]
    fn test_new_keys_are_unique() {
        assert_ne!(new_key(), new_key());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(StoreError::Dispatch("cancelled".into()).is_retryable());
        assert!(
            !StoreError::NotFound {
                collection: Collection::Donors,
                key: "k".into()
            }
            .is_retryable()
        );
    }
}
