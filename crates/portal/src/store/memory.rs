//! In-process record store.
//!
//! Each collection is a `watch` channel holding the full snapshot. Writers
//! modify the snapshot in place; every subscriber sees the new value on its
//! next poll. Used for local development and the integration test suite.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;

use lifestream_core::Collection;

use super::{RawSnapshot, RecordStore, SeedOutcome, StoreError, Subscription, merge_into, new_key};

/// In-memory [`RecordStore`].
#[derive(Debug)]
pub struct MemoryStore {
    channels: HashMap<Collection, watch::Sender<RawSnapshot>>,
    seeded: Mutex<HashSet<Collection>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store with every collection present.
    #[must_use]
    pub fn new() -> Self {
        let channels = Collection::ALL
            .iter()
            .map(|&collection| {
                let (tx, _rx) = watch::channel(RawSnapshot::default());
                (collection, tx)
            })
            .collect();
        Self {
            channels,
            seeded: Mutex::new(HashSet::new()),
        }
    }

    fn channel(&self, collection: Collection) -> &watch::Sender<RawSnapshot> {
        // Every variant is inserted by `new`.
        #[allow(clippy::indexing_slicing)]
        &self.channels[&collection]
    }

    /// Number of records currently held in `collection`.
    #[must_use]
    pub fn len(&self, collection: Collection) -> usize {
        self.channel(collection).borrow().len()
    }

    /// Whether `collection` holds no records.
    #[must_use]
    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn subscribe(&self, collection: Collection) -> Result<Subscription, StoreError> {
        Ok(Subscription::new(
            collection,
            self.channel(collection).subscribe(),
            None,
        ))
    }

    async fn create(&self, collection: Collection, record: Value) -> Result<String, StoreError> {
        let key = new_key();
        let inserted = key.clone();
        self.channel(collection).send_modify(move |snapshot| {
            Arc::make_mut(snapshot).insert(inserted, record);
        });
        Ok(key)
    }

    async fn put(
        &self,
        collection: Collection,
        key: &str,
        record: Value,
    ) -> Result<(), StoreError> {
        let key = key.to_owned();
        self.channel(collection).send_modify(move |snapshot| {
            Arc::make_mut(snapshot).insert(key, record);
        });
        Ok(())
    }

    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.channel(collection).borrow().get(key).cloned())
    }

    async fn update(
        &self,
        collection: Collection,
        key: &str,
        partial: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let mut found = false;
        self.channel(collection).send_if_modified(|snapshot| {
            if !snapshot.contains_key(key) {
                return false;
            }
            if let Some(existing) = Arc::make_mut(snapshot).get_mut(key) {
                merge_into(existing, partial);
                found = true;
            }
            found
        });

        if found {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                collection,
                key: key.to_owned(),
            })
        }
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        self.channel(collection).send_if_modified(|snapshot| {
            snapshot.contains_key(key) && Arc::make_mut(snapshot).remove(key).is_some()
        });
        Ok(())
    }

    async fn ensure_seeded(
        &self,
        collection: Collection,
        seeds: Vec<Value>,
    ) -> Result<SeedOutcome, StoreError> {
        let mut seeded = self.seeded.lock().unwrap_or_else(PoisonError::into_inner);
        if !seeded.insert(collection) {
            return Ok(SeedOutcome::AlreadySeeded);
        }

        let channel = self.channel(collection);
        if !channel.borrow().is_empty() {
            return Ok(SeedOutcome::NotEmpty);
        }

        let count = seeds.len();
        let records: BTreeMap<String, Value> =
            seeds.into_iter().map(|seed| (new_key(), seed)).collect();
        channel.send_modify(move |snapshot| Arc::make_mut(snapshot).extend(records));
        drop(seeded);

        Ok(SeedOutcome::Seeded(count))
    }
}
