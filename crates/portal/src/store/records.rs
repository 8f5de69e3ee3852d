//! Typed access to one collection.
//!
//! Snapshots arrive as raw JSON. Each record is decoded into its entity type
//! here; a record that fails to decode is logged and left out of the
//! snapshot rather than failing the whole collection.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use lifestream_core::Record;

use super::{RawSnapshot, RecordStore, StoreError, Subscription};

/// Decode every well-formed record in `raw`, in key order.
#[must_use]
pub fn decode_snapshot<T: Record>(raw: &RawSnapshot) -> Vec<T> {
    raw.iter()
        .filter_map(|(key, value)| match decode::<T>(key, value) {
            Ok(entity) => Some(entity),
            Err(e) => {
                warn!(collection = %T::COLLECTION, key = %key, error = %e, "Skipping malformed record");
                None
            }
        })
        .collect()
}

fn decode<T: Record>(key: &str, value: &Value) -> Result<T, StoreError> {
    let payload = T::Payload::deserialize(value).map_err(|e| StoreError::Malformed {
        collection: T::COLLECTION,
        key: key.to_owned(),
        reason: e.to_string(),
    })?;
    Ok(T::from_payload(T::Key::from(key.to_owned()), payload))
}

fn to_object<P: Serialize>(
    collection: lifestream_core::Collection,
    value: &P,
) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject { collection }),
    }
}

/// Typed handle on the collection holding `T`.
pub struct Records<T: Record> {
    store: Arc<dyn RecordStore>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Record> Clone for Records<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<T: Record> std::fmt::Debug for Records<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Records")
            .field("collection", &T::COLLECTION)
            .finish_non_exhaustive()
    }
}

impl<T: Record> Records<T> {
    /// Wrap a store.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Subscribe to decoded snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot start the subscription.
    pub async fn subscribe(&self) -> Result<TypedSubscription<T>, StoreError> {
        let inner = self.store.subscribe(T::COLLECTION).await?;
        Ok(TypedSubscription {
            inner,
            _entity: PhantomData,
        })
    }

    /// Write a new record under a fresh key.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded or the write fails.
    pub async fn create(&self, payload: &T::Payload) -> Result<T::Key, StoreError> {
        let value = serde_json::to_value(payload)?;
        let key = self.store.create(T::COLLECTION, value).await?;
        Ok(T::Key::from(key))
    }

    /// Write a record under `key`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded or the write fails.
    pub async fn put(&self, key: &T::Key, payload: &T::Payload) -> Result<(), StoreError> {
        let value = serde_json::to_value(payload)?;
        self.store.put(T::COLLECTION, key.as_ref(), value).await
    }

    /// Read and decode one record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if the stored record does not decode.
    pub async fn get(&self, key: &T::Key) -> Result<Option<T>, StoreError> {
        self.store
            .get(T::COLLECTION, key.as_ref())
            .await?
            .map(|value| decode::<T>(key.as_ref(), &value))
            .transpose()
    }

    /// Shallow-merge `patch` into the record at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `key` does not exist.
    pub async fn update<P: Serialize + Sync>(
        &self,
        key: &T::Key,
        patch: &P,
    ) -> Result<(), StoreError> {
        let partial = to_object(T::COLLECTION, patch)?;
        self.store.update(T::COLLECTION, key.as_ref(), partial).await
    }

    /// Remove the record at `key`. Absent keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the delete.
    pub async fn delete(&self, key: &T::Key) -> Result<(), StoreError> {
        self.store.delete(T::COLLECTION, key.as_ref()).await
    }
}

/// A subscription yielding decoded entity lists.
#[derive(Debug)]
pub struct TypedSubscription<T: Record> {
    inner: Subscription,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Record> TypedSubscription<T> {
    /// Wait for the next snapshot. `None` once the store has gone away.
    pub async fn next(&mut self) -> Option<Vec<T>> {
        self.inner.next().await.map(|raw| decode_snapshot(&raw))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use lifestream_core::{
        BloodGroup, BloodRequest, Collection, Donor, DonorRecord, Email, RequestPatch,
        RequestStatus,
    };

    use super::*;
    use crate::store::MemoryStore;

    fn alice() -> DonorRecord {
        DonorRecord {
            user_id: None,
            name: "Alice Johnson".into(),
            blood_group: BloodGroup::APositive,
            last_donation: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            email: Email::parse("alice@example.com").unwrap(),
            phone: "111-222-3333".into(),
        }
    }

    #[tokio::test]
    async fn test_malformed_records_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(Collection::Donors, "bad", json!({ "name": "No group" }))
            .await
            .unwrap();

        let donors: Records<Donor> = Records::new(store.clone());
        let key = donors.create(&alice()).await.unwrap();

        let mut sub = donors.subscribe().await.unwrap();
        let snapshot = sub.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, key);
        assert_eq!(snapshot[0].record.name, "Alice Johnson");
    }

    #[tokio::test]
    async fn test_get_reports_malformed_record() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(Collection::Donors, "bad", json!({ "bloodGroup": "Z+" }))
            .await
            .unwrap();

        let donors: Records<Donor> = Records::new(store);
        let err = donors.get(&"bad".into()).await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_patch_updates_only_status() {
        let store = Arc::new(MemoryStore::new());
        let requests: Records<BloodRequest> = Records::new(store);
        let key = requests
            .create(&lifestream_core::RequestRecord {
                user_id: None,
                patient_name: "Eve Davis".into(),
                blood_group: BloodGroup::APositive,
                units: std::num::NonZeroU32::new(2).unwrap(),
                hospital: "City General".into(),
                urgency: lifestream_core::Urgency::Urgent,
                status: RequestStatus::Pending,
            })
            .await
            .unwrap();

        let patch = RequestPatch {
            status: Some(RequestStatus::Fulfilled),
            ..RequestPatch::default()
        };
        requests.update(&key, &patch).await.unwrap();

        let stored = requests.get(&key).await.unwrap().unwrap();
        assert_eq!(stored.record.status, RequestStatus::Fulfilled);
        assert_eq!(stored.record.patient_name, "Eve Davis");
    }
}
