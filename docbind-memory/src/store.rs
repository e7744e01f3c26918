//! In-memory storage implementation of the store collaborator.
//!
//! This module provides a simple but complete in-memory backend that keeps
//! records as BSON documents in insertion-ordered maps behind async-safe
//! read-write locks.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use indexmap::IndexMap;
use mea::rwlock::RwLock;

use docbind_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::ModelResult,
};

use crate::matcher::FilterMatcher;

type CollectionMap = IndexMap<String, Document>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory record storage backend.
///
/// This struct implements the [`StoreBackend`] trait entirely in memory:
/// every collection is an insertion-ordered map from identifier to record,
/// so `find` returns records in the order they were first saved. Identities
/// are minted here: a record arriving without an `_id` gets a fresh
/// [`ObjectId`], which is what the mapping layer captures as the instance's
/// identity.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state,
/// allowing it to be safely shared across async tasks. Multiple clones of
/// the same instance share the same underlying data.
///
/// # Performance
///
/// `find` scans all records in a collection (no indexing). For small to
/// medium datasets this is typically acceptable; it exists for development
/// and tests rather than production loads.
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// The main storage map: collection_name -> (record_id -> record)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Drops every collection and record. Mainly useful between tests.
    pub async fn clear(&self) {
        self.store.write().await.clear();
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find(&self, filter: Document, collection: &str) -> ModelResult<Vec<Document>> {
        let store = self.store.read().await;
        let records = match store.get(collection) {
            Some(records) => records,
            None => return Ok(vec![]),
        };

        Ok(
            records
                .values()
                .filter(|record| FilterMatcher::matches(record, &filter))
                .cloned()
                .collect()
        )
    }

    async fn save(&self, mut values: Document, collection: &str) -> ModelResult<ObjectId> {
        let id = values
            .get_object_id("_id")
            .unwrap_or_else(|_| ObjectId::new());
        values.insert("_id", id);

        let mut store = self.store.write().await;
        store
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_hex(), values);
        log::trace!("saved record {} in {}", id, collection);

        Ok(id)
    }

    async fn remove(&self, filter: Document, multi: bool, collection: &str) -> ModelResult<u64> {
        let mut store = self.store.write().await;
        let records = match store.get_mut(collection) {
            Some(records) => records,
            None => return Ok(0),
        };

        let mut matching = records
            .iter()
            .filter(|(_, record)| FilterMatcher::matches(record, &filter))
            .map(|(key, _)| key.clone())
            .collect::<Vec<_>>();
        if !multi {
            matching.truncate(1);
        }

        let mut removed = 0;
        for key in matching {
            // shift_remove keeps the remaining records in insertion order
            if records.shift_remove(&key).is_some() {
                removed += 1;
            }
        }
        log::trace!("removed {} record(s) from {}", removed, collection);

        Ok(removed)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// Currently a no-op builder, kept for parity with backends that need
/// connection configuration.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> ModelResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[tokio::test]
    async fn save_mints_identity_when_absent() {
        let store = InMemoryStore::new();
        let id = store.save(doc! { "name": "a" }, "things").await.unwrap();

        let found = store.find(doc! { "_id": id }, "things").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_str("name").unwrap(), "a");
    }

    #[tokio::test]
    async fn save_replaces_by_identity() {
        let store = InMemoryStore::new();
        let id = store.save(doc! { "name": "a" }, "things").await.unwrap();
        let replayed = store
            .save(doc! { "_id": id, "name": "b" }, "things")
            .await
            .unwrap();
        assert_eq!(replayed, id);

        let found = store.find(doc! {}, "things").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_str("name").unwrap(), "b");
    }

    #[tokio::test]
    async fn find_preserves_insertion_order() {
        let store = InMemoryStore::new();
        for name in ["first", "second", "third"] {
            store.save(doc! { "name": name }, "things").await.unwrap();
        }

        let names = store
            .find(doc! {}, "things")
            .await
            .unwrap()
            .iter()
            .map(|record| record.get_str("name").unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn remove_honors_the_multi_flag() {
        let store = InMemoryStore::new();
        for _ in 0..3 {
            store.save(doc! { "kind": "dup" }, "things").await.unwrap();
        }

        let removed = store
            .remove(doc! { "kind": "dup" }, false, "things")
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let removed = store
            .remove(doc! { "kind": "dup" }, true, "things")
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(store.find(doc! {}, "things").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_collection_is_empty_not_an_error() {
        let store = InMemoryStore::new();
        assert!(store.find(doc! {}, "nowhere").await.unwrap().is_empty());
        assert_eq!(store.remove(doc! {}, true, "nowhere").await.unwrap(), 0);
    }
}
