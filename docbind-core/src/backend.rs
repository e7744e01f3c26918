//! Storage collaborator abstraction.
//!
//! The mapping engine never talks to a store directly: persistence
//! operations hand already-validated, already-serialized payloads to a
//! [`StoreBackend`] and get raw stored records back. Implementations are
//! required to be thread-safe (`Send + Sync`); the trait is object-safe and
//! is consumed as `&dyn StoreBackend` by the model operations.
//!
//! The backend owns identifier generation: [`StoreBackend::save`] mints the
//! identity for a record carrying no `_id`, and the engine treats whatever
//! it returns as an opaque token.

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use std::fmt::Debug;

use crate::error::ModelResult;

/// Abstract interface to one document store.
///
/// Filters are flat mappings of (possibly dotted) field paths to storage
/// values, as produced by the model layer's query construction. All
/// operations are scoped to a named collection.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Returns all records matching `filter`, in stable store order.
    ///
    /// An empty filter matches every record in the collection.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`](crate::error::ModelError) if the lookup fails.
    async fn find(&self, filter: Document, collection: &str) -> ModelResult<Vec<Document>>;

    /// Persists a record and returns its identity.
    ///
    /// Inserts a new record (minting a fresh identity) when `values` carries
    /// no `_id` entry; otherwise replaces/upserts the record with that
    /// identity.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`](crate::error::ModelError) if the write fails.
    async fn save(&self, values: Document, collection: &str) -> ModelResult<ObjectId>;

    /// Removes records matching `filter`.
    ///
    /// Removes every match when `multi` is true, at most one otherwise.
    /// Returns the number of records removed.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`](crate::error::ModelError) if the delete fails.
    async fn remove(&self, filter: Document, multi: bool, collection: &str) -> ModelResult<u64>;
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn find(&self, filter: Document, collection: &str) -> ModelResult<Vec<Document>> {
        (*self).find(filter, collection).await
    }

    async fn save(&self, values: Document, collection: &str) -> ModelResult<ObjectId> {
        (*self).save(values, collection).await
    }

    async fn remove(&self, filter: Document, multi: bool, collection: &str) -> ModelResult<u64> {
        (*self)
            .remove(filter, multi, collection)
            .await
    }
}

#[async_trait]
impl<B> StoreBackend for &mut B
where
    B: StoreBackend,
{
    async fn find(&self, filter: Document, collection: &str) -> ModelResult<Vec<Document>> {
        (**self).find(filter, collection).await
    }

    async fn save(&self, values: Document, collection: &str) -> ModelResult<ObjectId> {
        (**self).save(values, collection).await
    }

    async fn remove(&self, filter: Document, multi: bool, collection: &str) -> ModelResult<u64> {
        (**self)
            .remove(filter, multi, collection)
            .await
    }
}

/// Factory trait for constructing backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> ModelResult<Self::Backend>;
}
