//! Main docbind crate: a typed object-document mapping layer.
//!
//! This crate is the primary entry point for users of the docbind framework.
//! It re-exports the core engine from the sub-crates and provides convenient
//! access to the bundled in-memory backend.
//!
//! # Features
//!
//! - **Explicit schemas** - Declare a type's field layout once, merged across inheritance, cached for the process lifetime
//! - **Per-field contracts** - Every value written is validated and normalized by its field descriptor
//! - **Dirty tracking** - Instances diff themselves recursively against the snapshot taken at load time, embedded documents and lists included
//! - **Minimal persistence** - Saving is a no-op unless something actually changed
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::OnceLock;
//! use docbind::prelude::*;
//! use docbind::memory::InMemoryStore;
//!
//! fn item_schema() -> &'static Schema {
//!     static SCHEMA: OnceLock<Schema> = OnceLock::new();
//!     SCHEMA.get_or_init(|| {
//!         Schema::builder("Item", "items")
//!             .field("name", FieldSpec::Primitive(FieldType::Text))
//!             .field("value", FieldSpec::Primitive(FieldType::Integer))
//!             .build()
//!     })
//! }
//!
//! #[tokio::main]
//! async fn main() -> ModelResult<()> {
//!     let store = InMemoryStore::builder().build().await?;
//!
//!     // Create and persist an instance.
//!     let mut item = Model::with_values(
//!         item_schema(),
//!         [("name", Value::text("something")), ("value", Value::from(134))],
//!     )?;
//!     item.save(&store).await?;
//!     assert!(item.identity().is_some());
//!
//!     // Saving again without changes writes nothing.
//!     item.save(&store).await?;
//!
//!     // Mutate and diff: the original value is reported until the next save.
//!     item.set("name", Value::text("renamed"))?;
//!     assert!(item.is_dirty()?);
//!     item.save(&store).await?;
//!
//!     // Look it up fresh; `None` would mean no match, two matches an error.
//!     let found = Model::get(item_schema(), &store, item.build_query(&["name"], false)?).await?;
//!     assert!(found.is_some());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! The engine talks to any [`StoreBackend`](docbind_core::backend::StoreBackend)
//! implementation; [`memory`] provides the bundled in-memory one.

pub use docbind_core::{backend, error, field, list, model, schema};

// Re-export BSON types for convenience
pub use bson;

pub mod prelude;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docbind_memory::{InMemoryStore, InMemoryStoreBuilder};
}
