//! In-memory storage backend for docbind.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `StoreBackend` collaborator. It uses async-aware read-write locks for
//! concurrent access and is ideal for development and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Insertion-ordered results** - `find` returns records in first-save order
//! - **Identity minting** - Issues `ObjectId` identities for new records
//! - **Flat filter matching** - Dotted-path equality with numeric normalization
//!
//! # Quick Start
//!
//! ```ignore
//! use docbind_core::{field::Value, model::Model};
//! use docbind_memory::InMemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStore::builder().build().await?;
//!
//!     let mut item = Model::with_values(
//!         item_schema(),
//!         [("name", Value::text("something")), ("value", Value::from(134))],
//!     )?;
//!     item.save(&store).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod matcher;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
