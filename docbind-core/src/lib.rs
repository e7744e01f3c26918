//! A typed object-document mapping layer: declare a schema once, populate
//! and mutate instances freely, persist only what changed.
//!
//! This crate is the core of the docbind project and provides:
//!
//! - **Field descriptors** ([`field`]) - Validators/normalizers for every primitive value kind
//! - **Schema registry** ([`schema`]) - Explicit per-type field layouts merged across inheritance
//! - **Models** ([`model`]) - Schema-bound instances with baseline snapshots and recursive dirty tracking
//! - **Embedded lists** ([`list`]) - Ordered typed collections tracking structural edits
//! - **Store backend abstraction** ([`backend`]) - The storage collaborator boundary
//! - **Error handling** ([`error`]) - The validation/ambiguity error taxonomy
//!
//! # Example
//!
//! ```ignore
//! use std::sync::OnceLock;
//! use docbind_core::field::{FieldType, Value};
//! use docbind_core::model::Model;
//! use docbind_core::schema::{FieldSpec, Schema};
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
//! # async fn example(store: &dyn docbind_core::backend::StoreBackend) -> docbind_core::error::ModelResult<()> {
//! let mut item = Model::with_values(
//!     item_schema(),
//!     [("name", Value::text("something")), ("value", Value::from(134))],
//! )?;
//! item.save(store).await?;
//! assert!(item.identity().is_some());
//! assert!(!item.is_dirty()?);
//! # Ok(()) }
//! ```

pub mod backend;
pub mod error;
pub mod field;
pub mod list;
pub mod model;
pub mod schema;
