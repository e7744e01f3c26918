//! Convenient re-exports of commonly used types from docbind.
//!
//! Import this prelude module to quickly access the most frequently used
//! types and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docbind::prelude::*;
//! ```

pub use docbind_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{ModelError, ModelResult},
    field::{EntityRef, FieldType, ReferenceResolver, Value},
    list::ModelList,
    model::Model,
    schema::{ElementKind, FieldSpec, Schema, SchemaBuilder},
};
