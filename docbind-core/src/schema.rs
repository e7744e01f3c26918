//! Schema registry: the per-type field layout.
//!
//! A [`Schema`] is the ordered mapping from field name to [`FieldSpec`],
//! built once per document type through [`SchemaBuilder`] and cached for the
//! lifetime of the process (schema shape does not change at runtime). Types
//! declare their layout explicitly; there is no runtime reflection:
//!
//! ```ignore
//! use std::sync::OnceLock;
//! use docbind_core::schema::{ElementKind, FieldSpec, Schema};
//! use docbind_core::field::FieldType;
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
//! ```
//!
//! Subtypes merge their ancestors' registries first (in declaration order)
//! via [`SchemaBuilder::inherit`], then append their own fields; a redeclared
//! name shadows the ancestor's descriptor while keeping its position in the
//! field order.

use indexmap::IndexMap;

use crate::{field::FieldType, model::Model};

/// What a single field contains.
#[derive(Debug, Clone, Copy)]
pub enum FieldSpec {
    /// A primitive value validated by a field descriptor.
    Primitive(FieldType),
    /// A nested document with its own schema.
    Embedded(&'static Schema),
    /// An ordered list of elements of one kind.
    List(ElementKind),
}

impl FieldSpec {
    /// Human-readable label for error messages.
    pub(crate) fn expected_label(&self) -> String {
        match self {
            FieldSpec::Primitive(kind) => kind.to_string(),
            FieldSpec::Embedded(schema) => schema.type_name().to_string(),
            FieldSpec::List(element) => format!("list of {}", element),
        }
    }
}

/// The element kind of an embedded list.
///
/// Recorded at registration time so list items can be reconstructed
/// generically when a stored document is rehydrated.
#[derive(Debug, Clone, Copy)]
pub enum ElementKind {
    /// Scalar elements of one primitive kind.
    Primitive(FieldType),
    /// Nested documents of one schema.
    Embedded(&'static Schema),
}

impl PartialEq for ElementKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ElementKind::Primitive(a), ElementKind::Primitive(b)) => a == b,
            (ElementKind::Embedded(a), ElementKind::Embedded(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementKind::Primitive(kind) => write!(f, "{}", kind),
            ElementKind::Embedded(schema) => f.write_str(schema.type_name()),
        }
    }
}

/// The registered field layout of one document type.
///
/// Immutable once built; intended to live behind a `OnceLock` static so the
/// registry is computed exactly once per type.
#[derive(Debug)]
pub struct Schema {
    type_name: &'static str,
    collection: &'static str,
    fields: IndexMap<&'static str, FieldSpec>,
    unique_on: Vec<&'static str>,
    post_save: Option<fn(&mut Model)>,
}

impl Schema {
    /// Starts building a schema for the named type, persisted in the named
    /// collection.
    pub fn builder(type_name: &'static str, collection: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            type_name,
            collection,
            fields: IndexMap::new(),
            unique_on: Vec::new(),
            post_save: None,
        }
    }

    /// Name of the document type this schema describes.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Name of the collection instances are persisted in.
    pub fn collection(&self) -> &'static str {
        self.collection
    }

    /// The fields in registration order (ancestors first).
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (*name, spec))
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks up a field's spec by name.
    pub fn get(&self, field: &str) -> Option<&FieldSpec> {
        self.fields.get(field)
    }

    /// The canonical key for a field name, if the field exists.
    pub(crate) fn key_of(&self, field: &str) -> Option<&'static str> {
        self.fields.get_key_value(field).map(|(key, _)| *key)
    }

    /// The fields forming this type's unique key, if any.
    pub fn unique_on(&self) -> &[&'static str] {
        &self.unique_on
    }

    pub(crate) fn post_save(&self) -> Option<fn(&mut Model)> {
        self.post_save
    }
}

/// Fluent builder for [`Schema`] registration.
#[derive(Debug)]
pub struct SchemaBuilder {
    type_name: &'static str,
    collection: &'static str,
    fields: IndexMap<&'static str, FieldSpec>,
    unique_on: Vec<&'static str>,
    post_save: Option<fn(&mut Model)>,
}

impl SchemaBuilder {
    /// Merges an ancestor schema's fields in.
    ///
    /// Call before declaring own fields so ancestors come first in field
    /// order; multiple ancestors merge in call order. Fields later
    /// redeclared by [`Self::field`] shadow the ancestor's descriptor but
    /// keep the ancestor's slot.
    pub fn inherit(mut self, ancestor: &Schema) -> Self {
        for (name, spec) in ancestor.fields() {
            self.fields.insert(name, *spec);
        }
        self
    }

    /// Declares (or overrides) a field.
    pub fn field(mut self, name: &'static str, spec: FieldSpec) -> Self {
        self.fields.insert(name, spec);
        self
    }

    /// Declares the fields forming the type's unique key.
    ///
    /// A model constructed with these fields populated transparently binds
    /// to the single existing record matching them.
    pub fn unique_on(mut self, fields: &[&'static str]) -> Self {
        self.unique_on = fields.to_vec();
        self
    }

    /// Installs a hook run after every successful save of an instance.
    pub fn post_save(mut self, hook: fn(&mut Model)) -> Self {
        self.post_save = Some(hook);
        self
    }

    /// Finalizes the registry.
    pub fn build(self) -> Schema {
        Schema {
            type_name: self.type_name,
            collection: self.collection,
            fields: self.fields,
            unique_on: self.unique_on,
            post_save: self.post_save,
        }
    }
}
