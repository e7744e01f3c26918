//! The model type: a live instance of a registered schema.
//!
//! A [`Model`] holds the current value of every schema field, an
//! original-value snapshot (the baseline), and an optional identity issued
//! by the store. Everything the mapping layer does runs through it:
//! validation, recursive diffing against the baseline, serialization to and
//! from stored records, and the persistence operations that talk to a
//! [`StoreBackend`].
//!
//! The baseline is replaced by the current values at exactly two points,
//! after a successful save and after a successful load, so
//! [`Model::dirty_fields`] always answers "what changed since this instance
//! last agreed with the store".

use bson::{Bson, Document, doc, oid::ObjectId};
use indexmap::IndexMap;

use crate::{
    backend::StoreBackend,
    error::{ModelError, ModelResult},
    field::Value,
    list::ModelList,
    schema::{FieldSpec, Schema},
};

/// A document instance bound to a registered [`Schema`].
#[derive(Debug, Clone)]
pub struct Model {
    schema: &'static Schema,
    values: IndexMap<&'static str, Value>,
    original: IndexMap<&'static str, Value>,
    identity: Option<ObjectId>,
}

impl Model {
    /// Creates an empty instance: every primitive field unset, every
    /// embedded field a fresh empty sub-model, every list field an empty
    /// list of its declared element kind.
    pub fn new(schema: &'static Schema) -> Self {
        let mut values = IndexMap::with_capacity(schema.len());
        for (name, spec) in schema.fields() {
            values.insert(name, Self::default_value(spec));
        }
        let original = values.clone();

        Self {
            schema,
            values,
            original,
            identity: None,
        }
    }

    /// Creates an instance populated from initial values, offline.
    ///
    /// Embedded fields accept either a ready instance of the right schema or
    /// raw structured data (`Value::Object` holding a document/array), which
    /// is loaded into a fresh sub-model or list. Primitive values are stored
    /// as given; structural validation happens at extraction (the save-time
    /// gate), at load, or through the explicit [`Self::set`].
    ///
    /// Names outside the schema are ignored. The baseline snapshot is taken
    /// after all fields are assigned.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidValue`] or [`ModelError::TypeMismatch`]
    /// if an embedded or list value cannot be coerced.
    pub fn with_values<I, K>(schema: &'static Schema, initial: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut supplied: IndexMap<&'static str, Value> = IndexMap::new();
        for (name, value) in initial {
            if let Some(key) = schema.key_of(name.as_ref()) {
                supplied.insert(key, value);
            }
        }

        let mut model = Self::new(schema);
        for (name, spec) in schema.fields() {
            if let Some(value) = supplied.shift_remove(name) {
                model.assign(name, *spec, value)?;
            }
        }
        model.original = model.values.clone();

        Ok(model)
    }

    /// Creates an instance honoring the type's `unique_on` declaration.
    ///
    /// After populating from `initial`, the unique-key fields are turned
    /// into a lookup; a single existing match is absorbed as the baseline
    /// (values and identity), so the instance transparently binds to the
    /// record it uniquely describes.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::AmbiguousMatch`] if the unique key matches more
    /// than one stored record, plus any coercion or backend error.
    pub async fn create<I, K>(
        schema: &'static Schema,
        store: &dyn StoreBackend,
        initial: I,
    ) -> ModelResult<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut model = Self::with_values(schema, initial)?;

        if !schema.unique_on().is_empty() {
            let query = model.build_query(schema.unique_on(), false)?;
            if !query.is_empty() {
                model.bind(store, query).await?;
            }
        }

        Ok(model)
    }

    /// The schema this instance is bound to.
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Name of the document type.
    pub fn type_name(&self) -> &'static str {
        self.schema.type_name()
    }

    /// The store-issued identity, if this instance has completed a
    /// persistence round-trip (create or load).
    pub fn identity(&self) -> Option<ObjectId> {
        self.identity
    }

    /// The current value of a field, or `None` for a name outside the schema.
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Mutable access to a field's current value.
    pub fn value_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.values.get_mut(field)
    }

    /// The current values in schema order.
    pub fn values(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    /// Validating field assignment.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownField`] for a name outside the schema
    /// and [`ModelError::InvalidValue`] for a value failing the field's type
    /// contract (`Value::Unset` is always accepted and clears the field).
    pub fn set(&mut self, field: &str, value: Value) -> ModelResult<()> {
        let Some(key) = self.schema.key_of(field) else {
            return Err(ModelError::UnknownField(
                field.to_string(),
                self.type_name().to_string(),
            ));
        };
        let spec = *self.schema.get(key).expect("key_of guarantees presence");

        if let FieldSpec::Primitive(kind) = spec {
            if !value.is_unset() && !kind.is_valid(&value) {
                return Err(ModelError::InvalidValue {
                    field: field.to_string(),
                    value: format!("{:?}", value),
                    expected: kind.to_string(),
                });
            }
        }

        self.assign(key, spec, value)
    }

    /// Produces the storage-ready projection of this instance, recursively.
    ///
    /// Unset fields are omitted; embedded documents are omitted entirely
    /// when their own extraction is empty; list elements serialize through
    /// their element descriptor. This is the save-time validation gate.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidValue`] if any field's current value
    /// fails its descriptor's validity check.
    pub fn extract_values(&self) -> ModelResult<Document> {
        let schema = self.schema;
        let mut values = Document::new();

        for (name, spec) in schema.fields() {
            let value = &self.values[name];
            if value.is_unset() {
                continue;
            }

            match spec {
                FieldSpec::Primitive(kind) => {
                    values.insert(name, kind.serialize(name, value)?);
                }
                FieldSpec::Embedded(sub_schema) => {
                    let model = value.as_model().ok_or_else(|| ModelError::InvalidValue {
                        field: name.to_string(),
                        value: format!("{:?}", value),
                        expected: sub_schema.type_name().to_string(),
                    })?;
                    let sub = model.extract_values()?;
                    if !sub.is_empty() {
                        values.insert(name, sub);
                    }
                }
                FieldSpec::List(_) => {
                    let list = value.as_list().ok_or_else(|| ModelError::InvalidValue {
                        field: name.to_string(),
                        value: format!("{:?}", value),
                        expected: spec.expected_label(),
                    })?;
                    values.insert(name, list.extract()?);
                }
            }
        }

        Ok(values)
    }

    /// Populates this instance from a stored record, the inverse of
    /// [`Self::extract_values`].
    ///
    /// Fields absent from `stored` are left untouched; embedded documents
    /// and lists are rebuilt fresh from the stored data. A stored `_id` is
    /// captured as the identity. When `set_baseline` is true the baseline is
    /// re-synced afterwards, recursively.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidValue`] if a stored value does not match
    /// its field's kind.
    pub fn load_values(&mut self, stored: &Document, set_baseline: bool) -> ModelResult<()> {
        let schema = self.schema;

        for (name, spec) in schema.fields() {
            let Some(stored_value) = stored.get(name) else {
                continue;
            };

            match spec {
                FieldSpec::Primitive(kind) => {
                    let value = kind.deserialize(name, stored_value)?;
                    self.values.insert(name, value);
                }
                FieldSpec::Embedded(sub_schema) => {
                    let doc = stored_value
                        .as_document()
                        .ok_or_else(|| ModelError::InvalidValue {
                            field: name.to_string(),
                            value: format!("{:?}", stored_value),
                            expected: sub_schema.type_name().to_string(),
                        })?;
                    let mut sub = Model::new(sub_schema);
                    sub.load_values(doc, set_baseline)?;
                    self.values.insert(name, Value::Model(sub));
                }
                FieldSpec::List(element) => {
                    let array = stored_value
                        .as_array()
                        .ok_or_else(|| ModelError::InvalidValue {
                            field: name.to_string(),
                            value: format!("{:?}", stored_value),
                            expected: spec.expected_label(),
                        })?;
                    let mut list = ModelList::new(*element);
                    list.load_values(array, set_baseline)?;
                    self.values.insert(name, Value::List(list));
                }
            }
        }

        if let Ok(id) = stored.get_object_id("_id") {
            self.identity = Some(id);
        }
        if set_baseline {
            self.original = self.values.clone();
        }

        Ok(())
    }

    /// Computes the recursive diff between current values and the baseline.
    ///
    /// Primitive fields compare by their serialized storage forms and report
    /// the original value; when both forms are structured mappings (the
    /// reference kind), only the differing sub-keys are reported. Embedded
    /// documents report their own non-empty sub-diff, or the entire original
    /// sub-document when the current value was cleared. List fields report
    /// their position-keyed structural diff.
    ///
    /// # Errors
    ///
    /// Propagates validation errors from serializing the compared values.
    pub fn dirty_fields(&self) -> ModelResult<Document> {
        let schema = self.schema;
        let mut dirty = Document::new();

        for (name, spec) in schema.fields() {
            let current = &self.values[name];
            let original = &self.original[name];

            match spec {
                FieldSpec::Primitive(kind) => {
                    let current_repr = kind.serialize_nullable(name, current)?;
                    let original_repr = kind.serialize_nullable(name, original)?;
                    if current_repr == original_repr {
                        continue;
                    }

                    match (&current_repr, &original_repr) {
                        (Bson::Document(current_doc), Bson::Document(original_doc)) => {
                            let mut sub = Document::new();
                            for (key, original_value) in original_doc {
                                if current_doc.get(key) != Some(original_value) {
                                    sub.insert(key.as_str(), original_value.clone());
                                }
                            }
                            for (key, _) in current_doc {
                                if original_doc.get(key).is_none() {
                                    sub.insert(key.as_str(), Bson::Null);
                                }
                            }
                            dirty.insert(name, sub);
                        }
                        _ => {
                            dirty.insert(name, original_repr);
                        }
                    }
                }
                FieldSpec::Embedded(_) => match current {
                    Value::Model(model) => {
                        let sub = model.dirty_fields()?;
                        if !sub.is_empty() {
                            dirty.insert(name, sub);
                        }
                    }
                    _ => {
                        if let Value::Model(original_model) = original {
                            let original_doc = original_model.extract_values()?;
                            if !original_doc.is_empty() {
                                dirty.insert(name, original_doc);
                            }
                        }
                    }
                },
                FieldSpec::List(_) => match current {
                    Value::List(list) => {
                        let changes = list.diff()?;
                        if !changes.is_empty() {
                            let mut positions = Document::new();
                            for (position, value) in changes {
                                positions.insert(position.to_string(), value);
                            }
                            dirty.insert(name, positions);
                        }
                    }
                    _ => {
                        // Cleared list: every snapshot position is a removal.
                        if let Value::List(original_list) = original {
                            if !original_list.is_empty() {
                                let mut positions = Document::new();
                                for (position, item) in
                                    original_list.extract()?.into_iter().enumerate()
                                {
                                    positions.insert(position.to_string(), item);
                                }
                                dirty.insert(name, positions);
                            }
                        }
                    }
                },
            }
        }

        Ok(dirty)
    }

    /// Whether anything changed since the last baseline reset.
    pub fn is_dirty(&self) -> ModelResult<bool> {
        Ok(!self.dirty_fields()?.is_empty())
    }

    /// Constructs a flat filter mapping from the selected fields (or every
    /// schema field when `all_fields` is set).
    ///
    /// Unset fields contribute nothing. A primitive whose serialized form is
    /// structured contributes one dotted `field.subkey` entry per sub-key;
    /// embedded documents recurse and contribute dotted entries for their
    /// populated sub-fields; lists are never filter keys and are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownField`] for a selected name outside the
    /// schema, or [`ModelError::InvalidValue`] from serialization.
    pub fn build_query(&self, fields: &[&str], all_fields: bool) -> ModelResult<Document> {
        let schema = self.schema;
        let selected: Vec<&'static str> = if all_fields {
            schema.fields().map(|(name, _)| name).collect()
        } else {
            fields
                .iter()
                .map(|field| {
                    schema.key_of(field).ok_or_else(|| {
                        ModelError::UnknownField(field.to_string(), self.type_name().to_string())
                    })
                })
                .collect::<ModelResult<_>>()?
        };

        let mut query = Document::new();
        for name in selected {
            let spec = *schema.get(name).expect("selected from schema");
            let value = &self.values[name];
            if value.is_unset() {
                continue;
            }

            match spec {
                FieldSpec::Primitive(kind) => match kind.serialize(name, value)? {
                    Bson::Document(doc) => {
                        for (key, sub_value) in doc {
                            query.insert(format!("{}.{}", name, key), sub_value);
                        }
                    }
                    other => {
                        query.insert(name, other);
                    }
                },
                FieldSpec::Embedded(_) => {
                    if let Value::Model(model) = value {
                        for (key, sub_value) in model.build_query(&[], true)? {
                            query.insert(format!("{}.{}", name, key), sub_value);
                        }
                    }
                }
                FieldSpec::List(_) => {}
            }
        }

        Ok(query)
    }

    /// Re-syncs the baseline to the current values, recursively, including
    /// embedded models and list items and snapshots.
    pub fn reset_baseline(&mut self) {
        for value in self.values.values_mut() {
            match value {
                Value::Model(model) => model.reset_baseline(),
                Value::List(list) => list.reset(),
                _ => {}
            }
        }
        self.original = self.values.clone();
    }

    /// The JSON projection of [`Self::extract_values`].
    ///
    /// # Errors
    ///
    /// Propagates extraction and serialization errors.
    pub fn to_json(&self) -> ModelResult<serde_json::Value> {
        Ok(serde_json::to_value(self.extract_values()?)?)
    }

    /// Persists this instance.
    ///
    /// A no-op when the instance is clean and already has an identity, or
    /// when there is nothing to persist yet (empty projection, no identity).
    /// Otherwise the full current projection is written (insert when no
    /// identity exists, replace by identity otherwise), the returned
    /// identity is captured, and the baseline is reset. The type's post-save
    /// hook, if any, runs after a successful write.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidValue`] if validation fails, or a
    /// backend error from the write. State is untouched on failure.
    pub async fn save(&mut self, store: &dyn StoreBackend) -> ModelResult<()> {
        if self.identity.is_some() && self.dirty_fields()?.is_empty() {
            return Ok(());
        }

        let mut values = self.extract_values()?;
        if values.is_empty() && self.identity.is_none() {
            return Ok(());
        }
        if let Some(id) = self.identity {
            values.insert("_id", id);
        }

        let identity = store
            .save(values, self.schema.collection())
            .await?;
        log::debug!("saved {} {}", self.type_name(), identity);

        self.identity = Some(identity);
        self.reset_baseline();

        if let Some(hook) = self.schema.post_save() {
            hook(self);
        }

        Ok(())
    }

    /// Loads the single record matching `query` into this instance, with a
    /// baseline reset. Returns whether a record was found; the instance is
    /// left unchanged when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::AmbiguousMatch`] when more than one record
    /// matches: a broken uniqueness assumption is never resolved by
    /// picking one.
    pub async fn bind(&mut self, store: &dyn StoreBackend, query: Document) -> ModelResult<bool> {
        let results = store
            .find(query.clone(), self.schema.collection())
            .await?;

        match results.len() {
            0 => Ok(false),
            1 => {
                self.load_values(&results[0], true)?;
                Ok(true)
            }
            _ => Err(ModelError::AmbiguousMatch(query.to_string())),
        }
    }

    /// Looks up the single record matching `query` as a new instance.
    ///
    /// Returns `None` when nothing matches, an expected outcome rather than
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::AmbiguousMatch`] when more than one record
    /// matches.
    pub async fn get(
        schema: &'static Schema,
        store: &dyn StoreBackend,
        query: Document,
    ) -> ModelResult<Option<Model>> {
        let results = store
            .find(query.clone(), schema.collection())
            .await?;

        match results.len() {
            0 => Ok(None),
            1 => {
                let mut model = Model::new(schema);
                model.load_values(&results[0], true)?;
                Ok(Some(model))
            }
            _ => Err(ModelError::AmbiguousMatch(query.to_string())),
        }
    }

    /// Returns every record matching `query` as fully loaded instances, in
    /// store order. An empty vector is the explicit no-results outcome.
    pub async fn find(
        schema: &'static Schema,
        store: &dyn StoreBackend,
        query: Document,
    ) -> ModelResult<Vec<Model>> {
        store
            .find(query, schema.collection())
            .await?
            .iter()
            .map(|record| {
                let mut model = Model::new(schema);
                model.load_values(record, true)?;
                Ok(model)
            })
            .collect()
    }

    /// Deletes the stored record by this instance's identity and clears the
    /// identity. A no-op for an instance that was never persisted.
    pub async fn remove(&mut self, store: &dyn StoreBackend) -> ModelResult<()> {
        if let Some(id) = self.identity.take() {
            store
                .remove(doc! { "_id": id }, false, self.schema.collection())
                .await?;
            log::debug!("removed {} {}", self.type_name(), id);
        }

        Ok(())
    }

    /// Deletes every stored record matching `query`. Returns the count.
    pub async fn delete(
        schema: &'static Schema,
        store: &dyn StoreBackend,
        query: Document,
    ) -> ModelResult<u64> {
        store
            .remove(query, true, schema.collection())
            .await
    }

    /// Deletes at most one stored record matching `query`. Returns the count.
    pub async fn delete_one(
        schema: &'static Schema,
        store: &dyn StoreBackend,
        query: Document,
    ) -> ModelResult<u64> {
        store
            .remove(query, false, schema.collection())
            .await
    }

    /// Produces a new, identity-less instance copying all current field
    /// values, with `overrides` applied on top: a variant record that will
    /// be persisted as a brand-new entity on its next save.
    ///
    /// # Errors
    ///
    /// Propagates coercion errors from applying the overrides.
    pub fn clone_with<I, K>(&self, overrides: I) -> ModelResult<Model>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut initial: IndexMap<&'static str, Value> = self
            .values
            .iter()
            .map(|(name, value)| (*name, value.clone()))
            .collect();
        for (name, value) in overrides {
            if let Some(key) = self.schema.key_of(name.as_ref()) {
                initial.insert(key, value);
            }
        }

        Self::with_values(self.schema, initial)
    }

    fn default_value(spec: &FieldSpec) -> Value {
        match spec {
            FieldSpec::Primitive(_) => Value::Unset,
            FieldSpec::Embedded(sub_schema) => Value::Model(Model::new(sub_schema)),
            FieldSpec::List(element) => Value::List(ModelList::new(*element)),
        }
    }

    /// Coercing assignment shared by construction, overrides, and `set`.
    fn assign(&mut self, name: &'static str, spec: FieldSpec, value: Value) -> ModelResult<()> {
        let coerced = match (spec, value) {
            (FieldSpec::Embedded(sub_schema), Value::Model(model)) => {
                if !std::ptr::eq(sub_schema, model.schema) {
                    return Err(ModelError::InvalidValue {
                        field: name.to_string(),
                        value: model.type_name().to_string(),
                        expected: sub_schema.type_name().to_string(),
                    });
                }
                Value::Model(model)
            }
            (FieldSpec::Embedded(sub_schema), Value::Object(Bson::Document(doc))) => {
                let mut sub = Model::new(sub_schema);
                sub.load_values(&doc, false)?;
                Value::Model(sub)
            }
            (FieldSpec::Embedded(_), Value::Unset) => Value::Unset,
            (FieldSpec::Embedded(sub_schema), other) => {
                return Err(ModelError::InvalidValue {
                    field: name.to_string(),
                    value: format!("{:?}", other),
                    expected: sub_schema.type_name().to_string(),
                });
            }
            (FieldSpec::List(element), Value::List(list)) => {
                if list.element() != element {
                    return Err(ModelError::TypeMismatch {
                        expected: element.to_string(),
                        actual: list.element().to_string(),
                    });
                }
                Value::List(list)
            }
            (FieldSpec::List(element), Value::Object(Bson::Array(stored))) => {
                let mut list = ModelList::new(element);
                list.load_values(&stored, false)?;
                Value::List(list)
            }
            (FieldSpec::List(_), Value::Unset) => Value::Unset,
            (FieldSpec::List(element), other) => {
                return Err(ModelError::TypeMismatch {
                    expected: format!("list of {}", element),
                    actual: other.type_label(),
                });
            }
            // Primitives are stored as given; the type contract is enforced
            // at extraction, load, and the explicit setter.
            (FieldSpec::Primitive(_), value) => value,
        };

        self.values.insert(name, coerced);

        Ok(())
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema)
            && self.identity == other.identity
            && self.values == other.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{EntityRef, FieldType};
    use crate::schema::ElementKind;
    use std::sync::OnceLock;

    fn item_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Item", "items")
                .field("name", FieldSpec::Primitive(FieldType::Text))
                .field("value", FieldSpec::Primitive(FieldType::Integer))
                .build()
        })
    }

    fn order_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder("Order", "orders")
                .field("label", FieldSpec::Primitive(FieldType::Text))
                .field("owner", FieldSpec::Primitive(FieldType::Reference))
                .field("item", FieldSpec::Embedded(item_schema()))
                .field(
                    "lines",
                    FieldSpec::List(ElementKind::Embedded(item_schema())),
                )
                .build()
        })
    }

    #[test]
    fn new_instance_has_defaults() {
        let model = Model::new(order_schema());
        assert!(model.identity().is_none());
        assert!(model.value("label").unwrap().is_unset());
        assert!(model.value("item").unwrap().as_model().is_some());
        assert!(model.value("lines").unwrap().as_list().unwrap().is_empty());
        assert!(!model.is_dirty().unwrap());
    }

    #[test]
    fn with_values_snapshots_after_assignment() {
        let model = Model::with_values(
            item_schema(),
            [("name", Value::text("something")), ("value", Value::from(134))],
        )
        .unwrap();

        assert_eq!(model.value("name").unwrap().as_str(), Some("something"));
        assert!(!model.is_dirty().unwrap());
    }

    #[test]
    fn set_validates_and_tracks() {
        let mut model = Model::with_values(item_schema(), [("name", Value::text("a"))]).unwrap();

        let err = model.set("value", Value::text("nope")).unwrap_err();
        assert!(matches!(err, ModelError::InvalidValue { .. }));

        let err = model.set("missing", Value::Integer(1)).unwrap_err();
        assert!(matches!(err, ModelError::UnknownField(..)));

        model.set("name", Value::text("b")).unwrap();
        let dirty = model.dirty_fields().unwrap();
        assert_eq!(dirty.get_str("name").unwrap(), "a");
    }

    #[test]
    fn mistyped_construction_fails_at_extraction() {
        // Construction itself succeeds; the save-time gate rejects.
        let model = Model::with_values(
            item_schema(),
            [("name", Value::from(134)), ("value", Value::text("something"))],
        )
        .unwrap();

        assert!(matches!(
            model.extract_values(),
            Err(ModelError::InvalidValue { .. })
        ));
    }

    #[test]
    fn extraction_omits_unset_and_empty_embedded() {
        let model = Model::with_values(order_schema(), [("label", Value::text("x"))]).unwrap();
        let values = model.extract_values().unwrap();

        assert_eq!(values.get_str("label").unwrap(), "x");
        assert!(values.get("item").is_none());
        assert_eq!(values.get_array("lines").unwrap().len(), 0);
    }

    #[test]
    fn load_then_dirty_is_empty() {
        let stored = doc! {
            "_id": ObjectId::new(),
            "label": "loaded",
            "item": { "name": "nested", "value": 7i64 },
            "lines": [{ "name": "l0", "value": 1i64 }],
        };

        let mut model = Model::new(order_schema());
        model.load_values(&stored, true).unwrap();

        assert!(model.identity().is_some());
        assert!(!model.is_dirty().unwrap());

        let item = model.value("item").unwrap().as_model().unwrap();
        assert_eq!(item.value("name").unwrap().as_str(), Some("nested"));
    }

    #[test]
    fn embedded_edit_surfaces_under_parent_field() {
        let stored = doc! { "item": { "name": "before", "value": 1i64 } };
        let mut model = Model::new(order_schema());
        model.load_values(&stored, true).unwrap();

        model
            .value_mut("item")
            .unwrap()
            .as_model_mut()
            .unwrap()
            .set("name", Value::text("after"))
            .unwrap();

        let dirty = model.dirty_fields().unwrap();
        let sub = dirty.get_document("item").unwrap();
        assert_eq!(sub.get_str("name").unwrap(), "before");
    }

    #[test]
    fn cleared_embedded_reports_whole_original() {
        let stored = doc! { "item": { "name": "gone", "value": 3i64 } };
        let mut model = Model::new(order_schema());
        model.load_values(&stored, true).unwrap();

        model.set("item", Value::Unset).unwrap();

        let dirty = model.dirty_fields().unwrap();
        let sub = dirty.get_document("item").unwrap();
        assert_eq!(sub.get_str("name").unwrap(), "gone");
        assert_eq!(sub.get_i64("value").unwrap(), 3);
    }

    #[test]
    fn reference_diff_reports_only_differing_subkeys() {
        let mut model = Model::with_values(
            order_schema(),
            [("owner", Value::from(EntityRef::new(1, "auth", "User")))],
        )
        .unwrap();

        model
            .set("owner", Value::from(EntityRef::new(2, "auth", "User")))
            .unwrap();

        let dirty = model.dirty_fields().unwrap();
        let sub = dirty.get_document("owner").unwrap();
        assert_eq!(sub.get_i64("id").unwrap(), 1);
        assert!(sub.get("namespace").is_none());
        assert!(sub.get("type_name").is_none());
    }

    #[test]
    fn build_query_flattens_nested_fields() {
        let model = Model::with_values(
            order_schema(),
            [
                ("label", Value::text("q")),
                ("owner", Value::from(EntityRef::new(5, "auth", "User"))),
                (
                    "item",
                    Value::Object(Bson::Document(doc! { "name": "n", "value": 2i64 })),
                ),
            ],
        )
        .unwrap();

        let query = model.build_query(&[], true).unwrap();
        assert_eq!(query.get_str("label").unwrap(), "q");
        assert_eq!(query.get_i64("owner.id").unwrap(), 5);
        assert_eq!(query.get_str("owner.namespace").unwrap(), "auth");
        assert_eq!(query.get_str("item.name").unwrap(), "n");
        assert_eq!(query.get_i64("item.value").unwrap(), 2);
        // Lists never contribute filter keys.
        assert!(query.keys().all(|key| !key.starts_with("lines")));
    }

    #[test]
    fn list_changes_surface_under_parent_field() {
        let stored = doc! {
            "lines": [
                { "name": "a", "value": 1i64 },
                { "name": "b", "value": 2i64 },
            ],
        };
        let mut model = Model::new(order_schema());
        model.load_values(&stored, true).unwrap();

        let lines = model.value_mut("lines").unwrap().as_list_mut().unwrap();
        lines.remove_at(0);

        let dirty = model.dirty_fields().unwrap();
        let positions = dirty.get_document("lines").unwrap();
        let removed = positions.get_document("0").unwrap();
        assert_eq!(removed.get_str("name").unwrap(), "a");
    }

    #[test]
    fn clone_with_copies_values_and_drops_identity() {
        let stored = doc! { "_id": ObjectId::new(), "name": "something", "value": 134i64 };
        let mut model = Model::new(item_schema());
        model.load_values(&stored, true).unwrap();

        let clone = model.clone_with([("name", Value::text("else"))]).unwrap();
        assert!(clone.identity().is_none());
        assert_eq!(clone.value("name").unwrap().as_str(), Some("else"));
        assert_eq!(clone.value("value").unwrap().as_i64(), Some(134));
        // The source instance is untouched.
        assert_eq!(model.value("name").unwrap().as_str(), Some("something"));
    }

    #[test]
    fn to_json_projects_extraction() {
        let model = Model::with_values(
            item_schema(),
            [("name", Value::text("j")), ("value", Value::from(1))],
        )
        .unwrap();

        let json = model.to_json().unwrap();
        assert_eq!(json["name"], serde_json::json!("j"));
        assert_eq!(json["value"], serde_json::json!(1));
    }
}
