//! Embedded ordered lists with structural change tracking.
//!
//! A [`ModelList`] is a typed, ordered collection of values (or nested
//! models) embedded inside a parent model. Besides value edits, it tracks
//! *structural* edits against the snapshot taken at the last baseline reset:
//! removed positions are remembered by their index in the snapshot, and
//! appends past the snapshot length are reported as new trailing positions.
//!
//! Element access is explicit indexing only ([`ModelList::get`] or the
//! `Index` impl).

use std::collections::{BTreeMap, BTreeSet};

use bson::Bson;

use crate::{
    error::{ModelError, ModelResult},
    field::Value,
    model::Model,
    schema::ElementKind,
};

/// A typed, ordered, change-tracked embedded collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelList {
    element: ElementKind,
    items: Vec<Value>,
    snapshot: Vec<Value>,
    deleted: BTreeSet<usize>,
}

impl ModelList {
    /// Creates an empty list of the given element kind.
    pub fn new(element: ElementKind) -> Self {
        Self {
            element,
            items: Vec::new(),
            snapshot: Vec::new(),
            deleted: BTreeSet::new(),
        }
    }

    /// The declared element kind.
    pub fn element(&self) -> ElementKind {
        self.element
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.items.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Appends an item to the current sequence.
    ///
    /// The snapshot is untouched; the new item shows up in [`Self::diff`]
    /// as a trailing position until the next baseline reset.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::TypeMismatch`] if the item does not carry the
    /// list's declared element kind.
    pub fn append(&mut self, item: Value) -> ModelResult<()> {
        if !self.accepts(&item) {
            return Err(ModelError::TypeMismatch {
                expected: self.element.to_string(),
                actual: item.type_label(),
            });
        }
        self.items.push(item);

        Ok(())
    }

    /// Removes and returns the item at `index` of the *current* sequence.
    ///
    /// The index is translated back to the corresponding snapshot position,
    /// accounting for positions already deleted, so the diff stays correct
    /// regardless of deletion order. Removing an item appended after the
    /// last reset never registers a deletion.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds, like `Vec::remove`.
    pub fn remove_at(&mut self, index: usize) -> Value {
        let removed = self.items.remove(index);

        let mut original = index;
        for &deleted in &self.deleted {
            if deleted <= original {
                original += 1;
            }
        }
        if original < self.snapshot.len() {
            self.deleted.insert(original);
        }

        removed
    }

    /// Computes the sparse, order-preserving description of every change
    /// since the last baseline reset.
    ///
    /// Keys are snapshot positions (with appended items keyed past the
    /// snapshot length). A deleted position maps to its full original value;
    /// a surviving nested model with changes maps to its own field diff; a
    /// changed scalar or appended item maps to its current value.
    ///
    /// # Errors
    ///
    /// Propagates validation errors from serializing the reported values.
    pub fn diff(&self) -> ModelResult<BTreeMap<usize, Bson>> {
        let mut changes = BTreeMap::new();
        let mut cursor = 0usize;

        for (position, snapshot_value) in self.snapshot.iter().enumerate() {
            if self.deleted.contains(&position) {
                changes.insert(position, self.full_value(position, snapshot_value)?);
                continue;
            }

            let current = &self.items[cursor];
            match current {
                Value::Model(model) if matches!(self.element, ElementKind::Embedded(_)) => {
                    let sub_diff = model.dirty_fields()?;
                    if !sub_diff.is_empty() {
                        changes.insert(position, Bson::Document(sub_diff));
                    } else if current != snapshot_value {
                        // Replaced by a clean instance: report it whole.
                        changes.insert(position, self.full_value(position, current)?);
                    }
                }
                _ => {
                    if current != snapshot_value {
                        changes.insert(position, self.full_value(position, current)?);
                    }
                }
            }
            cursor += 1;
        }

        let base = self.snapshot.len();
        for (offset, appended) in self.items[cursor..].iter().enumerate() {
            changes.insert(base + offset, self.full_value(base + offset, appended)?);
        }

        Ok(changes)
    }

    /// Re-baselines the list: the current sequence becomes the snapshot and
    /// the deletion bookkeeping is cleared. Nested models are re-baselined
    /// recursively first.
    pub fn reset(&mut self) {
        for item in &mut self.items {
            if let Value::Model(model) = item {
                model.reset_baseline();
            }
        }
        self.snapshot = self.items.clone();
        self.deleted.clear();
    }

    /// Serializes the current sequence for storage.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidValue`] if any element fails its
    /// descriptor's validity check.
    pub fn extract(&self) -> ModelResult<Vec<Bson>> {
        self.items
            .iter()
            .enumerate()
            .map(|(position, item)| self.full_value(position, item))
            .collect()
    }

    /// Seeds the list from a stored sequence, replacing nothing: callers
    /// start from a freshly constructed list.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidValue`] if a stored element does not
    /// match the declared element kind.
    pub fn load_values(&mut self, stored: &[Bson], set_baseline: bool) -> ModelResult<()> {
        for (position, stored_value) in stored.iter().enumerate() {
            let value = match self.element {
                ElementKind::Embedded(schema) => {
                    let doc = stored_value
                        .as_document()
                        .ok_or_else(|| ModelError::InvalidValue {
                            field: position.to_string(),
                            value: format!("{:?}", stored_value),
                            expected: schema.type_name().to_string(),
                        })?;
                    let mut model = Model::new(schema);
                    model.load_values(doc, set_baseline)?;
                    Value::Model(model)
                }
                ElementKind::Primitive(kind) => {
                    kind.deserialize(&position.to_string(), stored_value)?
                }
            };
            self.items.push(value);
        }

        if set_baseline {
            self.reset();
        }

        Ok(())
    }

    fn accepts(&self, item: &Value) -> bool {
        match (self.element, item) {
            (ElementKind::Embedded(schema), Value::Model(model)) => {
                std::ptr::eq(schema, model.schema())
            }
            (ElementKind::Primitive(kind), _) => item.kind() == Some(kind),
            _ => false,
        }
    }

    /// The storage form of one element, whole.
    fn full_value(&self, position: usize, value: &Value) -> ModelResult<Bson> {
        match (self.element, value) {
            (ElementKind::Embedded(_), Value::Model(model)) => {
                Ok(Bson::Document(model.extract_values()?))
            }
            (ElementKind::Primitive(kind), _) => {
                kind.serialize_nullable(&position.to_string(), value)
            }
            (ElementKind::Embedded(schema), other) => Err(ModelError::TypeMismatch {
                expected: schema.type_name().to_string(),
                actual: other.type_label(),
            }),
        }
    }
}

impl std::ops::Index<usize> for ModelList {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.items[index]
    }
}

impl<'a> IntoIterator for &'a ModelList {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    fn text_list(values: &[&str]) -> ModelList {
        let mut list = ModelList::new(ElementKind::Primitive(FieldType::Text));
        for value in values {
            list.append(Value::text(*value)).unwrap();
        }
        list.reset();
        list
    }

    #[test]
    fn append_rejects_wrong_element_kind() {
        let mut list = ModelList::new(ElementKind::Primitive(FieldType::Text));
        let err = list.append(Value::Integer(134)).unwrap_err();
        assert!(matches!(err, ModelError::TypeMismatch { .. }));
        assert!(list.is_empty());
    }

    #[test]
    fn remove_then_append_reports_sparse_positions() {
        let mut list = text_list(&["a", "b", "c"]);
        list.remove_at(1);
        list.append(Value::text("d")).unwrap();

        let diff = list.diff().unwrap();
        assert_eq!(diff.len(), 2);
        assert_eq!(diff.get(&1), Some(&Bson::String("b".into())));
        assert_eq!(diff.get(&3), Some(&Bson::String("d".into())));
    }

    #[test]
    fn deletion_order_does_not_corrupt_translation() {
        // Deleting the head twice must map to snapshot positions 0 then 1.
        let mut list = text_list(&["a", "b", "c"]);
        list.remove_at(0);
        list.remove_at(0);

        let diff = list.diff().unwrap();
        assert_eq!(diff.get(&0), Some(&Bson::String("a".into())));
        assert_eq!(diff.get(&1), Some(&Bson::String("b".into())));
        assert_eq!(diff.get(&2), None);

        // Interleaved order: delete c (current 2), then a (current 0), then
        // what is now index 0 (originally b).
        let mut list = text_list(&["a", "b", "c"]);
        list.remove_at(2);
        list.remove_at(0);
        list.remove_at(0);

        let diff = list.diff().unwrap();
        assert_eq!(diff.get(&0), Some(&Bson::String("a".into())));
        assert_eq!(diff.get(&1), Some(&Bson::String("b".into())));
        assert_eq!(diff.get(&2), Some(&Bson::String("c".into())));
    }

    #[test]
    fn removing_an_appended_item_is_not_a_deletion() {
        let mut list = text_list(&["a"]);
        list.append(Value::text("b")).unwrap();
        list.remove_at(1);

        assert!(list.diff().unwrap().is_empty());
    }

    #[test]
    fn scalar_edits_report_current_value() {
        let mut list = text_list(&["a", "b"]);
        *list.get_mut(1).unwrap() = Value::text("z");

        let diff = list.diff().unwrap();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.get(&1), Some(&Bson::String("z".into())));
    }

    #[test]
    fn reset_clears_all_bookkeeping() {
        let mut list = text_list(&["a", "b", "c"]);
        list.remove_at(1);
        list.append(Value::text("d")).unwrap();
        list.reset();

        assert!(list.diff().unwrap().is_empty());
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn load_values_seeds_and_baselines() {
        let stored = vec![Bson::String("x".into()), Bson::String("y".into())];
        let mut list = ModelList::new(ElementKind::Primitive(FieldType::Text));
        list.load_values(&stored, true).unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0], Value::text("x"));
        assert!(list.diff().unwrap().is_empty());
    }
}
