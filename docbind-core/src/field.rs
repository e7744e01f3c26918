//! Field descriptors and runtime values.
//!
//! Every primitive field kind the mapping layer understands is a variant of
//! [`FieldType`], a stateless validator/normalizer that knows how to check a
//! candidate value, serialize it to its storage form, and parse a stored
//! value back. The round-trip law holds for every kind: deserializing a
//! serialized valid value yields the value back, and serialization rejects
//! anything failing [`FieldType::is_valid`].
//!
//! Runtime values live in the closed [`Value`] union, which also carries the
//! two structural variants ([`Value::Model`] for embedded documents and
//! [`Value::List`] for embedded ordered lists) so a model's value map can
//! hold its whole subtree.

use bson::{Bson, doc, oid::ObjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ModelError, ModelResult},
    list::ModelList,
    model::Model,
};

/// The closed set of primitive field kinds.
///
/// Each kind is a stateless descriptor: validation, serialization, and
/// parsing are all dispatched by matching on the variant. Embedded documents
/// and lists are not kinds; they are structural field specs handled by the
/// schema layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Whole numbers, stored as 64-bit integers.
    Integer,
    /// Decimal numbers, downcast to the store's floating representation.
    Decimal,
    /// Character sequences.
    Text,
    /// Booleans.
    Boolean,
    /// Timestamps, stored at the store's millisecond resolution.
    DateTime,
    /// The store's native opaque identifier. Never generated by this layer.
    Id,
    /// UUIDs, stored as canonical 32-digit hex text.
    Uuid,
    /// A reference to an entity living outside the document store.
    Reference,
    /// An opaque storage value passed through unchanged.
    Object,
}

impl FieldType {
    /// Structural type check: does `value` carry this kind?
    ///
    /// [`Value::Unset`] is never valid; callers decide separately whether an
    /// unset field is acceptable (extraction simply skips unset fields).
    pub fn is_valid(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldType::Integer, Value::Integer(_))
                | (FieldType::Decimal, Value::Decimal(_))
                | (FieldType::Text, Value::Text(_))
                | (FieldType::Boolean, Value::Boolean(_))
                | (FieldType::DateTime, Value::DateTime(_))
                | (FieldType::Id, Value::Id(_))
                | (FieldType::Uuid, Value::Uuid(_))
                | (FieldType::Reference, Value::Reference(_))
                | (FieldType::Object, Value::Object(_))
        )
    }

    /// Normalizes a valid value into its storage form.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidValue`] if `value` fails [`Self::is_valid`].
    pub fn serialize(&self, field: &str, value: &Value) -> ModelResult<Bson> {
        if !self.is_valid(value) {
            return Err(self.invalid(field, value));
        }

        Ok(match (self, value) {
            (FieldType::Integer, Value::Integer(n)) => Bson::Int64(*n),
            (FieldType::Decimal, Value::Decimal(d)) => Bson::Double(*d),
            (FieldType::Text, Value::Text(s)) => Bson::String(s.clone()),
            (FieldType::Boolean, Value::Boolean(b)) => Bson::Boolean(*b),
            (FieldType::DateTime, Value::DateTime(ts)) => {
                Bson::DateTime(bson::DateTime::from_chrono(*ts))
            }
            (FieldType::Id, Value::Id(id)) => Bson::ObjectId(*id),
            (FieldType::Uuid, Value::Uuid(uuid)) => Bson::String(uuid.simple().to_string()),
            (FieldType::Reference, Value::Reference(reference)) => Bson::Document(doc! {
                "id": reference.id,
                "namespace": reference.namespace.clone(),
                "type_name": reference.type_name.clone(),
            }),
            (FieldType::Object, Value::Object(raw)) => raw.clone(),
            _ => unreachable!("validity checked above"),
        })
    }

    /// Like [`Self::serialize`], but maps [`Value::Unset`] to `Bson::Null`.
    ///
    /// Used by the diffing paths, where an unset side of a comparison still
    /// needs a storage representation.
    pub(crate) fn serialize_nullable(&self, field: &str, value: &Value) -> ModelResult<Bson> {
        match value {
            Value::Unset => Ok(Bson::Null),
            _ => self.serialize(field, value),
        }
    }

    /// Parses a stored value back into its runtime form.
    ///
    /// Accepts the widenings the store hands out in practice: 32-bit
    /// integers for integer and decimal kinds, hex text for identifiers,
    /// hyphenated text for UUIDs.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidValue`] if the stored shape does not
    /// match this kind.
    pub fn deserialize(&self, field: &str, stored: &Bson) -> ModelResult<Value> {
        match (self, stored) {
            (FieldType::Integer, Bson::Int32(n)) => Ok(Value::Integer(*n as i64)),
            (FieldType::Integer, Bson::Int64(n)) => Ok(Value::Integer(*n)),
            (FieldType::Decimal, Bson::Double(d)) => Ok(Value::Decimal(*d)),
            (FieldType::Decimal, Bson::Int32(n)) => Ok(Value::Decimal(*n as f64)),
            (FieldType::Decimal, Bson::Int64(n)) => Ok(Value::Decimal(*n as f64)),
            (FieldType::Text, Bson::String(s)) => Ok(Value::Text(s.clone())),
            (FieldType::Boolean, Bson::Boolean(b)) => Ok(Value::Boolean(*b)),
            (FieldType::DateTime, Bson::DateTime(ts)) => Ok(Value::DateTime(ts.to_chrono())),
            (FieldType::Id, Bson::ObjectId(id)) => Ok(Value::Id(*id)),
            (FieldType::Id, Bson::String(s)) => ObjectId::parse_str(s)
                .map(Value::Id)
                .map_err(|_| self.invalid_stored(field, stored)),
            (FieldType::Uuid, Bson::String(s)) => Uuid::parse_str(s)
                .map(Value::Uuid)
                .map_err(|_| self.invalid_stored(field, stored)),
            (FieldType::Reference, Bson::Document(doc)) => {
                let id = match doc.get("id") {
                    Some(Bson::Int32(n)) => *n as i64,
                    Some(Bson::Int64(n)) => *n,
                    _ => return Err(self.invalid_stored(field, stored)),
                };
                let namespace = doc
                    .get_str("namespace")
                    .map_err(|_| self.invalid_stored(field, stored))?;
                let type_name = doc
                    .get_str("type_name")
                    .map_err(|_| self.invalid_stored(field, stored))?;

                Ok(Value::Reference(EntityRef {
                    id,
                    namespace: namespace.to_string(),
                    type_name: type_name.to_string(),
                }))
            }
            (FieldType::Object, raw) => Ok(Value::Object(raw.clone())),
            _ => Err(self.invalid_stored(field, stored)),
        }
    }

    fn invalid(&self, field: &str, value: &Value) -> ModelError {
        ModelError::InvalidValue {
            field: field.to_string(),
            value: format!("{:?}", value),
            expected: self.to_string(),
        }
    }

    fn invalid_stored(&self, field: &str, stored: &Bson) -> ModelError {
        ModelError::InvalidValue {
            field: field.to_string(),
            value: format!("{:?}", stored),
            expected: self.to_string(),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FieldType::Integer => "integer",
            FieldType::Decimal => "decimal",
            FieldType::Text => "text",
            FieldType::Boolean => "boolean",
            FieldType::DateTime => "datetime",
            FieldType::Id => "id",
            FieldType::Uuid => "uuid",
            FieldType::Reference => "reference",
            FieldType::Object => "object",
        })
    }
}

/// A runtime field value.
///
/// Every field of a model holds exactly one of these; absent fields are an
/// explicit [`Value::Unset`], never a missing map entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value assigned.
    Unset,
    Integer(i64),
    Decimal(f64),
    Text(String),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Id(ObjectId),
    Uuid(Uuid),
    Reference(EntityRef),
    /// An opaque storage value, including raw structured data supplied for
    /// coercion into an embedded model or list.
    Object(Bson),
    /// An embedded document.
    Model(Model),
    /// An embedded ordered list.
    List(ModelList),
}

impl Value {
    /// Convenience constructor for text values.
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    /// Whether this value is [`Value::Unset`].
    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }

    /// The primitive kind this value carries, if it is a primitive.
    pub fn kind(&self) -> Option<FieldType> {
        match self {
            Value::Integer(_) => Some(FieldType::Integer),
            Value::Decimal(_) => Some(FieldType::Decimal),
            Value::Text(_) => Some(FieldType::Text),
            Value::Boolean(_) => Some(FieldType::Boolean),
            Value::DateTime(_) => Some(FieldType::DateTime),
            Value::Id(_) => Some(FieldType::Id),
            Value::Uuid(_) => Some(FieldType::Uuid),
            Value::Reference(_) => Some(FieldType::Reference),
            Value::Object(_) => Some(FieldType::Object),
            Value::Unset | Value::Model(_) | Value::List(_) => None,
        }
    }

    /// Short label for error messages.
    pub(crate) fn type_label(&self) -> String {
        match self {
            Value::Unset => "unset".to_string(),
            Value::Model(model) => model.type_name().to_string(),
            Value::List(_) => "list".to_string(),
            other => other
                .kind()
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Value::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_model_mut(&mut self) -> Option<&mut Model> {
        match self {
            Value::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ModelList> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut ModelList> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Decimal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Value::Id(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Uuid(value)
    }
}

impl From<EntityRef> for Value {
    fn from(value: EntityRef) -> Self {
        Value::Reference(value)
    }
}

impl From<Model> for Value {
    fn from(value: Model) -> Self {
        Value::Model(value)
    }
}

impl From<ModelList> for Value {
    fn from(value: ModelList) -> Self {
        Value::List(value)
    }
}

/// A pointer to an entity living outside the document store.
///
/// Stored as the `{id, namespace, type_name}` sub-document; resolution back
/// to the live entity goes through a [`ReferenceResolver`] supplied by the
/// integration, never a global lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Primary key of the entity in its home system.
    pub id: i64,
    /// Namespace (application/module) the entity type lives in.
    pub namespace: String,
    /// Name of the entity type within its namespace.
    pub type_name: String,
}

impl EntityRef {
    pub fn new(id: i64, namespace: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id,
            namespace: namespace.into(),
            type_name: type_name.into(),
        }
    }

    /// Resolves this reference through the given resolver collaborator.
    pub fn resolve<R: ReferenceResolver>(&self, resolver: &R) -> ModelResult<R::Entity> {
        resolver.resolve(self)
    }
}

/// Collaborator that maps [`EntityRef`]s to live external entities and back.
///
/// Implemented by the integration owning the external model; injected
/// wherever reference fields need resolution.
pub trait ReferenceResolver {
    /// The external entity type this resolver produces.
    type Entity;

    /// Looks up the entity a reference points at.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`](crate::error::ModelError) if the entity
    /// cannot be found or the lookup fails.
    fn resolve(&self, reference: &EntityRef) -> ModelResult<Self::Entity>;

    /// Produces the reference describing an entity.
    fn describe(&self, entity: &Self::Entity) -> EntityRef;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn roundtrip(kind: FieldType, value: Value) {
        let stored = kind.serialize("f", &value).unwrap();
        assert_eq!(kind.deserialize("f", &stored).unwrap(), value);
    }

    #[test]
    fn primitives_round_trip() {
        roundtrip(FieldType::Integer, Value::Integer(134));
        roundtrip(FieldType::Decimal, Value::Decimal(2.5));
        roundtrip(FieldType::Text, Value::text("something"));
        roundtrip(FieldType::Boolean, Value::Boolean(true));
        roundtrip(FieldType::Id, Value::Id(ObjectId::new()));
        roundtrip(FieldType::Uuid, Value::Uuid(Uuid::new_v4()));
        roundtrip(
            FieldType::Reference,
            Value::Reference(EntityRef::new(7, "auth", "User")),
        );
        roundtrip(
            FieldType::Object,
            Value::Object(Bson::Array(vec![Bson::Int64(1), Bson::String("x".into())])),
        );
    }

    #[test]
    fn datetime_round_trips_at_millisecond_precision() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 17, 12, 30, 45).unwrap();
        roundtrip(FieldType::DateTime, Value::DateTime(ts));
    }

    #[test]
    fn serialize_rejects_wrong_kind() {
        let err = FieldType::Integer
            .serialize("value", &Value::text("something"))
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::InvalidValue { field, .. } if field == "value"
        ));

        assert!(FieldType::Text.serialize("name", &Value::Integer(134)).is_err());
        assert!(FieldType::Boolean.serialize("flag", &Value::Unset).is_err());
    }

    #[test]
    fn uuid_serializes_as_bare_hex() {
        let uuid = Uuid::new_v4();
        let stored = FieldType::Uuid.serialize("u", &Value::Uuid(uuid)).unwrap();
        assert_eq!(stored, Bson::String(uuid.simple().to_string()));

        // Hyphenated text is still accepted when reading back.
        let hyphenated = Bson::String(uuid.hyphenated().to_string());
        assert_eq!(
            FieldType::Uuid.deserialize("u", &hyphenated).unwrap(),
            Value::Uuid(uuid)
        );
    }

    #[test]
    fn id_accepts_hex_text_from_the_store() {
        let id = ObjectId::new();
        let stored = Bson::String(id.to_hex());
        assert_eq!(FieldType::Id.deserialize("_id", &stored).unwrap(), Value::Id(id));
        assert!(FieldType::Id.deserialize("_id", &Bson::String("nope".into())).is_err());
    }

    #[test]
    fn reference_round_trips_through_sub_document() {
        let reference = EntityRef::new(42, "billing", "Invoice");
        let stored = FieldType::Reference
            .serialize("invoice", &Value::Reference(reference.clone()))
            .unwrap();

        let doc = stored.as_document().unwrap();
        assert_eq!(doc.get_i64("id").unwrap(), 42);
        assert_eq!(doc.get_str("namespace").unwrap(), "billing");
        assert_eq!(doc.get_str("type_name").unwrap(), "Invoice");

        assert_eq!(
            FieldType::Reference.deserialize("invoice", &stored).unwrap(),
            Value::Reference(reference)
        );
    }

    #[test]
    fn integer_widens_from_int32() {
        assert_eq!(
            FieldType::Integer.deserialize("n", &Bson::Int32(7)).unwrap(),
            Value::Integer(7)
        );
    }
}
