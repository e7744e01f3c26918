//! Flat-filter evaluation for in-memory record matching.
//!
//! Filters produced by the model layer are flat mappings of (possibly
//! dotted) field paths to storage values. Matching descends the dotted path
//! into the stored record and compares with numeric types normalized, so a
//! filter built from an `Int64` still matches a record holding an `Int32`.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

/// Type-erased, comparable representation of BSON values.
///
/// Wraps BSON values for filter comparison, normalizing all numeric types
/// to f64 so integer width does not affect equality.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// DateTime value
    DateTime(DateTime),
    /// Opaque store identifier
    ObjectId(ObjectId),
    /// String value
    String(&'a str),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => {
                a.partial_cmp(b) == Some(Ordering::Equal)
            }
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

pub(crate) struct FilterMatcher;

impl FilterMatcher {
    /// Whether `record` satisfies every entry of `filter`.
    ///
    /// An empty filter matches everything. A path missing from the record
    /// never matches.
    pub fn matches(record: &Document, filter: &Document) -> bool {
        filter.iter().all(|(path, expected)| {
            Self::lookup(record, path)
                .map(|found| Comparable::from(found) == Comparable::from(expected))
                .unwrap_or(false)
        })
    }

    /// Descends a dotted path through nested documents.
    fn lookup<'a>(record: &'a Document, path: &str) -> Option<&'a Bson> {
        let mut segments = path.split('.');
        let mut current = record.get(segments.next()?)?;

        for segment in segments {
            current = current.as_document()?.get(segment)?;
        }

        Some(current)
    }
}
