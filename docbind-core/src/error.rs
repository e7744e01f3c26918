//! Error and result types for model operations.
//!
//! This module provides the error taxonomy for the mapping layer. Use
//! [`ModelResult<T>`] as the return type for fallible operations.
//!
//! Note that "no matching record" is never an error here: lookup operations
//! return `Option` or an empty `Vec` and callers handle the empty outcome as
//! a normal result.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors raised by the mapping layer.
///
/// This enum covers per-field validation, list element typing, unique-lookup
/// ambiguity, and the serialization/backend carriers for errors crossing the
/// storage boundary.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A value failed its field's type contract.
    ///
    /// Raised at the point of validation (extraction, load, or an explicit
    /// set) and always surfaced to the caller, never coerced away.
    #[error("Invalid value {value} for field '{field}': expected {expected}")]
    InvalidValue {
        /// Name of the offending field.
        field: String,
        /// Rendering of the rejected value.
        value: String,
        /// The kind the field expected.
        expected: String,
    },
    /// An element of the wrong kind was appended to an embedded list.
    #[error("Invalid element added to list: expecting {expected}, received {actual}")]
    TypeMismatch {
        /// The list's declared element kind.
        expected: String,
        /// What was actually supplied.
        actual: String,
    },
    /// A unique-lookup operation matched more than one stored record.
    ///
    /// This signals a broken uniqueness assumption; it is never resolved by
    /// silently picking one of the results.
    #[error("Multiple results returned for query {0}")]
    AmbiguousMatch(String),
    /// A field name outside the type's schema was used.
    #[error("Unknown field '{0}' on type {1}")]
    UnknownField(String, String),
    /// Serialization/deserialization error when converting storage values.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An error occurred in the storage collaborator.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

impl From<BsonError> for ModelError {
    fn from(err: BsonError) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for ModelError {
    fn from(err: SerdeJsonError) -> Self {
        ModelError::Serialization(err.to_string())
    }
}
