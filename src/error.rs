//! Error types for dictionary values, lookups and the reference store.

use crate::store::RowId;
use crate::value::{CastDirective, ValueKind};
use thiserror::Error;

/// Errors raised by the dictionary container, the lookup compiler and the
/// column binding adapter.
#[derive(Error, Debug)]
pub enum HStoreError {
    /// The source a dictionary was built from is not a mapping.
    #[error("invalid dictionary source: {0}")]
    Dict(String),

    /// A value of an unsupported kind was assigned into a dictionary.
    #[error("cannot store a value of type {kind} in a dictionary")]
    Coercion { kind: ValueKind },

    /// A lookup operand does not fit the lookup kind.
    #[error("invalid lookup: {0}")]
    Lookup(String),

    /// The full-clean hook rejected the live value of a field.
    #[error("validation failed for field '{field}': {message}")]
    Validation { field: String, message: String },

    /// A column constraint was violated when writing a row.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Stored text could not be read under the requested cast.
    #[error("invalid input for {cast}: '{value}'")]
    InvalidCast { value: String, cast: CastDirective },

    #[error("row not found: {0}")]
    RowNotFound(RowId),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),
}

impl HStoreError {
    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        HStoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type for dictionary operations.
pub type HStoreResult<T> = Result<T, HStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HStoreError::Dict("expected a JSON object".to_string());
        assert_eq!(
            err.to_string(),
            "invalid dictionary source: expected a JSON object"
        );

        let err = HStoreError::Coercion {
            kind: ValueKind::Bytes,
        };
        assert_eq!(err.to_string(), "cannot store a value of type bytes in a dictionary");

        let err = HStoreError::validation("data", "this field cannot be blank");
        assert_eq!(
            err.to_string(),
            "validation failed for field 'data': this field cannot be blank"
        );

        let err = HStoreError::InvalidCast {
            value: "abc".to_string(),
            cast: CastDirective::BigInt,
        };
        assert_eq!(err.to_string(), "invalid input for bigint: 'abc'");

        let err = HStoreError::RowNotFound(RowId(7));
        assert_eq!(err.to_string(), "row not found: 7");
    }
}
