//! Index error types
//!
//! Error codes:
//! - FHIR_SCHEMA_INVALID (REJECT)
//! - FHIR_DUPLICATE_INDEX (REJECT)
//! - FHIR_UNKNOWN_INDEX (REJECT)
//! - FHIR_TYPE_MISMATCH (REJECT in strict mode, otherwise logged and skipped)

use thiserror::Error;

use crate::schema::SchemaError;

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Index manager errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// Index definition rejected
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// An index with this name is already registered
    #[error("index '{0}' already exists")]
    DuplicateIndex(String),

    /// No index with this name is registered
    #[error("unknown index '{0}'")]
    UnknownIndex(String),

    /// A resolved value cannot be coerced to the declared field type
    #[error("field '{alias}' of '{key}' expects {expected}, got {actual}")]
    TypeMismatch {
        key: String,
        alias: String,
        expected: &'static str,
        actual: String,
    },
}

impl IndexError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::Schema(e) => e.code(),
            IndexError::DuplicateIndex(_) => "FHIR_DUPLICATE_INDEX",
            IndexError::UnknownIndex(_) => "FHIR_UNKNOWN_INDEX",
            IndexError::TypeMismatch { .. } => "FHIR_TYPE_MISMATCH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(IndexError::DuplicateIndex("a".into()).code(), "FHIR_DUPLICATE_INDEX");
        assert_eq!(IndexError::UnknownIndex("a".into()).code(), "FHIR_UNKNOWN_INDEX");
        assert_eq!(
            IndexError::from(SchemaError::UnknownFieldType("X".into())).code(),
            "FHIR_SCHEMA_INVALID"
        );
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = IndexError::TypeMismatch {
            key: "Claim:1".into(),
            alias: "value".into(),
            expected: "NUMERIC",
            actual: "\"lots\"".into(),
        };
        let display = err.to_string();
        assert!(display.contains("Claim:1"));
        assert!(display.contains("NUMERIC"));
    }
}
