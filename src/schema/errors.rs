//! Schema error types
//!
//! Error codes:
//! - FHIR_SCHEMA_INVALID (REJECT)
//!
//! A rejected definition never touches already registered indexes.

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while validating an index definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two fields in one index share an alias
    #[error("duplicate field alias '{alias}' in index '{index}'")]
    DuplicateAlias { index: String, alias: String },

    /// Field type name is not one of TAG, TEXT, NUMERIC, GEO
    #[error("unknown field type '{0}'")]
    UnknownFieldType(String),

    /// Field path is not a supported JSONPath
    #[error("invalid JSONPath '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Structurally invalid definition (empty name, empty alias, ...)
    #[error("invalid index definition: {0}")]
    InvalidDefinition(String),
}

impl SchemaError {
    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        "FHIR_SCHEMA_INVALID"
    }
}
