//! Query error types
//!
//! Error codes:
//! - FHIR_QUERY_SYNTAX (REJECT)
//! - FHIR_UNKNOWN_INDEX (REJECT, from the index subsystem)

use thiserror::Error;

use crate::index::IndexError;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Query errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Index lookup failed
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Malformed query text
    #[error("query syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// Field alias not declared by the index schema
    #[error("unknown field '@{alias}' in index '{index}'")]
    UnknownField { index: String, alias: String },

    /// Matcher kind not supported by the field type
    #[error("field '@{alias}' is {field_type} and does not support {matcher} matching")]
    WrongMatcher {
        alias: String,
        field_type: &'static str,
        matcher: &'static str,
    },

    /// Sort requested on a field not declared sortable
    #[error("field '@{0}' is not sortable")]
    NotSortable(String),
}

impl QueryError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Index(e) => e.code(),
            _ => "FHIR_QUERY_SYNTAX",
        }
    }

    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        QueryError::Syntax {
            position,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(QueryError::syntax(0, "x").code(), "FHIR_QUERY_SYNTAX");
        assert_eq!(QueryError::NotSortable("a".into()).code(), "FHIR_QUERY_SYNTAX");
        assert_eq!(
            QueryError::from(IndexError::UnknownIndex("x".into())).code(),
            "FHIR_UNKNOWN_INDEX"
        );
    }
}
