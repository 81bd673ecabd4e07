//! Aggregation error types
//!
//! Error codes:
//! - FHIR_UNBOUND_FIELD (REJECT)
//! - FHIR_EXPRESSION (REJECT)
//! - FHIR_QUERY_SYNTAX (REJECT, malformed stage or predicate)
//! - FHIR_UNKNOWN_INDEX (REJECT, from the index subsystem)
//!
//! A failing stage aborts the whole pipeline; no partial rows are returned.

use thiserror::Error;

use crate::expr::ExprError;
use crate::index::IndexError;
use crate::query::QueryError;

/// Result type for aggregation
pub type AggregateResult<T> = Result<T, AggregateError>;

/// Aggregation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    /// Predicate or index lookup failed
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Expression failed to compile or evaluate
    #[error(transparent)]
    Expression(ExprError),

    /// A stage read a field that no earlier stage bound
    #[error("field '@{0}' is not loaded")]
    UnboundField(String),

    /// FILTER produced something other than a boolean
    #[error("FILTER expression must evaluate to a boolean, got {0}")]
    NotBoolean(&'static str),

    /// Stage definition rejected at compile time
    #[error("invalid {stage} stage: {message}")]
    InvalidStage {
        stage: &'static str,
        message: String,
    },
}

impl AggregateError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            AggregateError::Query(e) => e.code(),
            AggregateError::Expression(e) => e.code(),
            AggregateError::UnboundField(_) => "FHIR_UNBOUND_FIELD",
            AggregateError::NotBoolean(_) => "FHIR_EXPRESSION",
            AggregateError::InvalidStage { .. } => "FHIR_QUERY_SYNTAX",
        }
    }

    pub(crate) fn invalid_stage(stage: &'static str, message: impl Into<String>) -> Self {
        AggregateError::InvalidStage {
            stage,
            message: message.into(),
        }
    }
}

impl From<ExprError> for AggregateError {
    fn from(e: ExprError) -> Self {
        match e {
            ExprError::UnboundField(alias) => AggregateError::UnboundField(alias),
            other => AggregateError::Expression(other),
        }
    }
}

impl From<IndexError> for AggregateError {
    fn from(e: IndexError) -> Self {
        AggregateError::Query(QueryError::Index(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_field_is_lifted() {
        let err = AggregateError::from(ExprError::UnboundField("year".into()));
        assert_eq!(err, AggregateError::UnboundField("year".into()));
        assert_eq!(err.code(), "FHIR_UNBOUND_FIELD");

        let err = AggregateError::from(ExprError::MissingCoordinate(1));
        assert_eq!(err.code(), "FHIR_EXPRESSION");
    }

    #[test]
    fn test_index_errors_keep_their_code() {
        let err = AggregateError::from(IndexError::UnknownIndex("x".into()));
        assert_eq!(err.code(), "FHIR_UNKNOWN_INDEX");
        assert_eq!(AggregateError::NotBoolean("number").code(), "FHIR_EXPRESSION");
    }
}
