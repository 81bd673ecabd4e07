//! Expression error types
//!
//! Error codes:
//! - FHIR_EXPRESSION (REJECT)
//! - FHIR_UNBOUND_FIELD (REJECT)

use thiserror::Error;

/// Result type for expression compilation and evaluation
pub type ExprResult<T> = Result<T, ExprError>;

/// Expression errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// Malformed expression text
    #[error("expression syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// Call to a function that does not exist
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// Call with the wrong number of arguments
    #[error("function '{function}' expects {expected} arguments, got {got}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        got: usize,
    },

    /// Operand or argument of the wrong type
    #[error("{context}: expected {expected}, got {actual}")]
    Type {
        context: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Arithmetic or function result is undefined
    #[error("{0}")]
    Domain(String),

    /// `geodistance` argument missing or not a coordinate
    #[error("geodistance: missing or invalid coordinate in argument {0}")]
    MissingCoordinate(usize),

    /// Reference to a field not bound in the current tuple
    #[error("field '@{0}' is not loaded")]
    UnboundField(String),
}

impl ExprError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ExprError::UnboundField(_) => "FHIR_UNBOUND_FIELD",
            _ => "FHIR_EXPRESSION",
        }
    }

    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        ExprError::Syntax {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn type_error(
        context: impl Into<String>,
        expected: &'static str,
        actual: &'static str,
    ) -> Self {
        ExprError::Type {
            context: context.into(),
            expected,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ExprError::UnboundField("x".into()).code(), "FHIR_UNBOUND_FIELD");
        assert_eq!(ExprError::MissingCoordinate(1).code(), "FHIR_EXPRESSION");
        assert_eq!(ExprError::UnknownFunction("f".into()).code(), "FHIR_EXPRESSION");
    }
}
