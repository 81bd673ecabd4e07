//! Crate-wide error type
//!
//! Error codes:
//! - FHIR_SCHEMA_INVALID
//! - FHIR_DUPLICATE_INDEX
//! - FHIR_UNKNOWN_INDEX
//! - FHIR_TYPE_MISMATCH
//! - FHIR_QUERY_SYNTAX
//! - FHIR_UNBOUND_FIELD
//! - FHIR_EXPRESSION
//! - FHIR_CONFIG
//! - FHIR_IO
//!
//! Subsystem errors convert losslessly; `code()` of the wrapped error is
//! preserved.

use thiserror::Error;

use crate::aggregate::AggregateError;
use crate::config::ConfigError;
use crate::expr::ExprError;
use crate::index::IndexError;
use crate::query::QueryError;
use crate::schema::SchemaError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// File or stream failure outside the core
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Index(e) => e.code(),
            Error::Query(e) => e.code(),
            Error::Aggregate(e) => e.code(),
            Error::Config(e) => e.code(),
            Error::Io { .. } => "FHIR_IO",
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<SchemaError> for Error {
    fn from(e: SchemaError) -> Self {
        Error::Index(IndexError::Schema(e))
    }
}

impl From<ExprError> for Error {
    fn from(e: ExprError) -> Self {
        Error::Aggregate(AggregateError::from(e))
    }
}
