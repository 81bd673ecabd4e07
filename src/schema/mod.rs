//! Index schema subsystem
//!
//! An index schema names a key prefix and the fields extracted from every
//! document whose key starts with it.
//!
//! # Invariants
//!
//! - Aliases are unique within one schema
//! - Every field path is a valid JSONPath once the schema exists
//! - Schemas are immutable after registration

mod errors;
mod path;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use path::{JsonPath, Segment};
pub use types::{FieldSchema, FieldType, IndexSchema};
