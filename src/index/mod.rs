//! Index subsystem
//!
//! Indexes are derived, in-memory state kept in lockstep with the document
//! store. Every `put` updates all matching indexes before it returns.
//!
//! # Design Principles
//!
//! - Derived state: the document store is the source of truth
//! - One structure per field, chosen from the field type at creation
//! - Deterministic: BTreeMap/BTreeSet iteration, handles in insertion order
//!
//! # Invariants
//!
//! - A document key has at most one entry per index
//! - Index and store are mutated only after every extraction succeeded
//! - Readers never observe a partially applied entry

mod entry;
mod errors;
mod field;
mod geo;
mod manager;
mod numeric;
mod store;
mod tag;
mod text;

pub use entry::{FieldValue, GeoPoint, IndexEntry, Mismatch};
pub use errors::{IndexError, IndexResult};
pub use field::{DocId, DocSet, FieldIndex};
pub use geo::GeoIndex;
pub use manager::{Index, IndexData, IndexInfo, IndexManager};
pub use numeric::{NumericBound, NumericIndex};
pub use store::DocumentStore;
pub use tag::TagIndex;
pub use text::{tokenize, TextIndex};
