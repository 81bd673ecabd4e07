//! Aggregation subsystem
//!
//! A pipeline seeds one tuple per document matching the predicate, then
//! threads the tuple vector through LOAD, APPLY, GROUPBY, FILTER, SORTBY
//! and LIMIT stages in order.
//!
//! # Invariants
//!
//! - APPLY and FILTER see only fields bound by earlier stages
//! - GROUPBY emits groups in first-appearance order and drops other fields
//! - SORTBY is stable; null keys sort last in both directions
//! - A failing stage aborts the pipeline; no partial rows are returned

mod errors;
mod pipeline;
mod reducer;
mod sorter;
mod stage;
mod tuple;

pub use errors::{AggregateError, AggregateResult};
pub use pipeline::{aggregate, AggregateOutput, Pipeline};
pub use reducer::{Accumulator, KeyPart};
pub use sorter::TupleSorter;
pub use stage::{Reducer, ReducerKind, Stage};
pub use tuple::Tuple;
