//! Query subsystem
//!
//! Parses query strings into predicate trees and evaluates them against an
//! index's per-field structures.
//!
//! # Invariants
//!
//! - Every field leaf is checked against the schema before evaluation
//! - Evaluation holds the index read lock for its whole duration
//! - Unsorted results follow document insertion order

mod ast;
mod engine;
mod errors;
mod eval;
mod parser;
mod result;

pub use ast::{Matcher, Predicate, SortDirection, TextMatch};
pub use engine::{compile, search};
pub use errors::{QueryError, QueryResult};
pub use eval::{check, Evaluator};
pub use parser::parse_query;
pub use result::{SearchDocument, SearchOptions, SearchResult, SortBy};
