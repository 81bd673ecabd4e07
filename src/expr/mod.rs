//! Expression language for APPLY and FILTER
//!
//! A closed grammar of literals, `@field` references, arithmetic,
//! comparison and logical operators, and built-in functions. Text is
//! compiled once into an [`Expr`] tree, then evaluated per tuple.
//!
//! # Invariants
//!
//! - Unknown functions and wrong arities fail at compile time
//! - Evaluation never yields NaN; undefined results are errors
//! - Referencing an unbound field is `UnboundField`, distinct from null

mod ast;
mod errors;
mod eval;
mod functions;
mod lexer;
mod parser;
mod value;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use errors::{ExprError, ExprResult};
pub use eval::Bindings;
pub use functions::{Function, EARTH_RADIUS_METERS};
pub use parser::parse_expression;
pub use value::Scalar;
