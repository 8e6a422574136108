//! Sombra predicate filter translator.
//!
//! Converts typed predicate expression trees into the rule text evaluated by
//! the rules engine. See [`query::Translator`] for the entry point.

#![warn(missing_docs)]

pub mod error;
pub mod query;

pub use error::{FilterError, FilterErrorWithCode, Result};
pub use query::{parse_predicate, Expr, FunctionRegistry, Predicate, Translator, Value};
