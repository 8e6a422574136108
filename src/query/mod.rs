#![forbid(unsafe_code)]

//! Predicate translation engine.
//!
//! Turns typed predicate trees into the textual rule language consumed by the
//! rules engine, resolving captured host values and delegating named
//! operations to an extension registry.

/// Predicate tree node types.
///
/// Defines parameters, member accesses, captured values, operators, calls and
/// lambdas that make up a predicate.
pub mod ast;

/// Fluent predicate construction.
///
/// Provides combinators for building predicate trees without spelling out
/// every node.
pub mod builder;

/// Solar Hijri calendar conversion used by `pdate`.
pub mod calendar;

/// Recursive tree emitter.
///
/// Walks a predicate tree and writes the matching rule text.
pub mod emit;

/// Built-in extension operations.
pub mod functions;

/// Text front end for predicate trees.
pub mod parse;

/// Tag-to-visitor lookup for extension operations.
pub mod registry;

/// Constant rendering by value kind.
pub mod render;

/// Field resolution on captured host values.
pub mod resolve;

/// Constant values and their kinds.
pub mod value;

pub use ast::{BinaryOp, Captured, Expr, MethodCall, Predicate, Shape, UnaryOp};
pub use builder::PredicateBuilder;
pub use emit::{Emitter, Translator};
pub use functions::{ContextProvider, StaticContext};
pub use parse::{parse_predicate, ParseError, ParseOptions, MAX_NESTING};
pub use registry::{FunctionRegistry, OperationVisitor};
pub use render::RendererTable;
pub use resolve::{AccessorResolver, FieldResolver, JsonResolver, Resolved};
pub use value::{Value, ValueKind};
