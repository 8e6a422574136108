//! Built-in operation visitors.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use time::Time;
use tracing::trace;

use crate::error::{FilterError, Result};
use crate::query::ast::Expr;
use crate::query::calendar::parse_persian_date;
use crate::query::emit::Emitter;
use crate::query::registry::OperationVisitor;
use crate::query::value::Value;

/// Tag for the inclusive range membership operation.
pub const BETWEEN: &str = "between";
/// Tag for the current-user context lookup.
pub const CURRENT_USER: &str = "currentUser";
/// Tag for Solar Hijri date literals.
pub const PERSIAN_DATE: &str = "pdate";

/// Host-supplied ambient values (current user, tenant, ...).
pub trait ContextProvider: Send + Sync {
    /// Returns the value bound to `key`, if any.
    fn lookup(&self, key: &str) -> Option<Value>;
}

/// Fixed key/value context, typically loaded from configuration.
#[derive(Clone, Debug, Default)]
pub struct StaticContext {
    values: FxHashMap<String, Value>,
}

impl StaticContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ContextProvider for StaticContext {
    fn lookup(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
}

/// `x between [low,high]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BetweenVisitor;

impl OperationVisitor for BetweenVisitor {
    fn visit(&self, emitter: &mut Emitter<'_>, args: &[Expr]) -> Result<()> {
        let [value, low, high] = args else {
            return Err(FilterError::malformed(format!(
                "{BETWEEN} takes a value and two bounds, got {} arguments",
                args.len()
            )));
        };
        emitter.visit(value)?;
        emitter.append(" between [");
        emitter.visit(low)?;
        emitter.append(",");
        emitter.visit(high)?;
        emitter.append("]");
        Ok(())
    }
}

/// Looks up the current user through the context provider. Contributes no
/// query text.
#[derive(Clone)]
pub struct CurrentUserVisitor {
    context: Arc<dyn ContextProvider>,
}

impl CurrentUserVisitor {
    /// Creates the visitor over `context`.
    pub fn new(context: Arc<dyn ContextProvider>) -> Self {
        Self { context }
    }
}

impl OperationVisitor for CurrentUserVisitor {
    fn visit(&self, _emitter: &mut Emitter<'_>, _args: &[Expr]) -> Result<()> {
        let user = self.context.lookup(CURRENT_USER);
        trace!(found = user.is_some(), "filter.function.current_user");
        Ok(())
    }
}

/// Converts a `yyyy/MM/dd` Solar Hijri string literal into a Gregorian
/// date-time constant at midnight and emits it as a literal.
#[derive(Clone, Copy, Debug, Default)]
pub struct PersianDateVisitor;

impl OperationVisitor for PersianDateVisitor {
    fn visit(&self, emitter: &mut Emitter<'_>, args: &[Expr]) -> Result<()> {
        let Some(Expr::Constant(Value::String(text))) = args.first() else {
            return Err(FilterError::malformed(format!(
                "{PERSIAN_DATE} requires a string literal argument"
            )));
        };
        let date = parse_persian_date(text)?;
        emitter.visit(&Expr::Constant(Value::DateTime(date.with_time(Time::MIDNIGHT))))
    }
}
