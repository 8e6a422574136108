//! Field resolution for captured values.
//!
//! The emitter never inspects captured host values. Each step of a captured
//! field path goes through a [`FieldResolver`], which either yields a terminal
//! scalar or another captured value to keep walking.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::{FilterError, Result};
use crate::query::ast::Captured;
use crate::query::value::Value;

/// Outcome of reading one field.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    /// Terminal scalar, rendered like a constant.
    Value(Value),
    /// Composite value; resolution continues with the next field.
    Captured(Captured),
}

impl Resolved {
    /// Wraps any scalar convertible into a [`Value`].
    pub fn value(value: impl Into<Value>) -> Self {
        Resolved::Value(value.into())
    }

    /// Wraps a composite host value.
    pub fn captured<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Resolved::Captured(Captured::new(value))
    }
}

/// Reads a named field from a captured instance.
pub trait FieldResolver: Send + Sync {
    /// Returns the value of `field` on `instance`, or
    /// [`FilterError::FieldNotFound`] when the instance has no such field.
    fn resolve(&self, instance: &Captured, field: &str) -> Result<Resolved>;
}

impl<F> FieldResolver for F
where
    F: Fn(&Captured, &str) -> Result<Resolved> + Send + Sync,
{
    fn resolve(&self, instance: &Captured, field: &str) -> Result<Resolved> {
        self(instance, field)
    }
}

/// Resolves fields of captured `serde_json::Value` documents.
///
/// Objects and arrays stay composite; numbers become `Int` when they fit in
/// `i64`, a [`UNSIGNED_KIND`] custom value carrying the exact digits when they
/// only fit in `u64`, and `Float` otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonResolver;

impl JsonResolver {
    /// Converts a JSON scalar into a resolution step.
    pub fn convert(value: &serde_json::Value) -> Resolved {
        match value {
            serde_json::Value::Null => Resolved::Value(Value::Null),
            serde_json::Value::Bool(b) => Resolved::Value(Value::Bool(*b)),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Resolved::Value(Value::Int(i)),
                (None, Some(_)) => Resolved::Value(Value::custom(UNSIGNED_KIND, n.to_string())),
                (None, None) => Resolved::Value(Value::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            serde_json::Value::String(s) => Resolved::Value(Value::String(s.clone())),
            composite => Resolved::Captured(Captured::new(composite.clone())),
        }
    }
}

impl FieldResolver for JsonResolver {
    fn resolve(&self, instance: &Captured, field: &str) -> Result<Resolved> {
        let Some(doc) = instance.downcast_ref::<serde_json::Value>() else {
            return Err(FilterError::field_not_found(instance.type_name(), field));
        };
        let found = match doc {
            serde_json::Value::Object(map) => map.get(field),
            serde_json::Value::Array(items) => field.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match found {
            Some(value) => {
                trace!(field, "filter.resolve.json");
                Ok(Self::convert(value))
            }
            None => Err(FilterError::field_not_found(json_shape(doc), field)),
        }
    }
}

fn json_shape(doc: &serde_json::Value) -> &'static str {
    match doc {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Custom value kind for JSON integers above `i64::MAX`.
pub const UNSIGNED_KIND: &str = "u64";

type Accessor = Box<dyn Fn(&Captured) -> Option<Resolved> + Send + Sync>;

/// Hand-written accessor table keyed by concrete host type and field name.
///
/// Lookups that miss fall through to an optional fallback resolver.
#[derive(Default)]
pub struct AccessorResolver {
    accessors: FxHashMap<(TypeId, String), Accessor>,
    fallback: Option<Arc<dyn FieldResolver>>,
}

impl AccessorResolver {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the accessor for `field` on host type `T`.
    pub fn field<T, F>(mut self, field: impl Into<String>, read: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> Resolved + Send + Sync + 'static,
    {
        let accessor: Accessor = Box::new(move |instance| instance.downcast_ref::<T>().map(&read));
        self.accessors
            .insert((TypeId::of::<T>(), field.into()), accessor);
        self
    }

    /// Resolver consulted when no accessor matches.
    pub fn with_fallback(mut self, fallback: Arc<dyn FieldResolver>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl FieldResolver for AccessorResolver {
    fn resolve(&self, instance: &Captured, field: &str) -> Result<Resolved> {
        let key = (instance.type_id(), field.to_owned());
        if let Some(resolved) = self.accessors.get(&key).and_then(|read| read(instance)) {
            trace!(field, type_name = instance.type_name(), "filter.resolve.accessor");
            return Ok(resolved);
        }
        match &self.fallback {
            Some(fallback) => fallback.resolve(instance, field),
            None => Err(FilterError::field_not_found(instance.type_name(), field)),
        }
    }
}

impl fmt::Debug for AccessorResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorResolver")
            .field("accessors", &self.accessors.len())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
