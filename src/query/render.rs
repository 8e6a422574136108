//! Type-directed literal rendering.
//!
//! The emitter never formats literals itself; it asks a [`RendererTable`]
//! keyed by [`ValueKind`]. Hosts add or override entries (custom identifier
//! types, alternate date formats) without touching the emitter.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use time::macros::format_description;
use time::PrimitiveDateTime;

use crate::error::{FilterError, Result};
use crate::query::value::{Value, ValueKind};

/// Renders one literal as query text.
pub type RenderFn = Arc<dyn Fn(&Value) -> Result<String> + Send + Sync>;

/// Mapping from semantic value type to rendering function.
#[derive(Clone)]
pub struct RendererTable {
    renderers: FxHashMap<ValueKind, RenderFn>,
}

impl RendererTable {
    /// Table with the built-in quoting rules for strings, dates, booleans,
    /// enumerations, and null.
    pub fn new() -> Self {
        Self::empty()
            .with(ValueKind::String, |value| match value {
                Value::String(text) => Ok(quote(text)),
                other => default_text(other),
            })
            .with(ValueKind::DateTime, |value| match value {
                Value::DateTime(dt) => Ok(quote(&format_date_time(dt)?)),
                other => default_text(other),
            })
            .with(ValueKind::Bool, |value| match value {
                Value::Bool(true) => Ok("true".to_owned()),
                Value::Bool(false) => Ok("false".to_owned()),
                other => default_text(other),
            })
            .with(ValueKind::Enum, |value| match value {
                Value::Enum(tag) => Ok(quote(tag)),
                other => default_text(other),
            })
            .with(ValueKind::Null, |_| Ok("null".to_owned()))
    }

    /// Table without any entries; every value falls back to its default
    /// textual form.
    pub fn empty() -> Self {
        Self {
            renderers: FxHashMap::default(),
        }
    }

    /// Adds or replaces the renderer for `kind`.
    pub fn with<F>(mut self, kind: ValueKind, render: F) -> Self
    where
        F: Fn(&Value) -> Result<String> + Send + Sync + 'static,
    {
        self.insert(kind, render);
        self
    }

    /// Adds or replaces the renderer for `kind` in place.
    pub fn insert<F>(&mut self, kind: ValueKind, render: F)
    where
        F: Fn(&Value) -> Result<String> + Send + Sync + 'static,
    {
        self.renderers.insert(kind, Arc::new(render));
    }

    /// Whether a dedicated renderer is registered for `kind`.
    pub fn contains(&self, kind: &ValueKind) -> bool {
        self.renderers.contains_key(kind)
    }

    /// Renders `value` with its registered renderer or the default form.
    pub fn render(&self, value: &Value) -> Result<String> {
        match self.renderers.get(&value.kind()) {
            Some(render) => render(value),
            None => default_text(value),
        }
    }
}

impl Default for RendererTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RendererTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<String> = self.renderers.keys().map(ToString::to_string).collect();
        kinds.sort();
        f.debug_struct("RendererTable").field("kinds", &kinds).finish()
    }
}

/// Wraps `text` in single quotes. Content is not escaped.
pub fn quote(text: &str) -> String {
    format!("'{text}'")
}

/// Formats a date-time as `yyyy-MM-ddTHH:mm:ss`.
pub fn format_date_time(dt: &PrimitiveDateTime) -> Result<String> {
    let layout = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    dt.format(layout)
        .map_err(|err| FilterError::malformed(format!("date-time literal: {err}")))
}

/// Plain textual form used when no renderer is registered.
pub fn default_text(value: &Value) -> Result<String> {
    Ok(match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(x) => x.to_string(),
        Value::String(s) => s.clone(),
        Value::DateTime(dt) => format_date_time(dt)?,
        Value::Enum(tag) => tag.clone(),
        Value::Custom { raw, .. } => raw.clone(),
    })
}
