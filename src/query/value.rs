//! Scalar literal representation shared by the expression tree, resolvers, and
//! the renderer table.

use std::fmt;

use time::PrimitiveDateTime;

/// Typed literal value. The variant doubles as the semantic type used to pick
/// a renderer.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Null literal.
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Signed 64-bit integer literal.
    Int(i64),
    /// 64-bit floating point literal.
    Float(f64),
    /// UTF-8 string literal.
    String(String),
    /// Calendar date and wall-clock time without an offset.
    DateTime(PrimitiveDateTime),
    /// Enumeration tag, carried by name.
    Enum(String),
    /// Host-defined scalar (identifiers, money, ...). `raw` is its default
    /// textual form; hosts attach a renderer for `kind` to change it.
    Custom {
        /// Host type name used as the renderer key.
        kind: String,
        /// Default textual rendering.
        raw: String,
    },
}

/// Semantic type of a [`Value`], used as the renderer table key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// See [`Value::Null`].
    Null,
    /// See [`Value::Bool`].
    Bool,
    /// See [`Value::Int`].
    Int,
    /// See [`Value::Float`].
    Float,
    /// See [`Value::String`].
    String,
    /// See [`Value::DateTime`].
    DateTime,
    /// See [`Value::Enum`].
    Enum,
    /// See [`Value::Custom`].
    Custom(String),
}

impl Value {
    /// Returns the semantic type of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::Enum(_) => ValueKind::Enum,
            Value::Custom { kind, .. } => ValueKind::Custom(kind.clone()),
        }
    }

    /// Whether this is the null literal.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Builds an enumeration tag.
    pub fn enum_tag(tag: impl Into<String>) -> Self {
        Value::Enum(tag.into())
    }

    /// Builds a host-defined scalar.
    pub fn custom(kind: impl Into<String>, raw: impl Into<String>) -> Self {
        Value::Custom {
            kind: kind.into(),
            raw: raw.into(),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Null => write!(f, "null"),
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::Int => write!(f, "int"),
            ValueKind::Float => write!(f, "float"),
            ValueKind::String => write!(f, "string"),
            ValueKind::DateTime => write!(f, "datetime"),
            ValueKind::Enum => write!(f, "enum"),
            ValueKind::Custom(name) => write!(f, "{name}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<PrimitiveDateTime> for Value {
    fn from(value: PrimitiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
