//! Error taxonomy shared by the translator, resolvers, and operation visitors.

use std::fmt;

use thiserror::Error;

/// Result alias used throughout the translation layer.
pub type Result<T> = std::result::Result<T, FilterError>;

/// Failures raised while translating a predicate tree.
///
/// Translation is all-or-nothing: the first error aborts the walk and no
/// partial fragment is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Operator or node shape outside the supported set.
    #[error("unsupported operator: {operator}")]
    UnsupportedOperator {
        /// Operator, method, or node shape that was rejected.
        operator: String,
    },
    /// A captured-value field chain could not be reduced to a scalar.
    #[error("unresolved path '{path}': {reason}")]
    UnresolvedPath {
        /// Dotted path as written in the predicate.
        path: String,
        /// Why resolution stopped.
        reason: &'static str,
    },
    /// The field resolver did not find the named member.
    #[error("field '{field}' not found on {type_name}")]
    FieldNotFound {
        /// Runtime shape of the captured instance.
        type_name: String,
        /// Requested field.
        field: String,
    },
    /// Structural precondition violated (arity, literal kind, ...).
    #[error("malformed expression tree: {0}")]
    MalformedTree(String),
}

impl FilterError {
    /// Builds an [`FilterError::UnsupportedOperator`] for the given token.
    pub fn unsupported(operator: impl Into<String>) -> Self {
        FilterError::UnsupportedOperator {
            operator: operator.into(),
        }
    }

    /// Builds a [`FilterError::FieldNotFound`].
    pub fn field_not_found(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        FilterError::FieldNotFound {
            type_name: type_name.into(),
            field: field.into(),
        }
    }

    /// Builds a [`FilterError::MalformedTree`].
    pub fn malformed(detail: impl Into<String>) -> Self {
        FilterError::MalformedTree(detail.into())
    }

    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            FilterError::UnsupportedOperator { .. } => "UnsupportedOperator",
            FilterError::UnresolvedPath { .. } => "UnresolvedPath",
            FilterError::FieldNotFound { .. } => "FieldNotFound",
            FilterError::MalformedTree(_) => "MalformedTree",
        }
    }
}

/// Convenience wrapper that formats filter errors with their codes.
pub struct FilterErrorWithCode<'a>(pub &'a FilterError);

impl fmt::Display for FilterErrorWithCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0.code(), self.0)
    }
}
