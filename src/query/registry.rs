//! Function extension registry.
//!
//! Maps operation tags to [`OperationVisitor`]s for calls that have no
//! generic tree-shape rule. The table is assembled explicitly by the host at
//! startup and is never mutated while translations run.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::query::ast::Expr;
use crate::query::emit::Emitter;
use crate::query::functions::{
    BetweenVisitor, ContextProvider, CurrentUserVisitor, PersianDateVisitor, BETWEEN,
    CURRENT_USER, PERSIAN_DATE,
};

/// Emits query text for one extension operation.
///
/// `args` holds the call receiver (when the call had an explicit target)
/// followed by the call arguments.
pub trait OperationVisitor: Send + Sync {
    /// Writes the operation through `emitter`.
    fn visit(&self, emitter: &mut Emitter<'_>, args: &[Expr]) -> Result<()>;
}

struct FnVisitor<F>(F);

impl<F> OperationVisitor for FnVisitor<F>
where
    F: Fn(&mut Emitter<'_>, &[Expr]) -> Result<()> + Send + Sync,
{
    fn visit(&self, emitter: &mut Emitter<'_>, args: &[Expr]) -> Result<()> {
        (self.0)(emitter, args)
    }
}

/// Tag-to-visitor lookup consulted before any built-in method rule.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    visitors: FxHashMap<String, Arc<dyn OperationVisitor>>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `between`, `currentUser`, and `pdate`.
    pub fn with_builtins(context: Arc<dyn ContextProvider>) -> Self {
        Self::new()
            .with(BETWEEN, BetweenVisitor)
            .with(CURRENT_USER, CurrentUserVisitor::new(context))
            .with(PERSIAN_DATE, PersianDateVisitor)
    }

    /// Adds or replaces the visitor for `tag`.
    pub fn with<V>(mut self, tag: impl Into<String>, visitor: V) -> Self
    where
        V: OperationVisitor + 'static,
    {
        self.register(tag, visitor);
        self
    }

    /// Adds or replaces a closure-backed visitor for `tag`.
    pub fn with_fn<F>(self, tag: impl Into<String>, visit: F) -> Self
    where
        F: Fn(&mut Emitter<'_>, &[Expr]) -> Result<()> + Send + Sync + 'static,
    {
        self.with(tag, FnVisitor(visit))
    }

    /// Adds or replaces the visitor for `tag` in place.
    pub fn register<V>(&mut self, tag: impl Into<String>, visitor: V)
    where
        V: OperationVisitor + 'static,
    {
        self.visitors.insert(tag.into(), Arc::new(visitor));
    }

    /// Visitor registered for `tag`, matched exactly.
    pub fn get(&self, tag: &str) -> Option<&dyn OperationVisitor> {
        self.visitors.get(tag).map(|visitor| visitor.as_ref())
    }

    /// Whether `tag` is registered.
    pub fn contains(&self, tag: &str) -> bool {
        self.visitors.contains_key(tag)
    }

    /// Registered tags in sorted order.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.visitors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Number of registered visitors.
    pub fn len(&self) -> usize {
        self.visitors.len()
    }

    /// Whether no visitor is registered.
    pub fn is_empty(&self) -> bool {
        self.visitors.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}
