//! Expression-tree to Cypher filter translation.
//!
//! [`Translator`] is the long-lived, shareable entry point. Each call builds a
//! fresh [`Emitter`] that owns the output buffer and the path-resolution stack
//! for that one walk, so concurrent translations never share mutable state.

use std::fmt;
use std::mem;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::{FilterError, Result};
use crate::query::ast::{BinaryOp, Captured, Expr, MethodCall, Predicate, Shape, UnaryOp};
use crate::query::registry::FunctionRegistry;
use crate::query::render::RendererTable;
use crate::query::resolve::{FieldResolver, JsonResolver, Resolved};
use crate::query::value::Value;

/// Translates predicate trees into filter fragments.
///
/// The registry, renderer table, and resolver are read-only after
/// construction; clones share them.
#[derive(Clone)]
pub struct Translator {
    registry: Arc<FunctionRegistry>,
    renderers: Arc<RendererTable>,
    resolver: Arc<dyn FieldResolver>,
}

impl Translator {
    /// Translator with no extensions, the default renderers, and a
    /// [`JsonResolver`] for captured values.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(FunctionRegistry::new()),
            renderers: Arc::new(RendererTable::new()),
            resolver: Arc::new(JsonResolver),
        }
    }

    /// Replaces the function extension registry.
    pub fn with_registry(mut self, registry: impl Into<Arc<FunctionRegistry>>) -> Self {
        self.registry = registry.into();
        self
    }

    /// Replaces the renderer table.
    pub fn with_renderers(mut self, renderers: impl Into<Arc<RendererTable>>) -> Self {
        self.renderers = renderers.into();
        self
    }

    /// Replaces the captured-value resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn FieldResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Registry consulted for extension calls.
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Translates `root`. A root lambda contributes only its body.
    pub fn translate(&self, root: &Expr) -> Result<String> {
        let mut emitter = Emitter::new(&self.registry, &self.renderers, self.resolver.as_ref());
        emitter.visit(root)?;
        let query = emitter.finish();
        debug!(len = query.len(), "filter.translate.completed");
        Ok(query)
    }

    /// Translates the body of `predicate`.
    pub fn translate_predicate(&self, predicate: &Predicate) -> Result<String> {
        trace!(param = %predicate.param, "filter.translate.predicate");
        self.translate(&predicate.body)
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator")
            .field("registry", &self.registry)
            .field("renderers", &self.renderers)
            .finish_non_exhaustive()
    }
}

/// Collection operations with a fixed rendering template.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CollectionMethod {
    Any,
    Count,
    First,
    Last,
    Contains,
}

impl CollectionMethod {
    fn parse(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "any" | "exists" => Some(Self::Any),
            "count" => Some(Self::Count),
            "first" | "firstordefault" => Some(Self::First),
            "last" | "lastordefault" => Some(Self::Last),
            "contains" => Some(Self::Contains),
            _ => None,
        }
    }

    fn template(self) -> &'static str {
        match self {
            Self::Any => "size({0}) > 0",
            Self::Count => "size({0})",
            Self::First => "{0}[0..1][0]",
            Self::Last => "{0}[size({0})-1..size({0})][0]",
            Self::Contains => "In {0}",
        }
    }

    fn apply(self, source: &str) -> String {
        self.template().replace("{0}", source)
    }
}

fn scalar_method_token(tag: &str) -> Option<&'static str> {
    match tag.to_ascii_lowercase().as_str() {
        "equals" => Some(" = "),
        "startswith" => Some(" Starts With "),
        "endswith" => Some(" Ends With "),
        "contains" => Some(" Contains "),
        _ => None,
    }
}

/// Single-use tree walker that writes query text.
///
/// Operation visitors receive the live emitter and drive it through
/// [`Emitter::visit`], [`Emitter::append`], and [`Emitter::emit_value`].
pub struct Emitter<'t> {
    registry: &'t FunctionRegistry,
    renderers: &'t RendererTable,
    resolver: &'t dyn FieldResolver,
    out: String,
    fields: SmallVec<[String; 4]>,
}

impl<'t> Emitter<'t> {
    /// Creates an emitter with an empty buffer.
    pub fn new(
        registry: &'t FunctionRegistry,
        renderers: &'t RendererTable,
        resolver: &'t dyn FieldResolver,
    ) -> Self {
        Self {
            registry,
            renderers,
            resolver,
            out: String::new(),
            fields: SmallVec::new(),
        }
    }

    /// Appends raw text to the output.
    pub fn append(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Renders `value` through the renderer table and appends it.
    pub fn emit_value(&mut self, value: &Value) -> Result<()> {
        let text = self.renderers.render(value)?;
        self.out.push_str(&text);
        Ok(())
    }

    /// Consumes the emitter, returning the accumulated text.
    pub fn finish(self) -> String {
        self.out
    }

    /// Emits `expr` and everything beneath it.
    pub fn visit(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Parameter(name) => {
                self.append(name);
                Ok(())
            }
            Expr::Member { target, member, .. } => self.visit_member(expr, target, member),
            Expr::Captured(instance) => self.resolve_captured(instance),
            Expr::Constant(value) => self.emit_value(value),
            Expr::Unary { op, operand } => self.visit_unary(*op, operand),
            Expr::Binary { op, left, right } => self.visit_binary(*op, left, right),
            Expr::Call(call) => self.visit_call(call),
            Expr::List(elements) => self.visit_list(elements),
            Expr::Lambda { body, .. } => self.visit(body),
        }
    }

    fn visit_member(&mut self, node: &Expr, target: &Expr, member: &str) -> Result<()> {
        match target {
            Expr::Parameter(name) => {
                self.append(name);
                self.append(".");
                self.append(member);
                Ok(())
            }
            Expr::Member { .. } | Expr::Captured(_) => {
                if let Some(path) = parameter_path(node) {
                    self.append(&path);
                    return Ok(());
                }
                let depth = self.fields.len();
                self.fields.push(member.to_owned());
                let outcome = self.visit(target);
                if outcome.is_err() {
                    self.fields.truncate(depth);
                }
                outcome
            }
            _ => Err(FilterError::UnresolvedPath {
                path: member.to_owned(),
                reason: "member target is neither a parameter nor a captured value",
            }),
        }
    }

    /// Pops pending field names, applying each to the result of the previous
    /// step, until a scalar is reached.
    fn resolve_captured(&mut self, instance: &Captured) -> Result<()> {
        let path = self
            .fields
            .iter()
            .rev()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(".");
        if self.fields.is_empty() {
            return Err(FilterError::UnresolvedPath {
                path: instance.type_name().to_owned(),
                reason: "captured value is used without a field",
            });
        }
        let mut current = instance.clone();
        while let Some(field) = self.fields.pop() {
            trace!(field = %field, "filter.emit.resolve_field");
            match self.resolver.resolve(&current, &field)? {
                Resolved::Captured(next) => current = next,
                Resolved::Value(value) => {
                    if !self.fields.is_empty() {
                        self.fields.clear();
                        return Err(FilterError::UnresolvedPath {
                            path,
                            reason: "scalar reached before the end of the path",
                        });
                    }
                    return self.emit_value(&value);
                }
            }
        }
        Err(FilterError::UnresolvedPath {
            path,
            reason: "path ends on a composite value",
        })
    }

    fn visit_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<()> {
        if op != UnaryOp::Not {
            return Err(FilterError::unsupported(op.to_string()));
        }
        self.append("not (");
        self.visit(operand)?;
        self.append(")");
        Ok(())
    }

    fn visit_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<()> {
        if matches!(op, BinaryOp::Eq | BinaryOp::Ne) && right.is_null_literal() {
            self.append("(");
            self.visit(left)?;
            self.append(if op == BinaryOp::Ne {
                " is not null)"
            } else {
                " is null)"
            });
            return Ok(());
        }
        let token = op
            .token()
            .ok_or_else(|| FilterError::unsupported(op.to_string()))?;
        self.append("(");
        self.visit(left)?;
        self.append(" ");
        self.append(token);
        self.append(" ");
        self.visit(right)?;
        self.append(")");
        Ok(())
    }

    fn visit_list(&mut self, elements: &[Expr]) -> Result<()> {
        self.append("[");
        for (idx, element) in elements.iter().enumerate() {
            if idx > 0 {
                self.append(",");
            }
            self.visit(element)?;
        }
        self.append("] ");
        Ok(())
    }

    fn visit_call(&mut self, call: &MethodCall) -> Result<()> {
        let registry = self.registry;
        if let Some(visitor) = registry.get(&call.tag) {
            trace!(tag = %call.tag, "filter.emit.extension");
            return visitor.visit(self, &call.receiver_and_args());
        }
        match call.receiver() {
            Some(receiver) if receiver.shape() == Shape::Collection => {
                self.visit_collection_call(call, receiver)
            }
            _ => self.visit_scalar_call(call),
        }
    }

    fn visit_collection_call(&mut self, call: &MethodCall, receiver: &Expr) -> Result<()> {
        let method = CollectionMethod::parse(&call.tag)
            .ok_or_else(|| FilterError::unsupported(call.tag.clone()))?;
        let rest = call.rest();
        if rest.len() > 1 {
            return Err(FilterError::malformed(format!(
                "{} takes at most one argument, got {}",
                call.tag,
                rest.len()
            )));
        }
        let argument = rest.first();

        let left = self.isolated(|emitter| emitter.visit(receiver))?;
        let right = match argument {
            Some(arg) => Some(self.isolated(|emitter| emitter.visit(arg))?),
            None => None,
        };
        let text = match (argument, right) {
            (Some(Expr::Lambda { param, .. }), Some(right)) => match method {
                CollectionMethod::Any => format!("size([{param} in {left} where {right}]) > 0"),
                CollectionMethod::Contains => {
                    return Err(FilterError::malformed(format!(
                        "{} expects a search value, not a lambda",
                        call.tag
                    )));
                }
                _ => method.apply(&format!("[{param} in {left} where {right}]")),
            },
            (Some(_), Some(right)) => match method {
                CollectionMethod::Contains => format!("{right} {}", method.apply(&left)),
                _ => {
                    return Err(FilterError::malformed(format!(
                        "{} expects a predicate lambda argument",
                        call.tag
                    )));
                }
            },
            _ => match method {
                CollectionMethod::Contains => {
                    return Err(FilterError::malformed(format!(
                        "{} requires a search value",
                        call.tag
                    )));
                }
                _ => method.apply(&left),
            },
        };
        self.append(&text);
        Ok(())
    }

    fn visit_scalar_call(&mut self, call: &MethodCall) -> Result<()> {
        let token = scalar_method_token(&call.tag)
            .ok_or_else(|| FilterError::unsupported(call.tag.clone()))?;
        let receiver = call
            .receiver()
            .ok_or_else(|| FilterError::malformed(format!("{} has no receiver", call.tag)))?;
        let rest = call.rest();
        if rest.is_empty() {
            return Err(FilterError::malformed(format!(
                "{} requires an argument",
                call.tag
            )));
        }
        self.visit(receiver)?;
        self.append(token);
        for arg in rest {
            self.visit(arg)?;
        }
        Ok(())
    }

    /// Runs `emit` against a fresh buffer and returns what it wrote, leaving
    /// the outer buffer untouched.
    fn isolated<F>(&mut self, emit: F) -> Result<String>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let saved = mem::take(&mut self.out);
        let outcome = emit(self);
        let captured = mem::replace(&mut self.out, saved);
        outcome.map(|()| captured)
    }
}

/// Dotted property path for a member chain rooted at a parameter.
fn parameter_path(node: &Expr) -> Option<String> {
    let mut names = Vec::new();
    let mut cursor = node;
    loop {
        match cursor {
            Expr::Member { target, member, .. } => {
                names.push(member.as_str());
                cursor = target;
            }
            Expr::Parameter(name) => {
                names.push(name.as_str());
                names.reverse();
                return Some(names.join("."));
            }
            _ => return None,
        }
    }
}
