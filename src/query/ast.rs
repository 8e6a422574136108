//! Expression tree consumed by the query emitter.
//!
//! Trees are built once by a front end (the fluent builder, the DSL parser,
//! or host code) and are only ever read during translation.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::query::value::Value;

/// Opaque closed-over value. Its fields are only reachable through a
/// [`FieldResolver`](crate::query::resolve::FieldResolver).
#[derive(Clone)]
pub struct Captured {
    inner: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl Captured {
    /// Wraps a host value.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            inner: Arc::new(value),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Borrows the wrapped value as `T` if that is its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Type id of the wrapped value.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name of the wrapped value, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Captured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Captured({})", self.type_name)
    }
}

impl PartialEq for Captured {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Static shape of a member, used to route method calls.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Shape {
    /// Single value (including strings).
    #[default]
    Scalar,
    /// Sequence of values or nodes.
    Collection,
}

/// Unary operators a front end may produce. Only [`UnaryOp::Not`] translates.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    /// Logical negation.
    Not,
    /// Arithmetic negation.
    Negate,
    /// Type conversion.
    Convert,
}

/// Binary operators a front end may produce.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    /// Logical conjunction.
    And,
    /// Logical disjunction.
    Or,
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Arithmetic addition; not translatable.
    Add,
    /// Arithmetic subtraction; not translatable.
    Sub,
}

impl BinaryOp {
    /// Query-language token for the operator, if it has one.
    pub fn token(self) -> Option<&'static str> {
        match self {
            BinaryOp::And => Some("and"),
            BinaryOp::Or => Some("or"),
            BinaryOp::Eq => Some("="),
            BinaryOp::Ne => Some("<>"),
            BinaryOp::Lt => Some("<"),
            BinaryOp::Le => Some("<="),
            BinaryOp::Gt => Some(">"),
            BinaryOp::Ge => Some(">="),
            BinaryOp::Add | BinaryOp::Sub => None,
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnaryOp::Not => "not",
            UnaryOp::Negate => "negate",
            UnaryOp::Convert => "convert",
        };
        f.write_str(name)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Add => f.write_str("add"),
            BinaryOp::Sub => f.write_str("subtract"),
            other => f.write_str(other.token().unwrap_or("?")),
        }
    }
}

/// Method invocation. `target` is `None` for static and extension-style calls,
/// in which case the receiver (if any) is the first argument.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodCall {
    /// Instance receiver.
    pub target: Option<Box<Expr>>,
    /// Operation identifier used for dispatch.
    pub tag: String,
    /// Call arguments in source order.
    pub args: Vec<Expr>,
}

impl MethodCall {
    /// The receiver: explicit target, else the first argument.
    pub fn receiver(&self) -> Option<&Expr> {
        self.target.as_deref().or_else(|| self.args.first())
    }

    /// Arguments remaining after the receiver has been taken.
    pub fn rest(&self) -> &[Expr] {
        match self.target {
            Some(_) => &self.args,
            None => self.args.get(1..).unwrap_or(&[]),
        }
    }

    /// Receiver followed by the remaining arguments.
    pub fn receiver_and_args(&self) -> Vec<Expr> {
        match &self.target {
            Some(target) => std::iter::once(target.as_ref().clone())
                .chain(self.args.iter().cloned())
                .collect(),
            None => self.args.clone(),
        }
    }
}

/// Node of the predicate expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Bound variable, emitted verbatim.
    Parameter(String),
    /// Field read on `target`.
    Member {
        /// Object the field is read from.
        target: Box<Expr>,
        /// Field name.
        member: String,
        /// Declared shape of the field.
        shape: Shape,
    },
    /// Closed-over host value.
    Captured(Captured),
    /// Typed literal.
    Constant(Value),
    /// Unary operator application.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Binary operator application.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Method or function call.
    Call(MethodCall),
    /// Ordered list literal.
    List(Vec<Expr>),
    /// Single-parameter lambda, only meaningful as a quantifier argument.
    Lambda {
        /// Bound parameter name.
        param: String,
        /// Lambda body.
        body: Box<Expr>,
    },
}

impl Expr {
    /// Parameter reference.
    pub fn param(name: impl Into<String>) -> Self {
        Expr::Parameter(name.into())
    }

    /// Literal constant.
    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Constant(value.into())
    }

    /// The null literal.
    pub fn null() -> Self {
        Expr::Constant(Value::Null)
    }

    /// Captured host value.
    pub fn captured<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Expr::Captured(Captured::new(value))
    }

    /// Scalar member access on `target`.
    pub fn member(target: Expr, member: impl Into<String>) -> Self {
        Expr::Member {
            target: Box::new(target),
            member: member.into(),
            shape: Shape::Scalar,
        }
    }

    /// Collection-shaped member access on `target`.
    pub fn collection(target: Expr, member: impl Into<String>) -> Self {
        Expr::Member {
            target: Box::new(target),
            member: member.into(),
            shape: Shape::Collection,
        }
    }

    /// Unary operator node.
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Binary operator node.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Instance method call.
    pub fn method(target: Expr, tag: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call(MethodCall {
            target: Some(Box::new(target)),
            tag: tag.into(),
            args,
        })
    }

    /// Static or extension-style call with no explicit target.
    pub fn call(tag: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call(MethodCall {
            target: None,
            tag: tag.into(),
            args,
        })
    }

    /// List literal.
    pub fn list(elements: impl IntoIterator<Item = Expr>) -> Self {
        Expr::List(elements.into_iter().collect())
    }

    /// Lambda node.
    pub fn lambda(param: impl Into<String>, body: Expr) -> Self {
        Expr::Lambda {
            param: param.into(),
            body: Box::new(body),
        }
    }

    /// Static shape of the expression when used as a method receiver.
    pub fn shape(&self) -> Shape {
        match self {
            Expr::Member { shape, .. } => *shape,
            Expr::List(_) => Shape::Collection,
            _ => Shape::Scalar,
        }
    }

    /// Whether this node is the `null` literal.
    pub fn is_null_literal(&self) -> bool {
        matches!(self, Expr::Constant(Value::Null))
    }
}

/// Top-level predicate: a lambda over the filtered subject.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    /// Name bound to the subject, used as the query variable.
    pub param: String,
    /// Boolean body.
    pub body: Expr,
}

impl Predicate {
    /// Creates a predicate binding `param` over `body`.
    pub fn new(param: impl Into<String>, body: Expr) -> Self {
        Self {
            param: param.into(),
            body,
        }
    }

    /// Subject parameter node.
    pub fn subject(&self) -> Expr {
        Expr::Parameter(self.param.clone())
    }

    /// Converts the predicate into a lambda node.
    pub fn into_lambda(self) -> Expr {
        Expr::lambda(self.param, self.body)
    }
}
