//! Fluent construction of predicate trees.

use std::ops::Not;

use crate::error::{FilterError, Result};
use crate::query::ast::{BinaryOp, Expr, Predicate, UnaryOp};
use crate::query::functions::BETWEEN;
use crate::query::value::Value;

/// Parameter reference.
pub fn param(name: impl Into<String>) -> Expr {
    Expr::param(name)
}

/// Literal constant.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::constant(value)
}

/// List literal.
pub fn list<I, E>(items: I) -> Expr
where
    I: IntoIterator<Item = E>,
    E: Into<Expr>,
{
    Expr::list(items.into_iter().map(Into::into))
}

/// Static or extension-style call.
pub fn call(tag: impl Into<String>, args: Vec<Expr>) -> Expr {
    Expr::call(tag, args)
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Constant(value)
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::constant(value)
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Expr::constant(value)
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::constant(value)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::constant(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::constant(value)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::constant(value)
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::unary(UnaryOp::Not, self)
    }
}

impl Expr {
    /// Scalar field of this expression.
    pub fn field(self, name: impl Into<String>) -> Expr {
        Expr::member(self, name)
    }

    /// Collection-shaped field of this expression.
    pub fn items(self, name: impl Into<String>) -> Expr {
        Expr::collection(self, name)
    }

    fn cmp(self, op: BinaryOp, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(op, self, rhs.into())
    }

    /// `self = rhs`.
    pub fn eq(self, rhs: impl Into<Expr>) -> Expr {
        self.cmp(BinaryOp::Eq, rhs)
    }

    /// `self <> rhs`.
    pub fn ne(self, rhs: impl Into<Expr>) -> Expr {
        self.cmp(BinaryOp::Ne, rhs)
    }

    /// `self < rhs`.
    pub fn lt(self, rhs: impl Into<Expr>) -> Expr {
        self.cmp(BinaryOp::Lt, rhs)
    }

    /// `self <= rhs`.
    pub fn le(self, rhs: impl Into<Expr>) -> Expr {
        self.cmp(BinaryOp::Le, rhs)
    }

    /// `self > rhs`.
    pub fn gt(self, rhs: impl Into<Expr>) -> Expr {
        self.cmp(BinaryOp::Gt, rhs)
    }

    /// `self >= rhs`.
    pub fn ge(self, rhs: impl Into<Expr>) -> Expr {
        self.cmp(BinaryOp::Ge, rhs)
    }

    /// `self is null`.
    pub fn is_null(self) -> Expr {
        self.cmp(BinaryOp::Eq, Expr::null())
    }

    /// `self is not null`.
    pub fn is_not_null(self) -> Expr {
        self.cmp(BinaryOp::Ne, Expr::null())
    }

    /// Logical conjunction.
    pub fn and(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::And, self, rhs)
    }

    /// Logical disjunction.
    pub fn or(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Or, self, rhs)
    }

    fn quantified<F>(self, tag: &str, var: &str, body: F) -> Expr
    where
        F: FnOnce(Expr) -> Expr,
    {
        let lambda = Expr::lambda(var, body(Expr::param(var)));
        Expr::method(self, tag, vec![lambda])
    }

    /// True when some element bound to `var` satisfies `body`.
    pub fn any<F>(self, var: &str, body: F) -> Expr
    where
        F: FnOnce(Expr) -> Expr,
    {
        self.quantified("any", var, body)
    }

    /// Alias of [`Expr::any`].
    pub fn exists<F>(self, var: &str, body: F) -> Expr
    where
        F: FnOnce(Expr) -> Expr,
    {
        self.quantified("exists", var, body)
    }

    /// Number of elements.
    pub fn count(self) -> Expr {
        Expr::method(self, "count", Vec::new())
    }

    /// Number of elements bound to `var` that satisfy `body`.
    pub fn count_where<F>(self, var: &str, body: F) -> Expr
    where
        F: FnOnce(Expr) -> Expr,
    {
        self.quantified("count", var, body)
    }

    /// First element.
    pub fn first(self) -> Expr {
        Expr::method(self, "first", Vec::new())
    }

    /// Last element.
    pub fn last(self) -> Expr {
        Expr::method(self, "last", Vec::new())
    }

    /// Membership test on a collection, substring test on a string.
    pub fn contains(self, value: impl Into<Expr>) -> Expr {
        Expr::method(self, "contains", vec![value.into()])
    }

    /// `self Starts With prefix`.
    pub fn starts_with(self, prefix: impl Into<Expr>) -> Expr {
        Expr::method(self, "startsWith", vec![prefix.into()])
    }

    /// `self Ends With suffix`.
    pub fn ends_with(self, suffix: impl Into<Expr>) -> Expr {
        Expr::method(self, "endsWith", vec![suffix.into()])
    }

    /// `self = other` written as a method call.
    pub fn equals(self, other: impl Into<Expr>) -> Expr {
        Expr::method(self, "equals", vec![other.into()])
    }

    /// `self` between inclusive bounds; needs the `between` extension.
    pub fn between(self, low: impl Into<Expr>, high: impl Into<Expr>) -> Expr {
        Expr::call(BETWEEN, vec![self, low.into(), high.into()])
    }

    /// `self In [values]`.
    pub fn in_list<I, E>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        Expr::call("contains", vec![list(values), self])
    }
}

#[derive(Clone, Copy, Debug)]
enum GroupMode {
    And,
    Or,
}

/// Accumulates clauses over one subject and folds them with `and`/`or`.
pub struct PredicateBuilder {
    param: String,
    mode: GroupMode,
    exprs: Vec<Expr>,
    error: Option<FilterError>,
}

impl PredicateBuilder {
    /// Starts an `and`-joined predicate over `param`.
    pub fn new(param: impl Into<String>) -> Self {
        Self::with_mode(param.into(), GroupMode::And)
    }

    fn with_mode(param: String, mode: GroupMode) -> Self {
        Self {
            param,
            mode,
            exprs: Vec::new(),
            error: None,
        }
    }

    /// Subject parameter node.
    pub fn subject(&self) -> Expr {
        Expr::param(self.param.clone())
    }

    /// Adds a clause built from the subject.
    pub fn clause<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(Expr) -> Expr,
    {
        if self.error.is_none() {
            let expr = build(self.subject());
            self.exprs.push(expr);
        }
        self
    }

    /// Shorthand for `subject.field(prop) = value`.
    pub fn eq(&mut self, prop: &str, value: impl Into<Expr>) -> &mut Self {
        self.clause(|s| s.field(prop).eq(value))
    }

    /// Nests a group of clauses joined with `and`.
    pub fn and_group<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        self.group(GroupMode::And, false, build)
    }

    /// Nests a group of clauses joined with `or`.
    pub fn or_group<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        self.group(GroupMode::Or, false, build)
    }

    /// Nests a group of clauses joined with `and`, then negates it.
    pub fn not_group<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        self.group(GroupMode::And, true, build)
    }

    fn group<F>(&mut self, mode: GroupMode, negate: bool, build: F) -> &mut Self
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        if self.error.is_some() {
            return self;
        }
        let mut nested = PredicateBuilder::with_mode(self.param.clone(), mode);
        build(&mut nested);
        match nested.fold() {
            Ok(expr) if negate => self.exprs.push(!expr),
            Ok(expr) => self.exprs.push(expr),
            Err(err) => self.error = Some(err),
        }
        self
    }

    fn fold(self) -> Result<Expr> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mode = self.mode;
        self.exprs
            .into_iter()
            .reduce(|acc, next| match mode {
                GroupMode::And => acc.and(next),
                GroupMode::Or => acc.or(next),
            })
            .ok_or_else(|| FilterError::malformed("predicate group must contain at least one clause"))
    }

    /// Finishes the predicate.
    pub fn build(self) -> Result<Predicate> {
        let param = self.param.clone();
        Ok(Predicate::new(param, self.fold()?))
    }
}
