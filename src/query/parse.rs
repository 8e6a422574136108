//! Text front end for predicate trees.
//!
//! Accepts a small lambda-style language:
//!
//! ```text
//! p => p.firstName == "yaser" && p.addresses.any(a => a.city == p.lastName)
//! ```
//!
//! Operators are `&& || ! == != < <= > >=`. Literals are strings in single or
//! double quotes, integers, floats, `true`, `false`, `null`, enum tags written
//! `Type::Tag`, and `date(y, m, d[, h, mi, s])`. `$name` reads a captured
//! variable, `x.m(args)` is a method call and `f(args)` a static call.

use rustc_hash::FxHashSet;
use thiserror::Error;
use time::{Date, Month, PrimitiveDateTime, Time};

use crate::query::ast::{BinaryOp, Captured, Expr, Predicate, Shape, UnaryOp};
use crate::query::value::Value;

/// Errors raised while parsing predicate text. Offsets are byte positions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Character that starts no token.
    #[error("unexpected character '{ch}' at {offset}")]
    UnexpectedChar {
        /// Offending character.
        ch: char,
        /// Byte offset.
        offset: usize,
    },
    /// String literal without its closing quote.
    #[error("unterminated string starting at {offset}")]
    UnterminatedString {
        /// Byte offset of the opening quote.
        offset: usize,
    },
    /// Numeric literal that does not fit its type.
    #[error("invalid number '{text}' at {offset}")]
    InvalidNumber {
        /// Literal text.
        text: String,
        /// Byte offset.
        offset: usize,
    },
    /// Token that does not fit the grammar at this point.
    #[error("expected {expected} at {offset}, found {found}")]
    UnexpectedToken {
        /// What the parser was looking for.
        expected: &'static str,
        /// Description of what it found.
        found: String,
        /// Byte offset.
        offset: usize,
    },
    /// Identifier that is not a bound lambda parameter.
    #[error("unknown identifier '{name}' at {offset}")]
    UnknownIdentifier {
        /// Identifier text.
        name: String,
        /// Byte offset.
        offset: usize,
    },
    /// `$name` used without a capture environment.
    #[error("captured variable '${name}' at {offset} but no captures are configured")]
    NoCaptures {
        /// Variable name.
        name: String,
        /// Byte offset.
        offset: usize,
    },
    /// Parentheses, brackets, call arguments or `!` nested past
    /// [`MAX_NESTING`] levels.
    #[error("expression nests deeper than {limit} levels at {offset}")]
    TooDeep {
        /// Nesting limit that was exceeded.
        limit: usize,
        /// Byte offset.
        offset: usize,
    },
    /// `date(...)` with wrong arity or out-of-range parts.
    #[error("invalid date literal at {offset}: {detail}")]
    InvalidDate {
        /// Byte offset.
        offset: usize,
        /// What was wrong.
        detail: String,
    },
}

impl ParseError {
    /// Byte offset the error refers to.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::UnexpectedChar { offset, .. }
            | ParseError::UnterminatedString { offset }
            | ParseError::InvalidNumber { offset, .. }
            | ParseError::UnexpectedToken { offset, .. }
            | ParseError::UnknownIdentifier { offset, .. }
            | ParseError::NoCaptures { offset, .. }
            | ParseError::TooDeep { offset, .. }
            | ParseError::InvalidDate { offset, .. } => *offset,
        }
    }
}

/// Deepest sub-expression nesting the parser accepts.
pub const MAX_NESTING: usize = 64;

/// Context the parser needs that the text cannot carry.
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Subject name bound when the text has no `x =>` prefix.
    pub default_param: String,
    /// Member names whose shape is a collection.
    pub collections: FxHashSet<String>,
    /// Environment that `$name` paths are read from.
    pub captures: Option<Captured>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            default_param: "p".to_owned(),
            collections: FxHashSet::default(),
            captures: None,
        }
    }
}

impl ParseOptions {
    /// Marks `member` as collection-shaped.
    pub fn with_collection(mut self, member: impl Into<String>) -> Self {
        self.collections.insert(member.into());
        self
    }

    /// Sets the capture environment.
    pub fn with_captures(mut self, captures: Captured) -> Self {
        self.captures = Some(captures);
        self
    }

    /// Sets the implicit subject name.
    pub fn with_default_param(mut self, name: impl Into<String>) -> Self {
        self.default_param = name.into();
        self
    }
}

/// Parses predicate text into a [`Predicate`].
pub fn parse_predicate(src: &str, options: &ParseOptions) -> Result<Predicate, ParseError> {
    let tokens = lex(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        scopes: Vec::new(),
        options,
    };
    parser.predicate()
}

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Dollar,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Arrow,
    AndAnd,
    OrOr,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    PathSep,
    Minus,
    Eof,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Ident(name) => format!("identifier '{name}'"),
            Tok::Str(_) => "string literal".to_owned(),
            Tok::Int(_) | Tok::Float(_) => "number".to_owned(),
            Tok::Eof => "end of input".to_owned(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Tok::Dollar => "$",
            Tok::Dot => ".",
            Tok::Comma => ",",
            Tok::LParen => "(",
            Tok::RParen => ")",
            Tok::LBracket => "[",
            Tok::RBracket => "]",
            Tok::Arrow => "=>",
            Tok::AndAnd => "&&",
            Tok::OrOr => "||",
            Tok::Bang => "!",
            Tok::EqEq => "==",
            Tok::NotEq => "!=",
            Tok::Lt => "<",
            Tok::Le => "<=",
            Tok::Gt => ">",
            Tok::Ge => ">=",
            Tok::PathSep => "::",
            Tok::Minus => "-",
            _ => "?",
        }
    }
}

#[derive(Clone, Debug)]
struct Token {
    tok: Tok,
    offset: usize,
}

fn lex(src: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();
    while let Some(&(offset, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        let two = src.get(offset..offset + 2).unwrap_or("");
        let pair = match two {
            "=>" => Some(Tok::Arrow),
            "&&" => Some(Tok::AndAnd),
            "||" => Some(Tok::OrOr),
            "==" => Some(Tok::EqEq),
            "!=" => Some(Tok::NotEq),
            "<=" => Some(Tok::Le),
            ">=" => Some(Tok::Ge),
            "::" => Some(Tok::PathSep),
            _ => None,
        };
        if let Some(tok) = pair {
            chars.next();
            chars.next();
            tokens.push(Token { tok, offset });
            continue;
        }
        let single = match ch {
            '$' => Some(Tok::Dollar),
            '.' => Some(Tok::Dot),
            ',' => Some(Tok::Comma),
            '(' => Some(Tok::LParen),
            ')' => Some(Tok::RParen),
            '[' => Some(Tok::LBracket),
            ']' => Some(Tok::RBracket),
            '!' => Some(Tok::Bang),
            '<' => Some(Tok::Lt),
            '>' => Some(Tok::Gt),
            '-' => Some(Tok::Minus),
            _ => None,
        };
        if let Some(tok) = single {
            chars.next();
            tokens.push(Token { tok, offset });
            continue;
        }
        if ch == '"' || ch == '\'' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            for (_, c) in chars.by_ref() {
                if c == ch {
                    closed = true;
                    break;
                }
                text.push(c);
            }
            if !closed {
                return Err(ParseError::UnterminatedString { offset });
            }
            tokens.push(Token {
                tok: Tok::Str(text),
                offset,
            });
            continue;
        }
        if ch.is_ascii_digit() {
            let mut end = offset;
            let mut is_float = false;
            while let Some(&(idx, c)) = chars.peek() {
                let fraction_dot = c == '.'
                    && !is_float
                    && src[idx + 1..].starts_with(|n: char| n.is_ascii_digit());
                if c.is_ascii_digit() || fraction_dot {
                    is_float |= fraction_dot;
                    end = idx + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &src[offset..end];
            let invalid = || ParseError::InvalidNumber {
                text: text.to_owned(),
                offset,
            };
            let tok = if is_float {
                Tok::Float(text.parse().map_err(|_| invalid())?)
            } else {
                Tok::Int(text.parse().map_err(|_| invalid())?)
            };
            tokens.push(Token { tok, offset });
            continue;
        }
        if ch.is_alphabetic() || ch == '_' {
            let mut end = offset;
            while let Some(&(idx, c)) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    end = idx + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token {
                tok: Tok::Ident(src[offset..end].to_owned()),
                offset,
            });
            continue;
        }
        return Err(ParseError::UnexpectedChar { ch, offset });
    }
    tokens.push(Token {
        tok: Tok::Eof,
        offset: src.len(),
    });
    Ok(tokens)
}

struct Parser<'o> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    scopes: Vec<String>,
    options: &'o ParseOptions,
}

impl Parser<'_> {
    fn peek(&self) -> &Tok {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &Tok {
        let idx = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[idx].tok
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].offset
    }

    fn bump(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == tok {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Tok, expected: &'static str) -> Result<(), ParseError> {
        if self.eat(&tok) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::UnexpectedToken {
            expected,
            found: self.peek().describe(),
            offset: self.offset(),
        }
    }

    fn ident(&mut self, expected: &'static str) -> Result<String, ParseError> {
        match self.peek().clone() {
            Tok::Ident(name) => {
                self.bump();
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn predicate(&mut self) -> Result<Predicate, ParseError> {
        let param = match self.peek().clone() {
            Tok::Ident(name) if *self.peek_at(1) == Tok::Arrow => {
                self.bump();
                self.bump();
                name
            }
            _ => self.options.default_param.clone(),
        };
        self.scopes.push(param.clone());
        let body = self.or()?;
        self.scopes.pop();
        if *self.peek() != Tok::Eof {
            return Err(self.unexpected("end of input"));
        }
        Ok(Predicate::new(param, body))
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::TooDeep {
                limit: MAX_NESTING,
                offset: self.offset(),
            });
        }
        self.depth += 1;
        let outcome = parse(self);
        self.depth -= 1;
        outcome
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::or_chain)
    }

    fn or_chain(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.and()?;
        while self.eat(&Tok::OrOr) {
            expr = Expr::binary(BinaryOp::Or, expr, self.and()?);
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.comparison()?;
        while self.eat(&Tok::AndAnd) {
            expr = Expr::binary(BinaryOp::And, expr, self.comparison()?);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.unary()?;
        let op = match self.peek() {
            Tok::EqEq => BinaryOp::Eq,
            Tok::NotEq => BinaryOp::Ne,
            Tok::Lt => BinaryOp::Lt,
            Tok::Le => BinaryOp::Le,
            Tok::Gt => BinaryOp::Gt,
            Tok::Ge => BinaryOp::Ge,
            _ => return Ok(left),
        };
        self.bump();
        let right = self.unary()?;
        Ok(Expr::binary(op, left, right))
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Tok::Bang) {
            let operand = self.nested(Self::unary)?;
            return Ok(Expr::unary(UnaryOp::Not, operand));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        while self.eat(&Tok::Dot) {
            let name = self.ident("member name")?;
            if *self.peek() == Tok::LParen {
                let args = self.args()?;
                expr = Expr::method(expr, name, args);
            } else {
                expr = self.member(expr, name);
            }
        }
        Ok(expr)
    }

    fn member(&self, target: Expr, name: String) -> Expr {
        let shape = if self.options.collections.contains(&name) {
            Shape::Collection
        } else {
            Shape::Scalar
        };
        Expr::Member {
            target: Box::new(target),
            member: name,
            shape,
        }
    }

    fn args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(Tok::LParen, "'('")?;
        let mut args = Vec::new();
        if self.eat(&Tok::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.arg()?);
            if self.eat(&Tok::Comma) {
                continue;
            }
            self.expect(Tok::RParen, "',' or ')'")?;
            return Ok(args);
        }
    }

    fn arg(&mut self) -> Result<Expr, ParseError> {
        if let Tok::Ident(name) = self.peek().clone() {
            if *self.peek_at(1) != Tok::Arrow {
                return self.or();
            }
            self.bump();
            self.bump();
            self.scopes.push(name.clone());
            let body = self.or();
            self.scopes.pop();
            return Ok(Expr::lambda(name, body?));
        }
        self.or()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let offset = self.offset();
        match self.bump() {
            Tok::Str(text) => Ok(Expr::constant(text)),
            Tok::Int(value) => Ok(Expr::constant(value)),
            Tok::Float(value) => Ok(Expr::constant(value)),
            Tok::Minus => match self.bump() {
                Tok::Int(value) => Ok(Expr::constant(-value)),
                Tok::Float(value) => Ok(Expr::constant(-value)),
                other => Err(ParseError::UnexpectedToken {
                    expected: "number after '-'",
                    found: other.describe(),
                    offset,
                }),
            },
            Tok::LParen => {
                let inner = self.or()?;
                self.expect(Tok::RParen, "')'")?;
                Ok(inner)
            }
            Tok::LBracket => {
                let mut items = Vec::new();
                if !self.eat(&Tok::RBracket) {
                    loop {
                        items.push(self.or()?);
                        if self.eat(&Tok::Comma) {
                            continue;
                        }
                        self.expect(Tok::RBracket, "',' or ']'")?;
                        break;
                    }
                }
                Ok(Expr::List(items))
            }
            Tok::Dollar => {
                let name = self.ident("captured variable name")?;
                match &self.options.captures {
                    Some(env) => Ok(self.member(Expr::Captured(env.clone()), name)),
                    None => Err(ParseError::NoCaptures { name, offset }),
                }
            }
            Tok::Ident(name) => self.identifier(name, offset),
            other => Err(ParseError::UnexpectedToken {
                expected: "expression",
                found: other.describe(),
                offset,
            }),
        }
    }

    fn identifier(&mut self, name: String, offset: usize) -> Result<Expr, ParseError> {
        match name.as_str() {
            "true" => return Ok(Expr::constant(true)),
            "false" => return Ok(Expr::constant(false)),
            "null" => return Ok(Expr::null()),
            _ => {}
        }
        if self.eat(&Tok::PathSep) {
            let tag = self.ident("enum tag")?;
            return Ok(Expr::Constant(Value::Enum(tag)));
        }
        if *self.peek() == Tok::LParen {
            let args = self.args()?;
            if name == "date" {
                return date_literal(&args, offset);
            }
            return Ok(Expr::call(name, args));
        }
        if self.scopes.iter().any(|bound| *bound == name) {
            return Ok(Expr::Parameter(name));
        }
        Err(ParseError::UnknownIdentifier { name, offset })
    }
}

fn date_literal(args: &[Expr], offset: usize) -> Result<Expr, ParseError> {
    let invalid = |detail: String| ParseError::InvalidDate { offset, detail };
    if args.len() != 3 && args.len() != 6 {
        return Err(invalid(format!("expected 3 or 6 parts, got {}", args.len())));
    }
    let mut parts = [0_i64; 6];
    for (slot, arg) in parts.iter_mut().zip(args) {
        match arg {
            Expr::Constant(Value::Int(value)) => *slot = *value,
            _ => return Err(invalid("parts must be integer literals".to_owned())),
        }
    }
    let [year, month, day, hour, minute, second] = parts;
    let narrow = |value: i64| u8::try_from(value).map_err(|_| invalid(format!("{value} is out of range")));
    let year = i32::try_from(year).map_err(|_| invalid(format!("year {year} is out of range")))?;
    let month = Month::try_from(narrow(month)?).map_err(|err| invalid(err.to_string()))?;
    let date = Date::from_calendar_date(year, month, narrow(day)?)
        .map_err(|err| invalid(err.to_string()))?;
    let time = Time::from_hms(narrow(hour)?, narrow(minute)?, narrow(second)?)
        .map_err(|err| invalid(err.to_string()))?;
    Ok(Expr::Constant(Value::DateTime(PrimitiveDateTime::new(
        date, time,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::builder::param;
    use serde_json::json;
    use time::macros::datetime;

    fn options() -> ParseOptions {
        ParseOptions::default().with_collection("addresses")
    }

    fn parse(src: &str) -> Result<Predicate, ParseError> {
        parse_predicate(src, &options())
    }

    #[test]
    fn parses_explicit_lambda() {
        let predicate = parse("x => x.grade >= 3").unwrap();
        assert_eq!(predicate.param, "x");
        assert_eq!(predicate.body, param("x").field("grade").ge(3_i64));
    }

    #[test]
    fn implicit_subject_uses_default_param() {
        let predicate = parse("p.firstName == 'yaser'").unwrap();
        assert_eq!(predicate.param, "p");
        assert_eq!(predicate.body, param("p").field("firstName").eq("yaser"));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let predicate = parse("p.a == 1 || p.b == 2 && p.c == 3").unwrap();
        let expected = param("p").field("a").eq(1_i64).or(param("p")
            .field("b")
            .eq(2_i64)
            .and(param("p").field("c").eq(3_i64)));
        assert_eq!(predicate.body, expected);
    }

    #[test]
    fn quantifier_lambda_binds_its_parameter() {
        let predicate = parse("p.addresses.any(a => a.city == p.lastName)").unwrap();
        let expected = param("p")
            .items("addresses")
            .any("a", |a| a.field("city").eq(param("p").field("lastName")));
        assert_eq!(predicate.body, expected);
    }

    #[test]
    fn lambda_parameter_is_out_of_scope_afterwards() {
        let err = parse("p.addresses.any(a => a.city == 'x') && a.zip == 1").unwrap_err();
        assert!(matches!(err, ParseError::UnknownIdentifier { ref name, .. } if name == "a"));
    }

    #[test]
    fn literals() {
        let predicate = parse("p.x == -2.5 && p.y != null && p.z == Grade::Gold && !p.ok").unwrap();
        let expected = param("p")
            .field("x")
            .eq(-2.5)
            .and(param("p").field("y").is_not_null())
            .and(param("p").field("z").eq(Value::enum_tag("Gold")))
            .and(!param("p").field("ok"));
        assert_eq!(predicate.body, expected);
    }

    #[test]
    fn static_calls_and_lists() {
        let predicate = parse("between(p.grade, 1, 5) || contains([1, 2], p.grade)").unwrap();
        let expected = Expr::call("between", vec![
            param("p").field("grade"),
            Expr::constant(1_i64),
            Expr::constant(5_i64),
        ])
        .or(Expr::call("contains", vec![
            Expr::list([Expr::constant(1_i64), Expr::constant(2_i64)]),
            param("p").field("grade"),
        ]));
        assert_eq!(predicate.body, expected);
    }

    #[test]
    fn date_constructor_builds_date_time_constant() {
        let predicate = parse("p.birthDate < date(2000, 1, 2)").unwrap();
        assert_eq!(
            predicate.body,
            param("p")
                .field("birthDate")
                .lt(Value::DateTime(datetime!(2000-01-02 0:00)))
        );
        assert!(matches!(
            parse("p.birthDate < date(2000, 13, 2)"),
            Err(ParseError::InvalidDate { .. })
        ));
    }

    #[test]
    fn captured_variables_read_from_environment() {
        let env = Captured::new(json!({"user": {"id": 4}}));
        let options = ParseOptions::default().with_captures(env.clone());
        let predicate = parse_predicate("p.userId == $user.id", &options).unwrap();
        let expected = param("p")
            .field("userId")
            .eq(Expr::member(Expr::member(Expr::Captured(env), "user"), "id"));
        assert_eq!(predicate.body, expected);
    }

    #[test]
    fn captured_variable_without_environment_fails() {
        assert!(matches!(
            parse("p.userId == $user.id"),
            Err(ParseError::NoCaptures { .. })
        ));
    }

    #[test]
    fn reports_offsets() {
        let err = parse("p.a == 'open").unwrap_err();
        assert_eq!(err, ParseError::UnterminatedString { offset: 7 });
        let err = parse("p.a == #").unwrap_err();
        assert_eq!(err.offset(), 7);
        let err = parse("p.a == 1 )").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { offset: 9, .. }));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let parens = format!("{}p.a == 1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(
            parse(&parens),
            Err(ParseError::TooDeep { limit: MAX_NESTING, .. })
        ));
        let bangs = format!("{}p.ok", "!".repeat(10_000));
        assert!(matches!(parse(&bangs), Err(ParseError::TooDeep { .. })));
        let calls = format!("{}1{}", "f(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(parse(&calls), Err(ParseError::TooDeep { .. })));
    }

    #[test]
    fn moderate_nesting_is_accepted() {
        let parens = format!("{}p.a == 1{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(parse(&parens).unwrap().body, param("p").field("a").eq(1_i64));
        let bangs = format!("{}p.ok", "!".repeat(40));
        assert!(parse(&bangs).is_ok());
    }
}
