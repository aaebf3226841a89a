//! Whitelisted expression language for transition rule predicates.
//!
//! Rule conditions are admin-authored text, so they are never handed to a
//! general-purpose evaluator. Instead they are parsed into a small AST of
//! comparisons, boolean combinators, field references and date helpers, and
//! interpreted against a read-only view of one member.
//!
//! ```text
//! member.age < 18 and member.state == 'active'
//! years_since(member.birthdate_date) >= 65 or member.days_in_state > 90
//! today >= date("2027-01-01")
//! ```

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("cannot {op} values of these types")]
    TypeMismatch { op: &'static str },

    #[error("invalid date literal '{0}'")]
    InvalidDate(String),

    #[error("condition did not evaluate to a boolean")]
    NotABoolean,
}

/// Runtime value of the expression language.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Str(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Str(s) => write!(f, "'{s}'"),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
        }
    }
}

/// Variable resolution surface the evaluator sees. Implementations expose a
/// member's visible attributes by dotted path (e.g. `member.age`).
pub trait Scope {
    fn lookup(&self, path: &str) -> Option<Value>;
}

/// A scope backed by a closure, convenient for tests.
pub struct FnScope<F: Fn(&str) -> Option<Value>>(pub F);

impl<F: Fn(&str) -> Option<Value>> Scope for FnScope<F> {
    fn lookup(&self, path: &str) -> Option<Value> {
        (self.0)(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Add,
    Sub,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path(String),
    Call(String, Vec<Expr>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse an expression from source text.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let tokens = lex(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expression()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(ParseError::UnexpectedToken(format!("{tok:?}"))),
        }
    }

    /// Evaluate against a scope, with `now` supplied by the caller.
    pub fn eval(&self, scope: &dyn Scope, now: DateTime<Utc>) -> Result<Value, EvalError> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Path(path) => match path.as_str() {
                "now" => Ok(Value::DateTime(now)),
                "today" => Ok(Value::Date(now.date_naive())),
                other => scope
                    .lookup(other)
                    .ok_or_else(|| EvalError::UnknownIdentifier(other.to_string())),
            },
            Expr::Call(name, args) => eval_call(name, args, scope, now),
            Expr::Not(inner) => match inner.eval(scope, now)? {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                _ => Err(EvalError::TypeMismatch { op: "negate" }),
            },
            Expr::Neg(inner) => match inner.eval(scope, now)? {
                Value::Int(i) => Ok(Value::Int(-i)),
                Value::Decimal(d) => Ok(Value::Decimal(-d)),
                _ => Err(EvalError::TypeMismatch { op: "negate" }),
            },
            Expr::Binary(op, left, right) => eval_binary(*op, left, right, scope, now),
        }
    }

    /// Evaluate expecting a boolean result.
    pub fn eval_bool(&self, scope: &dyn Scope, now: DateTime<Utc>) -> Result<bool, EvalError> {
        match self.eval(scope, now)? {
            Value::Bool(b) => Ok(b),
            _ => Err(EvalError::NotABoolean),
        }
    }

    /// Evaluate expecting an instant; dates coerce to midnight UTC.
    pub fn eval_instant(
        &self,
        scope: &dyn Scope,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, EvalError> {
        match self.eval(scope, now)? {
            Value::DateTime(dt) => Ok(dt),
            Value::Date(d) => Ok(midnight(d)),
            _ => Err(EvalError::TypeMismatch { op: "use as instant" }),
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is a valid time"))
}

fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    scope: &dyn Scope,
    now: DateTime<Utc>,
) -> Result<Value, EvalError> {
    // short-circuit boolean combinators
    match op {
        BinaryOp::And => {
            return match left.eval(scope, now)? {
                Value::Bool(false) => Ok(Value::Bool(false)),
                Value::Bool(true) => match right.eval(scope, now)? {
                    Value::Bool(b) => Ok(Value::Bool(b)),
                    _ => Err(EvalError::TypeMismatch { op: "combine with 'and'" }),
                },
                _ => Err(EvalError::TypeMismatch { op: "combine with 'and'" }),
            };
        }
        BinaryOp::Or => {
            return match left.eval(scope, now)? {
                Value::Bool(true) => Ok(Value::Bool(true)),
                Value::Bool(false) => match right.eval(scope, now)? {
                    Value::Bool(b) => Ok(Value::Bool(b)),
                    _ => Err(EvalError::TypeMismatch { op: "combine with 'or'" }),
                },
                _ => Err(EvalError::TypeMismatch { op: "combine with 'or'" }),
            };
        }
        _ => {}
    }

    let lhs = left.eval(scope, now)?;
    let rhs = right.eval(scope, now)?;

    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&lhs, &rhs)?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                BinaryOp::Ge => ordering != Ordering::Less,
                _ => unreachable!(),
            }))
        }
        BinaryOp::Add | BinaryOp::Sub => arithmetic(op, lhs, rhs),
        BinaryOp::And | BinaryOp::Or => unreachable!(),
    }
}

/// Equality is lenient: comparable types coerce, incomparable types are
/// simply not equal.
fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => true,
        _ => compare(lhs, rhs).map(|o| o == Ordering::Equal).unwrap_or(false),
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Result<Ordering, EvalError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Decimal(a), Value::Decimal(b)) => Ok(a.cmp(b)),
        (Value::Int(a), Value::Decimal(b)) => Ok(Decimal::from(*a).cmp(b)),
        (Value::Decimal(a), Value::Int(b)) => Ok(a.cmp(&Decimal::from(*b))),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Ok(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Ok(a.cmp(b)),
        (Value::Date(a), Value::DateTime(b)) => Ok(midnight(*a).cmp(b)),
        (Value::DateTime(a), Value::Date(b)) => Ok(a.cmp(&midnight(*b))),
        _ => Err(EvalError::TypeMismatch { op: "compare" }),
    }
}

fn arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
        (BinaryOp::Sub, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
        (BinaryOp::Add, Value::Decimal(a), Value::Decimal(b)) => Ok(Value::Decimal(a + b)),
        (BinaryOp::Sub, Value::Decimal(a), Value::Decimal(b)) => Ok(Value::Decimal(a - b)),
        (BinaryOp::Add, Value::Int(a), Value::Decimal(b)) => Ok(Value::Decimal(Decimal::from(a) + b)),
        (BinaryOp::Add, Value::Decimal(a), Value::Int(b)) => Ok(Value::Decimal(a + Decimal::from(b))),
        (BinaryOp::Sub, Value::Int(a), Value::Decimal(b)) => Ok(Value::Decimal(Decimal::from(a) - b)),
        (BinaryOp::Sub, Value::Decimal(a), Value::Int(b)) => Ok(Value::Decimal(a - Decimal::from(b))),
        // date difference in whole days
        (BinaryOp::Sub, Value::Date(a), Value::Date(b)) => Ok(Value::Int((a - b).num_days())),
        (BinaryOp::Sub, Value::DateTime(a), Value::DateTime(b)) => {
            Ok(Value::Int((a - b).num_days()))
        }
        _ => Err(EvalError::TypeMismatch { op: "add/subtract" }),
    }
}

fn eval_call(
    name: &str,
    args: &[Expr],
    scope: &dyn Scope,
    now: DateTime<Utc>,
) -> Result<Value, EvalError> {
    let expect_one = |args: &[Expr]| -> Result<(), EvalError> {
        if args.len() != 1 {
            return Err(EvalError::Arity {
                name: name.to_string(),
                expected: 1,
                got: args.len(),
            });
        }
        Ok(())
    };

    match name {
        "date" => {
            expect_one(args)?;
            match args[0].eval(scope, now)? {
                Value::Str(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map(Value::Date)
                    .map_err(|_| EvalError::InvalidDate(s)),
                other => Err(EvalError::InvalidDate(other.to_string())),
            }
        }
        "days_since" => {
            expect_one(args)?;
            match args[0].eval(scope, now)? {
                Value::Date(d) => Ok(Value::Int((now.date_naive() - d).num_days())),
                Value::DateTime(dt) => Ok(Value::Int((now - dt).num_days())),
                _ => Err(EvalError::TypeMismatch { op: "take days_since of" }),
            }
        }
        "years_since" => {
            expect_one(args)?;
            match args[0].eval(scope, now)? {
                Value::Date(d) => Ok(Value::Int(
                    now.date_naive().years_since(d).map(i64::from).unwrap_or(0),
                )),
                Value::DateTime(dt) => Ok(Value::Int(
                    now.date_naive()
                        .years_since(dt.date_naive())
                        .map(i64::from)
                        .unwrap_or(0),
                )),
                _ => Err(EvalError::TypeMismatch { op: "take years_since of" }),
            }
        }
        other => Err(EvalError::UnknownFunction(other.to_string())),
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Decimal(Decimal),
    Str(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    True,
    False,
    Null,
}

fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Eq);
                    i += 2;
                } else {
                    return Err(ParseError::UnexpectedChar('=', i));
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    return Err(ParseError::UnexpectedChar('!', i));
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '\'' | '"' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            value.push(ch);
                            i += 1;
                        }
                        None => return Err(ParseError::UnterminatedString),
                    }
                }
                tokens.push(Token::Str(value));
            }
            '0'..='9' => {
                let start = i;
                let mut is_decimal = false;
                while let Some(&ch) = chars.get(i) {
                    if ch.is_ascii_digit() {
                        i += 1;
                    } else if ch == '.' && !is_decimal
                        && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
                    {
                        is_decimal = true;
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                if is_decimal {
                    let value = text
                        .parse::<Decimal>()
                        .map_err(|_| ParseError::InvalidNumber(text.clone()))?;
                    tokens.push(Token::Decimal(value));
                } else {
                    let value = text
                        .parse::<i64>()
                        .map_err(|_| ParseError::InvalidNumber(text.clone()))?;
                    tokens.push(Token::Int(value));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while let Some(&ch) = chars.get(i) {
                    if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    _ => Token::Ident(word),
                });
            }
            other => return Err(ParseError::UnexpectedChar(other, i)),
        }
    }

    Ok(tokens)
}

// ============================================================================
// Parser (recursive descent, precedence: or < and < not < cmp < add)
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        match self.next() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(ParseError::UnexpectedToken(format!("{tok:?}"))),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            let right = self.and_expr()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.not_expr()?;
        while self.peek() == Some(&Token::And) {
            self.next();
            let right = self.not_expr()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == Some(&Token::Not) {
            self.next();
            let inner = self.not_expr()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => Some(BinaryOp::Eq),
            Some(Token::Ne) => Some(BinaryOp::Ne),
            Some(Token::Lt) => Some(BinaryOp::Lt),
            Some(Token::Le) => Some(BinaryOp::Le),
            Some(Token::Gt) => Some(BinaryOp::Gt),
            Some(Token::Ge) => Some(BinaryOp::Ge),
            _ => None,
        };
        match op {
            Some(op) => {
                self.next();
                let right = self.additive()?;
                Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
            }
            None => Ok(left),
        }
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.primary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.next();
            let right = self.primary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            Some(Token::Int(i)) => Ok(Expr::Literal(Value::Int(i))),
            Some(Token::Decimal(d)) => Ok(Expr::Literal(Value::Decimal(d))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Minus) => {
                let inner = self.primary()?;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Some(Token::LParen) => {
                let expr = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.next();
                    let mut args = Vec::new();
                    if self.peek() != Some(&Token::RParen) {
                        loop {
                            args.push(self.expression()?);
                            if self.peek() == Some(&Token::Comma) {
                                self.next();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(Token::RParen)?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Path(name))
                }
            }
            Some(tok) => Err(ParseError::UnexpectedToken(format!("{tok:?}"))),
            None => Err(ParseError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap()
    }

    fn scope() -> impl Scope {
        FnScope(|path: &str| match path {
            "member.age" => Some(Value::Int(17)),
            "member.state" => Some(Value::Str("active".to_string())),
            "member.birthdate_date" => {
                Some(Value::Date(NaiveDate::from_ymd_opt(2009, 1, 15).unwrap()))
            }
            "member.fee" => Some(Value::Decimal(Decimal::new(2550, 2))),
            "member.email" => Some(Value::Null),
            _ => None,
        })
    }

    fn eval_bool(src: &str) -> bool {
        Expr::parse(src).unwrap().eval_bool(&scope(), now()).unwrap()
    }

    #[test]
    fn comparisons() {
        assert!(eval_bool("member.age < 18"));
        assert!(eval_bool("member.age >= 17"));
        assert!(!eval_bool("member.age > 17"));
        assert!(eval_bool("member.state == 'active'"));
        assert!(eval_bool("member.state != \"blocked\""));
    }

    #[test]
    fn boolean_combinators_and_precedence() {
        assert!(eval_bool("member.age < 18 and member.state == 'active'"));
        assert!(eval_bool("member.age > 99 or member.state == 'active'"));
        assert!(eval_bool("not member.age > 99"));
        // and binds tighter than or
        assert!(eval_bool("member.age > 99 and false or true"));
    }

    #[test]
    fn arithmetic_and_unary_minus() {
        assert!(eval_bool("member.age + 1 == 18"));
        assert!(eval_bool("member.age - 20 == -3"));
        assert!(eval_bool("member.fee > 25"));
        assert!(eval_bool("member.fee == 25.50"));
    }

    #[test]
    fn date_helpers() {
        assert!(eval_bool("years_since(member.birthdate_date) == 17"));
        assert!(eval_bool("member.birthdate_date < date('2010-01-01')"));
        assert!(eval_bool("today == date('2026-08-06')"));
        assert!(eval_bool("days_since(member.birthdate_date) > 6000"));
        assert!(eval_bool("today - member.birthdate_date > 6000"));
        assert!(eval_bool("now > date('2026-08-05')"));
    }

    #[test]
    fn null_semantics() {
        assert!(eval_bool("member.email == null"));
        assert!(!eval_bool("member.email == 'x'"));
        assert!(eval_bool("member.email != 'x'"));
    }

    #[test]
    fn unknown_identifier_errors() {
        let err = Expr::parse("member.nope == 1")
            .unwrap()
            .eval_bool(&scope(), now())
            .unwrap_err();
        assert!(matches!(err, EvalError::UnknownIdentifier(_)));
    }

    #[test]
    fn non_boolean_condition_errors() {
        let err = Expr::parse("member.age + 1")
            .unwrap()
            .eval_bool(&scope(), now())
            .unwrap_err();
        assert_eq!(err, EvalError::NotABoolean);
    }

    #[test]
    fn parse_errors() {
        assert!(Expr::parse("member.age <").is_err());
        assert!(Expr::parse("member.age = 18").is_err());
        assert!(Expr::parse("'unterminated").is_err());
        assert!(Expr::parse("member.age ; 1").is_err());
        assert!(Expr::parse("(member.age > 1").is_err());
    }

    #[test]
    fn eval_instant_coerces_dates() {
        let instant = Expr::parse("date('2026-01-01')")
            .unwrap()
            .eval_instant(&scope(), now())
            .unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn arity_is_checked() {
        let err = Expr::parse("date('2026-01-01', 'x')")
            .unwrap()
            .eval(&scope(), now())
            .unwrap_err();
        assert!(matches!(err, EvalError::Arity { .. }));
    }
}
