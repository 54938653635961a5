//! Claims predicate language.
//!
//! Expressions such as
//! ``Equals(`email_verified`, `true`) && OneOf(`user.role`, `admin`, `user`)``
//! are parsed once into a [`Predicate`] tree and then evaluated against the
//! decoded claims of every request. `&&` binds tighter than `||`, both
//! short-circuit left to right, and parentheses group explicitly.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use crate::claims::{resolve_path, scalar_text};

const QUOTES: [char; 3] = ['`', '"', '\''];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Claim at `path` renders to exactly `literal`.
    Equals { path: String, literal: String },
    /// Claim at `path` renders to any of `literals`.
    OneOf { path: String, literals: Vec<String> },
    /// Claim at `path`, read as a set of strings, holds every one of `literals`.
    Contains { path: String, literals: Vec<String> },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn parse(source: &str) -> Result<Self, PredicateError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(PredicateError::Empty);
        }
        let mut parser = Parser {
            tokens,
            cursor: 0,
            end: source.len(),
        };
        let predicate = parser.parse_or()?;
        if let Some(trailing) = parser.peek() {
            return Err(PredicateError::Expected {
                offset: trailing.offset,
                expected: "'&&', '||' or end of expression",
            });
        }
        Ok(predicate)
    }

    pub fn equals(path: impl Into<String>, literal: impl Into<String>) -> Self {
        Self::Equals {
            path: path.into(),
            literal: literal.into(),
        }
    }

    pub fn one_of<I, S>(path: impl Into<String>, literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OneOf {
            path: path.into(),
            literals: literals.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains<I, S>(path: impl Into<String>, literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Contains {
            path: path.into(),
            literals: literals.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Evaluate against a decoded claims tree. Paths that do not resolve make
    /// the leaf false.
    pub fn evaluate(&self, claims: &Value) -> bool {
        match self {
            Predicate::Equals { path, literal } => resolve_path(claims, path)
                .and_then(scalar_text)
                .is_some_and(|text| text == *literal),
            Predicate::OneOf { path, literals } => resolve_path(claims, path)
                .and_then(scalar_text)
                .is_some_and(|text| literals.iter().any(|literal| *literal == text)),
            Predicate::Contains { path, literals } => match resolve_path(claims, path) {
                Some(value) => {
                    let held = string_set(value);
                    literals.iter().all(|literal| held.contains(literal))
                }
                None => false,
            },
            Predicate::And(left, right) => left.evaluate(claims) && right.evaluate(claims),
            Predicate::Or(left, right) => left.evaluate(claims) || right.evaluate(claims),
        }
    }
}

fn string_set(value: &Value) -> HashSet<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

impl FromStr for Predicate {
    type Err = PredicateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equals { path, literal } => {
                write_call(f, "Equals", path, std::slice::from_ref(literal))
            }
            Predicate::OneOf { path, literals } => write_call(f, "OneOf", path, literals),
            Predicate::Contains { path, literals } => write_call(f, "Contains", path, literals),
            Predicate::And(left, right) => {
                write_operand(f, left)?;
                f.write_str(" && ")?;
                write_operand(f, right)
            }
            Predicate::Or(left, right) => write!(f, "{left} || {right}"),
        }
    }
}

fn write_call(f: &mut fmt::Formatter<'_>, name: &str, path: &str, literals: &[String]) -> fmt::Result {
    write!(f, "{name}(")?;
    write_quoted(f, path)?;
    for literal in literals {
        f.write_str(", ")?;
        write_quoted(f, literal)?;
    }
    f.write_str(")")
}

/// Strings have no escapes, so quote with a delimiter the text does not contain.
/// Text holding all three delimiters has no parseable form.
fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    let quote = QUOTES
        .iter()
        .copied()
        .find(|quote| !text.contains(*quote))
        .unwrap_or('`');
    write!(f, "{quote}{text}{quote}")
}

fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Predicate) -> fmt::Result {
    match operand {
        Predicate::Or(..) => write!(f, "({operand})"),
        other => write!(f, "{other}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error("claims expression is empty")]
    Empty,
    #[error("unexpected character '{found}' at offset {offset}")]
    UnexpectedChar { offset: usize, found: char },
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("unknown function '{name}' at offset {offset}")]
    UnknownFunction { offset: usize, name: String },
    #[error("expected {expected} at offset {offset}")]
    Expected { offset: usize, expected: &'static str },
    #[error("{function} at offset {offset} takes {expected} literal(s), got {found}")]
    Arity {
        offset: usize,
        function: &'static str,
        expected: &'static str,
        found: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    Comma,
    AndAnd,
    OrOr,
    Ident(String),
    Str(String),
}

#[derive(Debug, Clone)]
struct Spanned {
    offset: usize,
    token: Token,
}

fn tokenize(source: &str) -> Result<Vec<Spanned>, PredicateError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        let token = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '(' => {
                chars.next();
                Token::LParen
            }
            ')' => {
                chars.next();
                Token::RParen
            }
            ',' => {
                chars.next();
                Token::Comma
            }
            '&' | '|' => {
                chars.next();
                match chars.next() {
                    Some((_, next)) if next == ch => {
                        if ch == '&' {
                            Token::AndAnd
                        } else {
                            Token::OrOr
                        }
                    }
                    _ => return Err(PredicateError::UnexpectedChar { offset, found: ch }),
                }
            }
            c if QUOTES.contains(&c) => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some((_, c)) if c == ch => break,
                        Some((_, c)) => text.push(c),
                        None => return Err(PredicateError::UnterminatedString { offset }),
                    }
                }
                Token::Str(text)
            }
            c if c.is_ascii_alphabetic() => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Ident(ident)
            }
            other => return Err(PredicateError::UnexpectedChar { offset, found: other }),
        };
        tokens.push(Spanned { offset, token });
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.cursor)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn offset(&self) -> usize {
        self.peek().map(|spanned| spanned.offset).unwrap_or(self.end)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        match self.peek() {
            Some(spanned) if spanned.token == *expected => {
                self.cursor += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, expected: Token, label: &'static str) -> Result<(), PredicateError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(PredicateError::Expected {
                offset: self.offset(),
                expected: label,
            })
        }
    }

    fn parse_or(&mut self) -> Result<Predicate, PredicateError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_and()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Predicate, PredicateError> {
        let mut left = self.parse_primary()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_primary()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Predicate, PredicateError> {
        let offset = self.offset();
        match self.advance() {
            Some(Spanned {
                token: Token::LParen,
                ..
            }) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Spanned {
                token: Token::Ident(name),
                offset,
            }) => self.parse_call(offset, name),
            _ => Err(PredicateError::Expected {
                offset,
                expected: "function call or '('",
            }),
        }
    }

    fn parse_call(&mut self, offset: usize, name: String) -> Result<Predicate, PredicateError> {
        let function = match name.as_str() {
            "Equals" => "Equals",
            "OneOf" => "OneOf",
            "Contains" => "Contains",
            _ => return Err(PredicateError::UnknownFunction { offset, name }),
        };

        self.expect(Token::LParen, "'('")?;
        let mut args = Vec::new();
        loop {
            let arg_offset = self.offset();
            match self.advance() {
                Some(Spanned {
                    token: Token::Str(text),
                    ..
                }) => args.push(text),
                _ => {
                    return Err(PredicateError::Expected {
                        offset: arg_offset,
                        expected: "quoted string",
                    })
                }
            }
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::RParen, "',' or ')'")?;
            break;
        }

        let mut args = args.into_iter();
        let path = args.next().unwrap_or_default();
        let literals: Vec<String> = args.collect();

        match function {
            "Equals" => {
                if literals.len() != 1 {
                    return Err(PredicateError::Arity {
                        offset,
                        function,
                        expected: "exactly one",
                        found: literals.len(),
                    });
                }
                let literal = literals.into_iter().next().unwrap_or_default();
                Ok(Predicate::Equals { path, literal })
            }
            _ => {
                if literals.is_empty() {
                    return Err(PredicateError::Arity {
                        offset,
                        function,
                        expected: "at least one",
                        found: 0,
                    });
                }
                if function == "OneOf" {
                    Ok(Predicate::OneOf { path, literals })
                } else {
                    Ok(Predicate::Contains { path, literals })
                }
            }
        }
    }
}
