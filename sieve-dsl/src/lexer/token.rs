//! Lexer token types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token classes of the rule grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Registered property name
    Property,
    /// Comparison operator (`==`, `CONTAINS`, ...)
    Operator,
    /// `AND`, `OR`, `NOT`
    LogicalOperator,
    /// Literal: quoted string, number, boolean, or permissive bare word
    Value,
    OpenParen,
    CloseParen,
    /// Anything the scanner could not classify
    Unknown,
}

impl TokenKind {
    /// Human-readable class name used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Property => "property",
            TokenKind::Operator => "comparison operator",
            TokenKind::LogicalOperator => "logical operator",
            TokenKind::Value => "value",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::Unknown => "unrecognized text",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Source location span (byte offsets, end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Caret strictly inside the span or touching its end.
    pub fn touches(&self, offset: usize) -> bool {
        self.start < offset && offset <= self.end
    }
}

/// A positioned, classified lexeme.
///
/// `error` is the one mutable part: the grammar validator clears and sets it
/// on every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
    pub error: Option<String>,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
            error: None,
        }
    }

    pub fn position(&self) -> usize {
        self.span.start
    }

    pub fn len(&self) -> usize {
        self.span.len()
    }

    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_logical(&self, op: sieve_core::LogicalOp) -> bool {
        self.kind == TokenKind::LogicalOperator && self.text.eq_ignore_ascii_case(op.symbol())
    }

    /// Identifier-shaped: non-empty and made only of `[A-Za-z0-9_]`.
    pub fn is_identifier_shaped(&self) -> bool {
        !self.text.is_empty()
            && self.text.chars().all(is_word_char)
            && !self.text.starts_with(|c: char| c.is_ascii_digit())
    }
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
