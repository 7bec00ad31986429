//! AST types for rule expressions

use crate::lexer::Span;
use serde::{Deserialize, Serialize};
use sieve_core::CompareOp;
use std::fmt;

/// A single `property operator value` clause, as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub property: String,
    pub op: CompareOp,
    /// Raw literal text, quotes included
    pub value: String,
    pub span: Span,
}

/// Rule expression tree.
///
/// `And` and `Or` hold every operand of one run of the connective, always at
/// least two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuleExpr {
    Comparison(Comparison),
    And(Vec<RuleExpr>),
    Or(Vec<RuleExpr>),
    Not(Box<RuleExpr>),
}

impl RuleExpr {
    /// Number of comparison leaves.
    pub fn comparison_count(&self) -> usize {
        match self {
            RuleExpr::Comparison(_) => 1,
            RuleExpr::And(terms) | RuleExpr::Or(terms) => {
                terms.iter().map(RuleExpr::comparison_count).sum()
            }
            RuleExpr::Not(inner) => inner.comparison_count(),
        }
    }
}

/// Fully parenthesized rendering; shows the tree shape unambiguously.
impl fmt::Display for RuleExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleExpr::Comparison(c) => write!(f, "{} {} {}", c.property, c.op, c.value),
            RuleExpr::And(terms) => write_run(f, terms, " AND "),
            RuleExpr::Or(terms) => write_run(f, terms, " OR "),
            RuleExpr::Not(inner) => write!(f, "(NOT {})", inner),
        }
    }
}

fn write_run(f: &mut fmt::Formatter<'_>, terms: &[RuleExpr], separator: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", term)?;
    }
    f.write_str(")")
}

// ============================================================================
// PARSE ERROR
// ============================================================================

/// What kind of problem stopped the parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseErrorKind {
    Empty,
    Syntax,
    UnbalancedParentheses,
    /// Parentheses and `NOT` nest past the parser's limit
    TooDeep,
    UnknownProperty(String),
}

/// Parse error anchored to a source span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub span: Span,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parse error at offset {}: {}", self.span.start, self.message)
    }
}

impl std::error::Error for ParseError {}
