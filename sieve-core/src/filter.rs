//! Operators shared by the tokenizer, suggestion engine and compiler
//!
//! Every operator has exactly one canonical spelling. Word operators are
//! matched case-insensitively but always rendered upper-case.

use crate::PropertyType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator between a property and a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    /// Equal to
    Eq,
    /// Not equal to
    Ne,
    /// Greater than
    Gt,
    /// Less than
    Lt,
    /// Greater than or equal
    Ge,
    /// Less than or equal
    Le,
    /// Contains substring (strings only)
    Contains,
    /// Starts with prefix (strings only)
    StartsWith,
    /// Ends with suffix (strings only)
    EndsWith,
}

impl CompareOp {
    /// All comparison operators in suggestion order.
    pub const ALL: [CompareOp; 9] = [
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Gt,
        CompareOp::Lt,
        CompareOp::Ge,
        CompareOp::Le,
        CompareOp::Contains,
        CompareOp::StartsWith,
        CompareOp::EndsWith,
    ];

    /// Canonical source spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Contains => "CONTAINS",
            CompareOp::StartsWith => "STARTSWITH",
            CompareOp::EndsWith => "ENDSWITH",
        }
    }

    /// Parse an operator lexeme (case-insensitive for word operators).
    pub fn from_symbol(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.symbol().eq_ignore_ascii_case(text))
    }

    /// Whether this operator orders values (`>`, `<`, `>=`, `<=`).
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            CompareOp::Gt | CompareOp::Lt | CompareOp::Ge | CompareOp::Le
        )
    }

    /// Whether this operator only applies to strings.
    pub fn is_string_only(self) -> bool {
        matches!(
            self,
            CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith
        )
    }

    /// Whether this operator is legal for a property of the given type.
    ///
    /// Every type gets `==` and `!=`. Numeric and DateTime types add ordering,
    /// strings add the substring family.
    pub fn is_legal_for(self, property_type: &PropertyType) -> bool {
        if self.is_ordering() {
            property_type.is_ordered()
        } else if self.is_string_only() {
            matches!(property_type, PropertyType::String)
        } else {
            true
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Logical connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

impl LogicalOp {
    pub const ALL: [LogicalOp; 3] = [LogicalOp::And, LogicalOp::Or, LogicalOp::Not];

    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
            LogicalOp::Not => "NOT",
        }
    }

    pub fn from_symbol(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.symbol().eq_ignore_ascii_case(text))
    }

    /// Binary connectives join two operands; `NOT` is a prefix.
    pub fn is_binary(self) -> bool {
        !matches!(self, LogicalOp::Not)
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Comparison operators legal for a property type, in suggestion order.
pub fn legal_operators(property_type: &PropertyType) -> Vec<CompareOp> {
    CompareOp::ALL
        .into_iter()
        .filter(|op| op.is_legal_for(property_type))
        .collect()
}

/// Words the tokenizer claims before it looks at the schema: the word
/// operators and the boolean literals.
pub const RESERVED_WORDS: [&str; 8] = [
    "AND", "OR", "NOT", "CONTAINS", "STARTSWITH", "ENDSWITH", "TRUE", "FALSE",
];

/// Whether `word` is reserved by the rule grammar (case-insensitive).
pub fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.iter().any(|r| r.eq_ignore_ascii_case(word))
}
