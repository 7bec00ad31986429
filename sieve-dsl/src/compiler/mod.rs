//! Rule Compiler - Transform AST to an executable predicate
//!
//! The parser guarantees shape; this module checks meaning against the
//! schema (property exists, operator legal for its type, literal parses as
//! that type and belongs to any allowed set) and produces a typed tree that
//! evaluates directly against a [`PropertyAccessor`].
//!
//! # Pipeline
//!
//! ```text
//! Tokens → Parser → RuleExpr → RuleCompiler → CompiledExpr → Predicate
//!                                   ↓
//!                          Validation (semantic)
//! ```

pub mod cache;

pub use cache::{CacheKey, CacheStats, PredicateCache};

use crate::lexer::Token;
use crate::parser::{self, Comparison, ParseError, ParseErrorKind, RuleExpr};
use crate::schema::SchemaRegistry;
use serde::{Deserialize, Serialize};
use sieve_core::{CompareOp, PropertyAccessor, PropertyType, Value};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// COMPILE ERRORS
// ============================================================================

/// Errors that can occur during rule compilation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    /// Nothing to compile
    #[error("expression is empty")]
    EmptyExpression,

    /// Token sequence does not form a rule
    #[error("syntax error at offset {position}: {message}")]
    Syntax { message: String, position: usize },

    /// Parentheses do not balance
    #[error("unbalanced parentheses at offset {position}")]
    UnbalancedParentheses { position: usize },

    /// Parentheses and `NOT` nest too deeply
    #[error("nesting exceeds {limit} levels at offset {position}")]
    NestingTooDeep { position: usize, limit: usize },

    /// Property is not registered in the schema
    #[error("unknown property '{name}'")]
    UnknownProperty { name: String },

    /// Operator is not defined for the property's declared type
    #[error("operator '{operator}' is not valid for {property_type} property '{property}'")]
    IllegalOperator {
        operator: String,
        property: String,
        property_type: String,
    },

    /// Literal does not parse as the declared type
    #[error("'{literal}' is not a valid {property_type} literal")]
    InvalidLiteral {
        literal: String,
        property_type: String,
    },

    /// Literal is outside the property's allowed values
    #[error("'{value}' is not an allowed value for '{property}'")]
    ValueNotAllowed { value: String, property: String },
}

pub type CompileResult<T> = Result<T, CompileError>;

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        match err.kind {
            ParseErrorKind::Empty => CompileError::EmptyExpression,
            ParseErrorKind::UnbalancedParentheses => CompileError::UnbalancedParentheses {
                position: err.span.start,
            },
            ParseErrorKind::TooDeep => CompileError::NestingTooDeep {
                position: err.span.start,
                limit: parser::MAX_NESTING_DEPTH,
            },
            ParseErrorKind::UnknownProperty(name) => CompileError::UnknownProperty { name },
            ParseErrorKind::Syntax => CompileError::Syntax {
                message: err.message,
                position: err.span.start,
            },
        }
    }
}

// ============================================================================
// COMPILED TREE
// ============================================================================

/// Schema-resolved rule tree.
///
/// `All` and `Any` are n-ary, so a long run of one connective stays one
/// level deep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompiledExpr {
    Comparison {
        /// Registered spelling of the property
        property: String,
        property_type: PropertyType,
        op: CompareOp,
        operand: Value,
    },
    All(Vec<CompiledExpr>),
    Any(Vec<CompiledExpr>),
    Not(Box<CompiledExpr>),
}

impl CompiledExpr {
    /// Evaluate against one target instance.
    pub fn evaluate<A: PropertyAccessor + ?Sized>(&self, target: &A) -> bool {
        match self {
            CompiledExpr::Comparison {
                property,
                property_type,
                op,
                operand,
            } => {
                let actual = target
                    .property(property)
                    .and_then(|value| value.coerce(property_type));
                match actual {
                    Some(actual) => compare(&actual, *op, operand),
                    None => false,
                }
            }
            CompiledExpr::All(terms) => terms.iter().all(|term| term.evaluate(target)),
            CompiledExpr::Any(terms) => terms.iter().any(|term| term.evaluate(target)),
            CompiledExpr::Not(inner) => !inner.evaluate(target),
        }
    }
}

fn compare(actual: &Value, op: CompareOp, operand: &Value) -> bool {
    match op {
        CompareOp::Eq => actual.compare(operand) == Some(Ordering::Equal),
        CompareOp::Ne => matches!(actual.compare(operand), Some(o) if o != Ordering::Equal),
        CompareOp::Gt => actual.compare(operand) == Some(Ordering::Greater),
        CompareOp::Lt => actual.compare(operand) == Some(Ordering::Less),
        CompareOp::Ge => matches!(
            actual.compare(operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::Le => matches!(
            actual.compare(operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Contains => text_test(actual, operand, |a, b| a.contains(b)),
        CompareOp::StartsWith => text_test(actual, operand, |a, b| a.starts_with(b)),
        CompareOp::EndsWith => text_test(actual, operand, |a, b| a.ends_with(b)),
    }
}

fn text_test(actual: &Value, operand: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (actual.as_str(), operand.as_str()) {
        (Some(a), Some(b)) => test(a, b),
        _ => false,
    }
}

// ============================================================================
// PREDICATE
// ============================================================================

/// A compiled rule, cheap to clone and safe to share across threads.
///
/// An empty root is the always-true predicate.
#[derive(Debug, Clone)]
pub struct Predicate {
    root: Option<Arc<CompiledExpr>>,
    source: Arc<str>,
}

impl Predicate {
    pub fn new(root: CompiledExpr, source: impl Into<Arc<str>>) -> Self {
        Self {
            root: Some(Arc::new(root)),
            source: source.into(),
        }
    }

    /// Predicate that accepts every instance.
    pub fn always_true() -> Self {
        Self {
            root: None,
            source: Arc::from(""),
        }
    }

    pub fn evaluate<A: PropertyAccessor + ?Sized>(&self, target: &A) -> bool {
        self.root.as_ref().map_or(true, |root| root.evaluate(target))
    }

    /// Normalized source text this predicate was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> Option<&CompiledExpr> {
        self.root.as_deref()
    }

    pub fn is_always_true(&self) -> bool {
        self.root.is_none()
    }

    /// Whether two predicates share one compiled tree.
    pub fn ptr_eq(&self, other: &Predicate) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Turn the predicate into a plain closure.
    pub fn into_fn<A: PropertyAccessor + ?Sized>(self) -> impl Fn(&A) -> bool + Send + Sync {
        move |target| self.evaluate(target)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root.is_none() {
            f.write_str("<always true>")
        } else {
            f.write_str(&self.source)
        }
    }
}

// ============================================================================
// COMPILER
// ============================================================================

/// Resolves a parsed rule against a schema.
pub struct RuleCompiler<'s> {
    schema: &'s SchemaRegistry,
}

impl<'s> RuleCompiler<'s> {
    pub fn new(schema: &'s SchemaRegistry) -> Self {
        Self { schema }
    }

    /// Parse and compile a token sequence.
    pub fn compile_tokens(&self, tokens: &[Token]) -> CompileResult<CompiledExpr> {
        let ast = parser::parse(tokens)?;
        self.compile(&ast)
    }

    /// Compile a parsed rule.
    pub fn compile(&self, expr: &RuleExpr) -> CompileResult<CompiledExpr> {
        Ok(match expr {
            RuleExpr::Comparison(comparison) => self.compile_comparison(comparison)?,
            RuleExpr::And(terms) => CompiledExpr::All(self.compile_terms(terms)?),
            RuleExpr::Or(terms) => CompiledExpr::Any(self.compile_terms(terms)?),
            RuleExpr::Not(inner) => CompiledExpr::Not(Box::new(self.compile(inner)?)),
        })
    }

    fn compile_terms(&self, terms: &[RuleExpr]) -> CompileResult<Vec<CompiledExpr>> {
        terms.iter().map(|term| self.compile(term)).collect()
    }

    fn compile_comparison(&self, comparison: &Comparison) -> CompileResult<CompiledExpr> {
        let descriptor = self.schema.describe(&comparison.property).ok_or_else(|| {
            CompileError::UnknownProperty {
                name: comparison.property.clone(),
            }
        })?;
        let property_type = &descriptor.property_type;

        if !comparison.op.is_legal_for(property_type) {
            return Err(CompileError::IllegalOperator {
                operator: comparison.op.to_string(),
                property: descriptor.name.clone(),
                property_type: property_type.to_string(),
            });
        }

        let operand = Value::parse_literal(&comparison.value, property_type).ok_or_else(|| {
            CompileError::InvalidLiteral {
                literal: comparison.value.clone(),
                property_type: property_type.to_string(),
            }
        })?;

        // Allowed values match case-insensitively but compare exactly, so
        // the operand takes the registered spelling.
        let operand = match &descriptor.allowed_values {
            None => operand,
            Some(_) => descriptor
                .allowed_spelling(&comparison.value)
                .and_then(|spelling| Value::parse_literal(spelling, property_type))
                .ok_or_else(|| CompileError::ValueNotAllowed {
                    value: comparison.value.clone(),
                    property: descriptor.name.clone(),
                })?,
        };

        Ok(CompiledExpr::Comparison {
            property: descriptor.name.clone(),
            property_type: property_type.clone(),
            op: comparison.op,
            operand,
        })
    }
}
