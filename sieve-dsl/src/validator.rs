//! Grammar validator
//!
//! Checks a token sequence against the flat rule grammar and produces
//! position-anchored diagnostics. Validation never fails: malformed input
//! yields diagnostics, and an empty diagnostic list means the sequence is
//! valid.
//!
//! ```text
//! start      → property | '(' | NOT
//! property   → operator
//! operator   → value
//! value      → AND | OR | ')' | end
//! AND | OR   → property | '(' | NOT
//! NOT        → property | '(' | NOT
//! '('        → property | '(' | NOT
//! ')'        → AND | OR | ')' | end
//! ```
//!
//! Parentheses and `NOT` together may nest at most
//! [`MAX_NESTING_DEPTH`] levels, the same limit the parser enforces.

use crate::lexer::{Span, Token, TokenKind};
use crate::parser::MAX_NESTING_DEPTH;
use crate::schema::SchemaRegistry;
use serde::{Deserialize, Serialize};
use sieve_core::{CompareOp, LogicalOp, PropertyDescriptor, Value};

/// Diagnostic categories, so callers can render each class differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// No tokens at all
    Empty,
    /// Token sequence violates the grammar
    Syntax,
    /// Parentheses do not balance
    Parenthesis,
    /// Identifier in property position that is not registered
    UnknownProperty,
    /// Operator or literal incompatible with the property's declared type
    Type,
    /// Parentheses and `NOT` nest past the supported depth
    Nesting,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    fn new(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
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
}

/// Outcome of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
    /// Unregistered identifiers found where a property was expected
    pub unknown_properties: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }
}

/// Grammar position of a token; `AND`/`OR` and `NOT` behave differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Property,
    Operator,
    Value,
    Connective,
    Not,
    Open,
    Close,
    Unknown,
}

fn class_of(token: &Token) -> Class {
    match token.kind {
        TokenKind::Property => Class::Property,
        TokenKind::Operator => Class::Operator,
        TokenKind::Value => Class::Value,
        TokenKind::LogicalOperator if token.is_logical(LogicalOp::Not) => Class::Not,
        TokenKind::LogicalOperator => Class::Connective,
        TokenKind::OpenParen => Class::Open,
        TokenKind::CloseParen => Class::Close,
        TokenKind::Unknown => Class::Unknown,
    }
}

/// Classes allowed to follow `prev` (`None` is the start of the expression).
fn accepts(prev: Option<Class>, next: Class) -> bool {
    use Class::*;
    match prev {
        None | Some(Connective) | Some(Not) | Some(Open) => matches!(next, Property | Open | Not),
        Some(Property) => next == Operator,
        Some(Operator) => next == Value,
        Some(Value) | Some(Close) => matches!(next, Connective | Close),
        // Already reported; don't cascade
        Some(Unknown) => true,
    }
}

fn may_end_after(prev: Class) -> bool {
    matches!(prev, Class::Value | Class::Close | Class::Unknown)
}

fn expected_after(prev: Option<Class>) -> &'static str {
    use Class::*;
    match prev {
        None | Some(Connective) | Some(Not) | Some(Open) => "a property, NOT or '('",
        Some(Property) => "a comparison operator",
        Some(Operator) => "a value",
        Some(Value) | Some(Close) => "AND, OR or ')'",
        Some(Unknown) => "a valid token",
    }
}

/// Validate a token sequence, flagging offending tokens in place.
///
/// Error flags from any previous pass are cleared first.
pub fn validate(tokens: &mut [Token], schema: &SchemaRegistry) -> ValidationReport {
    for token in tokens.iter_mut() {
        token.error = None;
    }

    let mut report = ValidationReport::default();

    if tokens.is_empty() {
        report.diagnostics.push(Diagnostic::new(
            DiagnosticKind::Empty,
            "Expression is empty",
            Span::default(),
        ));
        return report;
    }

    check_sequence(tokens, schema, &mut report);
    check_parentheses(tokens, &mut report);
    check_nesting(tokens, &mut report);
    report.unknown_properties = unknown_properties(tokens, schema);
    report.diagnostics.sort_by_key(|d| d.span.start);
    report
}

/// Names of identifier-shaped tokens in property position that the schema
/// does not know, deduplicated in order of appearance.
pub fn unknown_properties(tokens: &[Token], schema: &SchemaRegistry) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Unknown || !token.is_identifier_shaped() {
            continue;
        }
        if schema.contains(&token.text) || !in_property_position(tokens, i) {
            continue;
        }
        if !names.iter().any(|n| n.eq_ignore_ascii_case(&token.text)) {
            names.push(token.text.clone());
        }
    }

    names
}

fn in_property_position(tokens: &[Token], index: usize) -> bool {
    let prev = index.checked_sub(1).map(|i| class_of(&tokens[i]));
    !matches!(prev, Some(Class::Operator))
}

fn check_sequence(tokens: &mut [Token], schema: &SchemaRegistry, report: &mut ValidationReport) {
    let mut prev: Option<Class> = None;

    for i in 0..tokens.len() {
        let class = class_of(&tokens[i]);

        if class == Class::Unknown {
            let diagnostic = describe_unknown(tokens, i);
            flag(&mut tokens[i], &diagnostic.message);
            report.diagnostics.push(diagnostic);
        } else if !accepts(prev, class) {
            let message = match i.checked_sub(1) {
                Some(p) => format!(
                    "Expected {} after '{}', found '{}'",
                    expected_after(prev),
                    tokens[p].text,
                    tokens[i].text
                ),
                None => format!(
                    "Expected {} at start of expression, found '{}'",
                    expected_after(prev),
                    tokens[i].text
                ),
            };
            flag(&mut tokens[i], &message);
            report
                .diagnostics
                .push(Diagnostic::new(DiagnosticKind::Syntax, message, tokens[i].span));
        } else if let Some(message) = check_types(tokens, i, schema) {
            flag(&mut tokens[i], &message);
            report
                .diagnostics
                .push(Diagnostic::new(DiagnosticKind::Type, message, tokens[i].span));
        }

        prev = Some(class);
    }

    if let Some(last_class) = prev {
        if !may_end_after(last_class) {
            let last = tokens.len() - 1;
            let message = format!(
                "Incomplete expression: expected {} after '{}'",
                expected_after(prev),
                tokens[last].text
            );
            flag(&mut tokens[last], &message);
            report
                .diagnostics
                .push(Diagnostic::new(DiagnosticKind::Syntax, message, tokens[last].span));
        }
    }
}

fn describe_unknown(tokens: &[Token], index: usize) -> Diagnostic {
    let token = &tokens[index];
    if token.text.starts_with(['\'', '"']) {
        return Diagnostic::new(
            DiagnosticKind::Syntax,
            format!("Unterminated string literal {}", token.text),
            token.span,
        );
    }
    if token.is_identifier_shaped() {
        if in_property_position(tokens, index) {
            return Diagnostic::new(
                DiagnosticKind::UnknownProperty,
                format!("Unknown property '{}'", token.text),
                token.span,
            );
        }
        return Diagnostic::new(
            DiagnosticKind::Syntax,
            format!("Unrecognized value '{}'; quote string values", token.text),
            token.span,
        );
    }
    Diagnostic::new(
        DiagnosticKind::Syntax,
        format!("Unrecognized text '{}'", token.text),
        token.span,
    )
}

/// Operator legality and literal typing for a grammatically valid token.
fn check_types(tokens: &[Token], index: usize, schema: &SchemaRegistry) -> Option<String> {
    let token = &tokens[index];
    match token.kind {
        TokenKind::Operator => {
            let property = property_before(tokens, index, 1, schema)?;
            let op = CompareOp::from_symbol(&token.text)?;
            (!op.is_legal_for(&property.property_type)).then(|| {
                format!(
                    "Operator '{}' is not valid for {} property '{}'",
                    op, property.property_type, property.name
                )
            })
        }
        TokenKind::Value => {
            let property = property_before(tokens, index, 2, schema)?;
            if Value::parse_literal(&token.text, &property.property_type).is_none() {
                Some(format!(
                    "'{}' is not a valid {} value for '{}'",
                    token.text, property.property_type, property.name
                ))
            } else if !property.allows(&token.text) {
                let allowed = property
                    .allowed_values
                    .as_deref()
                    .unwrap_or_default()
                    .join(", ");
                Some(format!(
                    "'{}' is not an allowed value for '{}' (allowed: {})",
                    token.text, property.name, allowed
                ))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn property_before<'s>(
    tokens: &[Token],
    index: usize,
    distance: usize,
    schema: &'s SchemaRegistry,
) -> Option<&'s PropertyDescriptor> {
    let token = &tokens[index.checked_sub(distance)?];
    if token.kind != TokenKind::Property {
        return None;
    }
    schema.describe(&token.text)
}

fn check_parentheses(tokens: &mut [Token], report: &mut ValidationReport) {
    let mut open: Vec<Span> = Vec::new();
    let mut stray_close: Option<Span> = None;

    for token in tokens.iter() {
        match token.kind {
            TokenKind::OpenParen => open.push(token.span),
            TokenKind::CloseParen => {
                if open.pop().is_none() && stray_close.is_none() {
                    stray_close = Some(token.span);
                }
            }
            _ => {}
        }
    }

    let (message, span) = match (stray_close, open.first()) {
        (Some(span), _) => ("Unbalanced parentheses: unmatched ')'", span),
        (None, Some(&span)) => ("Unbalanced parentheses: unmatched '('", span),
        (None, None) => return,
    };

    for token in tokens.iter_mut() {
        if matches!(token.kind, TokenKind::OpenParen | TokenKind::CloseParen) {
            flag(token, message);
        }
    }
    report
        .diagnostics
        .push(Diagnostic::new(DiagnosticKind::Parenthesis, message, span));
}

/// Report the first `NOT` or `(` that opens a level past the limit.
///
/// A run of `NOT`s wraps the next comparison or parenthesized group, so the
/// levels it opens close with that group.
fn check_nesting(tokens: &mut [Token], report: &mut ValidationReport) {
    let mut depth = 0usize;
    let mut pending_not = 0usize;
    let mut groups: Vec<usize> = Vec::new();

    for token in tokens.iter_mut() {
        let reached = match token.kind {
            TokenKind::LogicalOperator if token.is_logical(LogicalOp::Not) => {
                pending_not += 1;
                depth + pending_not
            }
            TokenKind::OpenParen => {
                let opened = pending_not + 1;
                pending_not = 0;
                depth += opened;
                groups.push(opened);
                depth
            }
            TokenKind::CloseParen => {
                depth -= groups.pop().unwrap_or(0);
                continue;
            }
            TokenKind::Property => {
                pending_not = 0;
                continue;
            }
            _ => continue,
        };

        if reached > MAX_NESTING_DEPTH {
            let message = format!("Expression nests deeper than {} levels", MAX_NESTING_DEPTH);
            flag(token, &message);
            report
                .diagnostics
                .push(Diagnostic::new(DiagnosticKind::Nesting, message, token.span));
            return;
        }
    }
}

/// Keep the first message when a token is flagged by several checks.
fn flag(token: &mut Token, message: &str) {
    if token.error.is_none() {
        token.error = Some(message.to_string());
    }
}
