//! Context-aware suggestions
//!
//! Given the token list and a caret offset, work out which token class the
//! grammar expects at the caret and list candidate literals for it. When the
//! caret sits inside (or at the end of) a token being typed, the candidates
//! for that token's position are narrowed to the typed prefix.

use crate::lexer::{Token, TokenKind};
use crate::schema::SchemaRegistry;
use sieve_core::{legal_operators, unquote, LogicalOp, PropertyType};

const INTEGER_HINTS: [&str; 5] = ["0", "1", "10", "100", "1000"];
const DECIMAL_HINTS: [&str; 5] = ["0.0", "0.5", "1.0", "10.0", "100.0"];
const QUOTE_HINT: &str = "'";

/// Ranked, deduplicated suggestions for the caret position.
pub fn suggest(tokens: &[Token], caret: usize, schema: &SchemaRegistry) -> Vec<String> {
    let candidates = match editing_token(tokens, caret) {
        Some(index) => complete_token(tokens, index, caret, schema),
        None => {
            let anchor = tokens.iter().rposition(|t| t.span.end <= caret);
            candidates_after(tokens, anchor, schema).items
        }
    };

    let next = tokens.iter().find(|t| t.span.start >= caret);
    dedup(candidates, next)
}

/// Candidate set for one grammar position.
struct Candidates {
    items: Vec<String>,
    /// Every legal value is listed (allowed set or boolean)
    exhaustive: bool,
}

impl Candidates {
    fn open(items: Vec<String>) -> Self {
        Self {
            items,
            exhaustive: false,
        }
    }
}

/// Index of the token the caret is editing, if any.
///
/// A word-like token counts when the caret touches its end; any token
/// counts when the caret is strictly inside it.
fn editing_token(tokens: &[Token], caret: usize) -> Option<usize> {
    tokens.iter().position(|t| {
        let editable = matches!(
            t.kind,
            TokenKind::Property
                | TokenKind::Operator
                | TokenKind::LogicalOperator
                | TokenKind::Value
                | TokenKind::Unknown
        );
        t.span.touches(caret) && (editable || caret < t.span.end)
    })
}

fn complete_token(
    tokens: &[Token],
    index: usize,
    caret: usize,
    schema: &SchemaRegistry,
) -> Vec<String> {
    let token = &tokens[index];
    let typed = token
        .text
        .get(..caret - token.span.start)
        .unwrap_or(&token.text);
    let context = candidates_after(tokens, index.checked_sub(1), schema);

    if token.kind == TokenKind::Value && caret == token.span.end {
        // A finished value continues with a connective unless it is a
        // partial entry from a closed set.
        let needle = unquote_prefix(typed);
        let completions: Vec<String> = if context.exhaustive {
            context
                .items
                .into_iter()
                .filter(|c| starts_with_ignore_case(c, needle) && !c.eq_ignore_ascii_case(needle))
                .collect()
        } else {
            Vec::new()
        };
        return if completions.is_empty() {
            connectives()
        } else {
            completions
        };
    }

    let needle = match token.kind {
        TokenKind::Value => unquote_prefix(typed),
        _ => typed,
    };
    context
        .items
        .into_iter()
        .filter(|c| starts_with_ignore_case(c, needle))
        .collect()
}

/// Candidates for the position following `anchor` (`None` is the start).
fn candidates_after(
    tokens: &[Token],
    anchor: Option<usize>,
    schema: &SchemaRegistry,
) -> Candidates {
    let Some(index) = anchor else {
        return Candidates::open(property_names(schema));
    };
    let token = &tokens[index];

    match token.kind {
        TokenKind::Property => {
            let ops = schema
                .describe(&token.text)
                .map(|p| legal_operators(&p.property_type))
                .unwrap_or_default();
            Candidates::open(ops.into_iter().map(|op| op.symbol().to_string()).collect())
        }
        TokenKind::Operator => value_candidates(tokens, index, schema),
        TokenKind::Value | TokenKind::CloseParen => Candidates::open(connectives()),
        TokenKind::LogicalOperator => {
            let mut items = property_names(schema);
            items.push("(".to_string());
            Candidates::open(items)
        }
        TokenKind::OpenParen => Candidates::open(property_names(schema)),
        TokenKind::Unknown => Candidates::open(Vec::new()),
    }
}

fn value_candidates(tokens: &[Token], operator: usize, schema: &SchemaRegistry) -> Candidates {
    let property = operator
        .checked_sub(1)
        .map(|i| &tokens[i])
        .filter(|t| t.kind == TokenKind::Property)
        .and_then(|t| schema.describe(&t.text));
    let Some(property) = property else {
        return Candidates::open(Vec::new());
    };

    if let Some(allowed) = &property.allowed_values {
        return Candidates {
            items: allowed.clone(),
            exhaustive: true,
        };
    }

    match property.property_type {
        PropertyType::Boolean => Candidates {
            items: hints(&["true", "false"]),
            exhaustive: true,
        },
        PropertyType::Integer => Candidates::open(hints(&INTEGER_HINTS)),
        PropertyType::Decimal => Candidates::open(hints(&DECIMAL_HINTS)),
        PropertyType::String | PropertyType::DateTime => Candidates::open(hints(&[QUOTE_HINT])),
        PropertyType::Custom(_) => Candidates::open(Vec::new()),
    }
}

fn hints(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn property_names(schema: &SchemaRegistry) -> Vec<String> {
    schema.names().map(str::to_string).collect()
}

fn connectives() -> Vec<String> {
    [LogicalOp::And, LogicalOp::Or]
        .into_iter()
        .map(|op| op.symbol().to_string())
        .collect()
}

/// Drop duplicates and anything already sitting right after the caret.
fn dedup(candidates: Vec<String>, next: Option<&Token>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if next.is_some_and(|t| unquote(&t.text).eq_ignore_ascii_case(&candidate)) {
            continue;
        }
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

fn unquote_prefix(typed: &str) -> &str {
    typed.trim_start_matches(['\'', '"'])
}

fn starts_with_ignore_case(candidate: &str, prefix: &str) -> bool {
    candidate
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
