//! Pretty printer and normalizer for rule token streams
//!
//! Both work on tokens rather than the AST, so they also render rules that
//! do not validate. Neither changes which tokens the text contains, only the
//! whitespace between them and the casing of keywords.

use crate::lexer::{Token, TokenKind};
use crate::schema::SchemaRegistry;
use sieve_core::LogicalOp;

/// Render tokens one clause per line.
///
/// Every `AND`/`OR` starts a new line, `(` ends its line and opens a level,
/// `)` sits alone on a line one level out. Each level indents by
/// `indent_width` spaces. Formatting formatted text is a no-op.
pub fn format(tokens: &[Token], indent_width: usize) -> String {
    let mut printer = Printer::new(indent_width);

    for token in tokens {
        let text = keyword_case(token);
        match token.kind {
            TokenKind::LogicalOperator if !token.is_logical(LogicalOp::Not) => {
                printer.break_line();
                printer.push(text);
            }
            TokenKind::OpenParen => {
                printer.push(text);
                printer.break_line();
                printer.depth += 1;
            }
            TokenKind::CloseParen => {
                printer.break_line();
                printer.depth = printer.depth.saturating_sub(1);
                printer.push(text);
                printer.break_line();
            }
            _ => printer.push(text),
        }
    }

    printer.finish()
}

/// Canonical single-line spelling used as the cache key.
///
/// Tokens are separated by one space except just inside parentheses;
/// keywords are upper-cased and properties take their registered casing.
pub fn normalize(tokens: &[Token], schema: &SchemaRegistry) -> String {
    let mut out = String::new();
    let mut prev: Option<TokenKind> = None;

    for token in tokens {
        let tight = matches!(prev, None | Some(TokenKind::OpenParen))
            || token.kind == TokenKind::CloseParen;
        if !tight {
            out.push(' ');
        }

        match token.kind {
            TokenKind::Property => match schema.describe(&token.text) {
                Some(descriptor) => out.push_str(&descriptor.name),
                None => out.push_str(&token.text),
            },
            _ => out.push_str(&keyword_case(token)),
        }
        prev = Some(token.kind);
    }

    out
}

fn keyword_case(token: &Token) -> String {
    match token.kind {
        TokenKind::Operator | TokenKind::LogicalOperator => token.text.to_ascii_uppercase(),
        _ => token.text.clone(),
    }
}

struct Printer {
    indent_width: usize,
    depth: usize,
    lines: Vec<String>,
    current: Vec<String>,
}

impl Printer {
    fn new(indent_width: usize) -> Self {
        Self {
            indent_width,
            depth: 0,
            lines: Vec::new(),
            current: Vec::new(),
        }
    }

    fn push(&mut self, text: String) {
        self.current.push(text);
    }

    fn break_line(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let indent = " ".repeat(self.indent_width * self.depth);
        self.lines.push(format!("{}{}", indent, self.current.join(" ")));
        self.current.clear();
    }

    fn finish(mut self) -> String {
        self.break_line();
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use sieve_core::{PropertyDescriptor, PropertyType};

    fn schema() -> SchemaRegistry {
        SchemaRegistry::new(vec![
            PropertyDescriptor::new("Age", PropertyType::Integer),
            PropertyDescriptor::new("Name", PropertyType::String),
            PropertyDescriptor::new("Active", PropertyType::Boolean),
        ])
        .unwrap()
    }

    fn fmt(source: &str) -> String {
        format(&tokenize(source, &schema()), 4)
    }

    fn norm(source: &str) -> String {
        normalize(&tokenize(source, &schema()), &schema())
    }

    #[test]
    fn test_format_single_comparison() {
        assert_eq!(fmt("  Age   >18 "), "Age > 18");
    }

    #[test]
    fn test_format_breaks_on_connectives() {
        assert_eq!(
            fmt("Age > 18 and Name contains 'John'"),
            "Age > 18\nAND Name CONTAINS 'John'"
        );
    }

    #[test]
    fn test_format_indents_groups() {
        assert_eq!(
            fmt("(Age > 18 OR Name == 'x') AND Active == true"),
            "(\n    Age > 18\n    OR Name == 'x'\n)\nAND Active == true"
        );
        assert_eq!(
            fmt("NOT ((Age > 1))"),
            "NOT (\n    (\n        Age > 1\n    )\n)"
        );
    }

    #[test]
    fn test_format_custom_indent() {
        let tokens = tokenize("(Age > 1)", &schema());
        assert_eq!(format(&tokens, 2), "(\n  Age > 1\n)");
    }

    #[test]
    fn test_format_is_idempotent() {
        for source in [
            "(Age > 18 OR Name == 'x') AND Active == true",
            "Age >> 5",
            "((Age > 1",
            "Age > 1))",
            "Name == 'unterminated and more",
            "",
        ] {
            let once = fmt(source);
            assert_eq!(fmt(&once), once, "not idempotent for {:?}", source);
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(norm("( age>18  and   name CONTAINS 'J' )"), "(Age > 18 AND Name CONTAINS 'J')");
        assert_eq!(norm("not Active == TRUE"), "NOT Active == TRUE");
        assert_eq!(norm(""), "");
    }

    #[test]
    fn test_normalize_equates_spacing_variants() {
        assert_eq!(norm("Age>18 AND Name=='x'"), norm("  Age > 18   and Name == 'x'  "));
    }
}
