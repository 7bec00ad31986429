//! Parser implementation
//!
//! Recursive descent over the flat token list. Precedence from loosest to
//! tightest: `OR`, `AND`, `NOT`, comparison. A run of the same connective
//! becomes one n-ary node, so chain length never adds recursion; only
//! parentheses and `NOT` nest, and they are capped at [`MAX_NESTING_DEPTH`].

use super::ast::*;
use crate::lexer::*;
use sieve_core::{CompareOp, LogicalOp};

/// Deepest allowed nesting of parentheses and `NOT` combined.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Parse a token sequence into a rule tree.
pub fn parse(tokens: &[Token]) -> Result<RuleExpr, ParseError> {
    Parser::new(tokens).parse()
}

/// Parser for rule expressions.
pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Parse the whole token list; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<RuleExpr, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError {
                kind: ParseErrorKind::Empty,
                message: "Expression is empty".to_string(),
                span: Span::default(),
            });
        }

        self.check_balance()?;

        let expr = self.parse_or_expr()?;
        if let Some(token) = self.current() {
            return Err(self.error_at(token, &format!("Unexpected '{}'", token.text)));
        }
        Ok(expr)
    }

    pub(crate) fn parse_or_expr(&mut self) -> Result<RuleExpr, ParseError> {
        let mut terms = vec![self.parse_and_expr()?];

        while self.check_logical(LogicalOp::Or) {
            self.advance();
            terms.push(self.parse_and_expr()?);
        }

        Ok(collapse(terms, RuleExpr::Or))
    }

    pub(crate) fn parse_and_expr(&mut self) -> Result<RuleExpr, ParseError> {
        let mut terms = vec![self.parse_unary()?];

        while self.check_logical(LogicalOp::And) {
            self.advance();
            terms.push(self.parse_unary()?);
        }

        Ok(collapse(terms, RuleExpr::And))
    }

    pub(crate) fn parse_unary(&mut self) -> Result<RuleExpr, ParseError> {
        if self.check_logical(LogicalOp::Not) {
            self.enter()?;
            self.advance();
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(RuleExpr::Not(Box::new(inner)));
        }

        if self.check(TokenKind::OpenParen) {
            self.enter()?;
            self.advance();
            let expr = self.parse_or_expr()?;
            self.expect(TokenKind::CloseParen, "')'")?;
            self.depth -= 1;
            return Ok(expr);
        }

        self.parse_comparison()
    }

    pub(crate) fn parse_comparison(&mut self) -> Result<RuleExpr, ParseError> {
        let property = self.expect_property()?;
        let op_token = self.expect(TokenKind::Operator, "a comparison operator")?;
        let op = CompareOp::from_symbol(&op_token.text)
            .ok_or_else(|| self.error_at(op_token, "Expected a comparison operator"))?;
        let value = self.expect(TokenKind::Value, "a value")?;

        Ok(RuleExpr::Comparison(Comparison {
            property: property.text.clone(),
            op,
            value: value.text.clone(),
            span: Span::new(property.span.start, value.span.end),
        }))
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    /// Open one nesting level at the current token.
    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            let span = self.current().map_or(Span::default(), |t| t.span);
            return Err(ParseError {
                kind: ParseErrorKind::TooDeep,
                message: format!(
                    "Expression nests deeper than {} levels",
                    MAX_NESTING_DEPTH
                ),
                span,
            });
        }
        Ok(())
    }

    fn check_balance(&self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        let mut last_open: Option<&Token> = None;

        for token in self.tokens {
            match token.kind {
                TokenKind::OpenParen => {
                    depth += 1;
                    last_open = Some(token);
                }
                TokenKind::CloseParen => {
                    depth = depth.checked_sub(1).ok_or_else(|| ParseError {
                        kind: ParseErrorKind::UnbalancedParentheses,
                        message: "Unmatched ')'".to_string(),
                        span: token.span,
                    })?;
                }
                _ => {}
            }
        }

        match last_open {
            Some(token) if depth > 0 => Err(ParseError {
                kind: ParseErrorKind::UnbalancedParentheses,
                message: "Unmatched '('".to_string(),
                span: token.span,
            }),
            _ => Ok(()),
        }
    }

    fn expect_property(&mut self) -> Result<&'t Token, ParseError> {
        match self.current() {
            Some(token) if token.kind == TokenKind::Property => {
                self.advance();
                Ok(token)
            }
            Some(token) if token.kind == TokenKind::Unknown && token.is_identifier_shaped() => {
                Err(ParseError {
                    kind: ParseErrorKind::UnknownProperty(token.text.clone()),
                    message: format!("Unknown property '{}'", token.text),
                    span: token.span,
                })
            }
            _ => Err(self.unexpected("a property")),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<&'t Token, ParseError> {
        match self.current() {
            Some(token) if token.kind == kind => {
                self.advance();
                Ok(token)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, what: &str) -> ParseError {
        match self.current() {
            Some(token) => {
                self.error_at(token, &format!("Expected {}, found '{}'", what, token.text))
            }
            None => {
                let end = self.tokens.last().map_or(0, |t| t.span.end);
                ParseError {
                    kind: ParseErrorKind::Syntax,
                    message: format!("Unexpected end of expression, expected {}", what),
                    span: Span::new(end, end),
                }
            }
        }
    }

    fn error_at(&self, token: &Token, message: &str) -> ParseError {
        ParseError {
            kind: ParseErrorKind::Syntax,
            message: message.to_string(),
            span: token.span,
        }
    }

    fn current(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().is_some_and(|t| t.kind == kind)
    }

    fn check_logical(&self, op: LogicalOp) -> bool {
        self.current().is_some_and(|t| t.is_logical(op))
    }
}

/// A single term stands alone; several become one n-ary node.
fn collapse(mut terms: Vec<RuleExpr>, node: fn(Vec<RuleExpr>) -> RuleExpr) -> RuleExpr {
    if terms.len() == 1 {
        if let Some(term) = terms.pop() {
            return term;
        }
    }
    node(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;
    use sieve_core::{PropertyDescriptor, PropertyType};

    fn parse_str(source: &str) -> Result<RuleExpr, ParseError> {
        let schema = SchemaRegistry::new(vec![
            PropertyDescriptor::new("A", PropertyType::Integer),
            PropertyDescriptor::new("B", PropertyType::Integer),
            PropertyDescriptor::new("C", PropertyType::Integer),
            PropertyDescriptor::new("Name", PropertyType::String),
        ])
        .unwrap();
        parse(&tokenize(source, &schema))
    }

    fn shape(source: &str) -> String {
        parse_str(source).unwrap().to_string()
    }

    #[test]
    fn test_single_comparison() {
        match parse_str("Name CONTAINS 'John'").unwrap() {
            RuleExpr::Comparison(c) => {
                assert_eq!(c.property, "Name");
                assert_eq!(c.op, CompareOp::Contains);
                assert_eq!(c.value, "'John'");
                assert_eq!(c.span, Span::new(0, 20));
            }
            other => panic!("Expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        assert_eq!(
            shape("A == 1 OR B == 2 AND C == 3"),
            "(A == 1 OR (B == 2 AND C == 3))"
        );
        assert_eq!(
            shape("A == 1 AND B == 2 OR C == 3"),
            "((A == 1 AND B == 2) OR C == 3)"
        );
    }

    #[test]
    fn test_connective_runs_are_flat() {
        assert_eq!(
            shape("A == 1 AND B == 2 AND C == 3"),
            "(A == 1 AND B == 2 AND C == 3)"
        );
        match parse_str("A == 1 OR B == 2 OR C == 3 AND A == 4").unwrap() {
            RuleExpr::Or(terms) => {
                assert_eq!(terms.len(), 3);
                assert!(matches!(&terms[2], RuleExpr::And(inner) if inner.len() == 2));
            }
            other => panic!("Expected OR node, got {:?}", other),
        }
    }

    #[test]
    fn test_long_chain_parses() {
        let source = vec!["A > 1"; 50_000].join(" AND ");
        match parse_str(&source).unwrap() {
            RuleExpr::And(terms) => assert_eq!(terms.len(), 50_000),
            other => panic!("Expected AND node, got {:?}", other),
        }
    }

    #[test]
    fn test_nesting_depth_limit() {
        let at_limit = format!(
            "{}A > 1{}",
            "(".repeat(MAX_NESTING_DEPTH),
            ")".repeat(MAX_NESTING_DEPTH)
        );
        assert_eq!(shape(&at_limit), "A > 1");

        let deep = format!("{}A > 1{}", "(".repeat(20_000), ")".repeat(20_000));
        let err = parse_str(&deep).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TooDeep);
        assert_eq!(err.span.start, MAX_NESTING_DEPTH);

        let nots = format!("{}A > 1", "NOT ".repeat(20_000));
        assert_eq!(parse_str(&nots).unwrap_err().kind, ParseErrorKind::TooDeep);
    }

    #[test]
    fn test_parentheses_override_precedence() {
        assert_eq!(
            shape("(A == 1 OR B == 2) AND C == 3"),
            "((A == 1 OR B == 2) AND C == 3)"
        );
        assert_eq!(shape("((A == 1))"), "A == 1");
    }

    #[test]
    fn test_not_binds_tightest() {
        assert_eq!(
            shape("NOT A == 1 AND B == 2"),
            "((NOT A == 1) AND B == 2)"
        );
        assert_eq!(
            shape("NOT (A == 1 AND B == 2)"),
            "(NOT (A == 1 AND B == 2))"
        );
        assert_eq!(shape("NOT NOT A == 1"), "(NOT (NOT A == 1))");
    }

    #[test]
    fn test_comparison_count() {
        assert_eq!(
            parse_str("A == 1 OR NOT (B == 2 AND C == 3)")
                .unwrap()
                .comparison_count(),
            3
        );
    }

    #[test]
    fn test_errors() {
        let err = parse_str("").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Empty);

        let err = parse_str("(A == 1").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnbalancedParentheses);
        assert_eq!(err.span.start, 0);

        let err = parse_str("A == 1)").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnbalancedParentheses);

        let err = parse_str("Height == 1").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnknownProperty("Height".to_string()));

        let err = parse_str("A == 1 == 2").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert_eq!(err.span.start, 7);

        let err = parse_str("A >").unwrap_err();
        assert!(err.message.contains("Unexpected end"));
        assert_eq!(err.span, Span::new(3, 3));

        let err = parse_str("A >> 1").unwrap_err();
        assert!(err.message.contains("Expected a value"));
    }
}
