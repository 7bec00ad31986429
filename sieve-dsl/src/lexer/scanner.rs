//! Lexer implementation

use super::token::*;
use crate::schema::SchemaRegistry;
use std::iter::Peekable;
use std::str::CharIndices;

/// Operator literals, longest first so `>=` wins over `>`.
const OPERATORS: [(&str, TokenKind); 12] = [
    ("STARTSWITH", TokenKind::Operator),
    ("CONTAINS", TokenKind::Operator),
    ("ENDSWITH", TokenKind::Operator),
    ("AND", TokenKind::LogicalOperator),
    ("NOT", TokenKind::LogicalOperator),
    ("==", TokenKind::Operator),
    ("!=", TokenKind::Operator),
    (">=", TokenKind::Operator),
    ("<=", TokenKind::Operator),
    ("OR", TokenKind::LogicalOperator),
    (">", TokenKind::Operator),
    ("<", TokenKind::Operator),
];

/// Tokenize `source` against a schema with default (permissive) settings.
pub fn tokenize(source: &str, schema: &SchemaRegistry) -> Vec<Token> {
    Lexer::new(source, schema).tokenize()
}

/// Single left-to-right scanner for rule expressions.
///
/// Every non-whitespace byte of the input ends up in exactly one token;
/// characters nothing else claims become one-character `Unknown` tokens.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    pos: usize,
    schema: &'a SchemaRegistry,
    permissive_values: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str, schema: &'a SchemaRegistry) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            pos: 0,
            schema,
            permissive_values: true,
            tokens: Vec::new(),
        }
    }

    /// Whether unregistered bare words after a comparison operator are values.
    pub fn with_permissive_values(mut self, permissive: bool) -> Self {
        self.permissive_values = permissive;
        self
    }

    /// Tokenize the entire source.
    pub fn tokenize(mut self) -> Vec<Token> {
        loop {
            self.skip_whitespace();
            if self.peek_char().is_none() {
                break;
            }
            let token = self.next_token();
            self.tokens.push(token);
        }
        self.tokens
    }

    fn next_token(&mut self) -> Token {
        let start = self.pos;

        let kind = match self.peek_char() {
            Some('(') => {
                self.advance();
                TokenKind::OpenParen
            }
            Some(')') => {
                self.advance();
                TokenKind::CloseParen
            }
            Some(quote @ ('\'' | '"')) => self.scan_string(quote),
            Some(c) => {
                if let Some(kind) = self.scan_operator() {
                    kind
                } else if continues_word(c) || self.at_negative_number() {
                    self.scan_word()
                } else {
                    self.advance();
                    TokenKind::Unknown
                }
            }
            None => TokenKind::Unknown,
        };

        Token::new(kind, &self.source[start..self.pos], Span::new(start, self.pos))
    }

    /// Match an operator at the current position, longest literal first.
    ///
    /// Word operators only match when not followed by a letter, digit or
    /// `_`, so `Android`, `ORDER_ID` and `ANDé` are not split.
    fn scan_operator(&mut self) -> Option<TokenKind> {
        let source = self.source;
        let rest = &source[self.pos..];

        for (literal, kind) in OPERATORS {
            let Some(head) = rest.get(..literal.len()) else {
                continue;
            };
            if !head.eq_ignore_ascii_case(literal) {
                continue;
            }
            let is_word = literal.starts_with(|c: char| c.is_ascii_alphabetic());
            if is_word && rest[literal.len()..].starts_with(continues_word) {
                continue;
            }
            for _ in 0..literal.len() {
                self.advance();
            }
            return Some(kind);
        }

        None
    }

    /// Scan a quoted literal. Unterminated literals run to end of input and
    /// are reported as `Unknown`.
    fn scan_string(&mut self, quote: char) -> TokenKind {
        self.advance(); // consume opening quote

        loop {
            match self.advance() {
                None => return TokenKind::Unknown,
                Some(c) if c == quote => return TokenKind::Value,
                Some(_) => {}
            }
        }
    }

    /// Scan a word run (with an optional fraction for numbers) and classify it.
    fn scan_word(&mut self) -> TokenKind {
        let start = self.pos;

        if self.peek_char() == Some('-') {
            self.advance();
        }
        while self.peek_char().is_some_and(continues_word) {
            self.advance();
        }

        let integral = &self.source[start..self.pos];
        if is_integer_text(integral)
            && self.peek_char() == Some('.')
            && self.peek_next_char().is_some_and(|c| c.is_ascii_digit())
        {
            self.advance(); // .
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let word = &self.source[start..self.pos];
        self.classify_word(word)
    }

    fn classify_word(&self, word: &str) -> TokenKind {
        if is_literal_word(word) {
            TokenKind::Value
        } else if self.schema.contains(word) {
            TokenKind::Property
        } else if self.permissive_values && self.previous_kind() == Some(TokenKind::Operator) {
            TokenKind::Value
        } else {
            TokenKind::Unknown
        }
    }

    /// A `-` directly followed by a digit, in value position.
    fn at_negative_number(&self) -> bool {
        self.source[self.pos..].starts_with('-')
            && self.peek_next_char().is_some_and(|c| c.is_ascii_digit())
            && self.previous_kind() == Some(TokenKind::Operator)
    }

    fn previous_kind(&self) -> Option<TokenKind> {
        self.tokens.last().map(|t| t.kind)
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.source[self.pos..].chars();
        iter.next();
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((i, c)) = self.chars.next() {
            self.pos = i + c.len_utf8();
            Some(c)
        } else {
            None
        }
    }
}

/// Letters and digits in any script, plus `_`. A word run never splits
/// between two of these.
fn continues_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Boolean or numeric literal text.
pub(crate) fn is_literal_word(word: &str) -> bool {
    word.eq_ignore_ascii_case("true") || word.eq_ignore_ascii_case("false") || is_number_text(word)
}

fn is_integer_text(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_number_text(text: &str) -> bool {
    match text.split_once('.') {
        Some((int, frac)) => {
            is_integer_text(int) && !frac.is_empty() && frac.chars().all(|c| c.is_ascii_digit())
        }
        None => is_integer_text(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_core::{PropertyDescriptor, PropertyType};

    fn schema() -> SchemaRegistry {
        SchemaRegistry::new(vec![
            PropertyDescriptor::new("Age", PropertyType::Integer),
            PropertyDescriptor::new("Name", PropertyType::String),
            PropertyDescriptor::new("Android", PropertyType::Boolean),
        ])
        .unwrap()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, &schema()).into_iter().map(|t| t.kind).collect()
    }

    fn texts(source: &str) -> Vec<String> {
        tokenize(source, &schema()).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_basic_expression() {
        use TokenKind::*;
        assert_eq!(
            kinds("Age > 18 AND Name CONTAINS 'John'"),
            vec![Property, Operator, Value, LogicalOperator, Property, Operator, Value]
        );
    }

    #[test]
    fn test_spans_point_into_source() {
        let source = "Age >= 18";
        let tokens = tokenize(source, &schema());
        assert_eq!(tokens[0].span, Span::new(0, 3));
        assert_eq!(tokens[1].span, Span::new(4, 6));
        assert_eq!(tokens[1].text, ">=");
        assert_eq!(tokens[2].span, Span::new(7, 9));
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(texts("Age>=18"), vec!["Age", ">=", "18"]);
        assert_eq!(texts("Age<=18"), vec!["Age", "<=", "18"]);
        assert_eq!(texts("Age!=18"), vec!["Age", "!=", "18"]);
    }

    #[test]
    fn test_word_operator_needs_boundary() {
        use TokenKind::*;
        assert_eq!(kinds("Android == true"), vec![Property, Operator, Value]);
        assert_eq!(kinds("ORDER"), vec![Unknown]);
        assert_eq!(kinds("Name contains 'x'"), vec![Property, Operator, Value]);
        assert_eq!(kinds("Name CONTAINS'x'"), vec![Property, Operator, Value]);
    }

    #[test]
    fn test_word_operator_boundary_is_unicode_aware() {
        use TokenKind::*;
        assert_eq!(texts("ANDé"), vec!["ANDé"]);
        assert_eq!(kinds("ANDé"), vec![Unknown]);
        assert_eq!(
            kinds("Age > 1 ORÆ Name == 'x'"),
            vec![Property, Operator, Value, Unknown, Property, Operator, Value]
        );
        assert_eq!(kinds("Name containsß 'x'")[1], Unknown);
        // Non-alphanumeric neighbours still end the operator
        assert_eq!(kinds("Age > 1 AND\u{2003}Age < 3")[3], LogicalOperator);
    }

    #[test]
    fn test_case_insensitive_properties_and_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("age > 1 and name startswith 'J'"),
            vec![Property, Operator, Value, LogicalOperator, Property, Operator, Value]
        );
    }

    #[test]
    fn test_unterminated_string_is_unknown() {
        let tokens = tokenize("Name == 'John", &schema());
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].kind, TokenKind::Unknown);
        assert_eq!(tokens[2].text, "'John");
    }

    #[test]
    fn test_double_quoted_string() {
        let tokens = tokenize("Name == \"it's\"", &schema());
        assert_eq!(tokens[2].kind, TokenKind::Value);
        assert_eq!(tokens[2].text, "\"it's\"");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(texts("Age > 3.25"), vec!["Age", ">", "3.25"]);
        assert_eq!(texts("Age > -5"), vec!["Age", ">", "-5"]);
        assert_eq!(kinds("Age > -5")[2], TokenKind::Value);
        // A dangling dot is not part of the number
        assert_eq!(texts("Age > 3."), vec!["Age", ">", "3", "."]);
    }

    #[test]
    fn test_minus_outside_value_position_is_unknown() {
        use TokenKind::*;
        assert_eq!(kinds("Age -5"), vec![Property, Unknown, Value]);
    }

    #[test]
    fn test_bare_word_after_operator_is_value() {
        use TokenKind::*;
        assert_eq!(kinds("Name == John"), vec![Property, Operator, Value]);
        // After a logical operator a bare word stays unknown
        assert_eq!(
            kinds("Age > 1 AND Height > 2"),
            vec![Property, Operator, Value, LogicalOperator, Unknown, Operator, Value]
        );
    }

    #[test]
    fn test_strict_mode_keeps_bare_words_unknown() {
        let schema = schema();
        let tokens = Lexer::new("Name == John", &schema)
            .with_permissive_values(false)
            .tokenize();
        assert_eq!(tokens[2].kind, TokenKind::Unknown);
    }

    #[test]
    fn test_adjacent_operators_tokenized_independently() {
        use TokenKind::*;
        assert_eq!(kinds("Age >> 5"), vec![Property, Operator, Operator, Value]);
        assert_eq!(kinds("Age > > 5"), vec![Property, Operator, Operator, Value]);
    }

    #[test]
    fn test_unmatched_characters_are_single_unknowns() {
        let tokens = tokenize("Age = 5 é", &schema());
        let unknowns: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Unknown)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(unknowns, vec!["=", "é"]);
    }

    #[test]
    fn test_empty_and_whitespace_inputs() {
        assert!(tokenize("", &schema()).is_empty());
        assert!(tokenize("  \t\n ", &schema()).is_empty());
    }

    #[test]
    fn test_empty_schema_makes_identifiers_unknown() {
        let empty = SchemaRegistry::default();
        let tokens = tokenize("Age > 5", &empty);
        assert_eq!(tokens[0].kind, TokenKind::Unknown);
        assert_eq!(tokens[1].kind, TokenKind::Operator);
        assert_eq!(tokens[2].kind, TokenKind::Value);
    }

    #[test]
    fn test_parens() {
        use TokenKind::*;
        assert_eq!(
            kinds("(Age > 1)"),
            vec![OpenParen, Property, Operator, Value, CloseParen]
        );
    }
}
