//! Fuzz test for the rule tokenizer
//!
//! Every byte of the input must land in exactly one token or be whitespace,
//! and token spans must sit on char boundaries.
//!
//! Run with: cargo +nightly fuzz run tokenizer_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use sieve_dsl::{tokenize, PropertyDescriptor, PropertyType, SchemaRegistry};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(schema) = SchemaRegistry::new(vec![
        PropertyDescriptor::new("Age", PropertyType::Integer),
        PropertyDescriptor::new("Name", PropertyType::String),
    ]) else {
        return;
    };

    let tokens = tokenize(input, &schema);

    let mut cursor = 0;
    for token in &tokens {
        assert!(token.span.start >= cursor, "tokens overlap");
        assert!(token.span.start < token.span.end, "empty token");
        assert!(input.is_char_boundary(token.span.start));
        assert!(input.is_char_boundary(token.span.end));
        assert!(input[cursor..token.span.start].chars().all(char::is_whitespace));
        assert_eq!(&input[token.span.start..token.span.end], token.text);
        cursor = token.span.end;
    }
    assert!(input[cursor..].chars().all(char::is_whitespace));
});
