//! Fuzz test for the full editing pipeline
//!
//! Tokenize, validate, suggest at every caret, format and compile must
//! return normally for any input.
//!
//! Run with: cargo +nightly fuzz run pipeline_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use sieve_dsl::{PropertyDescriptor, PropertyType, RuleEngine};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let engine = RuleEngine::default();
    let schema = vec![
        PropertyDescriptor::new("Age", PropertyType::Integer),
        PropertyDescriptor::new("Name", PropertyType::String),
        PropertyDescriptor::new("Score", PropertyType::Decimal),
        PropertyDescriptor::new("Active", PropertyType::Boolean),
        PropertyDescriptor::new("Joined", PropertyType::DateTime),
        PropertyDescriptor::new("Status", PropertyType::String)
            .with_allowed_values(["Open", "Closed"]),
    ];
    if engine.set_target_type(schema).is_err() {
        return;
    }

    let (tokens, report) = engine.validate_text(input);
    for diagnostic in &report.diagnostics {
        assert!(diagnostic.position() + diagnostic.len() <= input.len());
    }

    for caret in 0..=input.len() {
        let _ = engine.suggest(&tokens, caret);
    }

    let formatted = engine.format(input);
    assert_eq!(engine.format(&formatted), formatted, "format is not idempotent");

    let compiled = engine.compile(input);
    if report.is_valid() {
        assert!(compiled.is_ok(), "valid rule failed to compile");
    }
});
