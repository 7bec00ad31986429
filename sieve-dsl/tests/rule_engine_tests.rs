//! Integration tests for the rule engine's public interface
//!
//! Tests verify:
//! - End-to-end compile and evaluate against host types and JSON
//! - Validation diagnostics for malformed rules (never panics)
//! - Suggestions at the caret
//! - Empty-expression policy
//! - Cache sharing across threads and schemas

use sieve_dsl::{
    CompileError, DiagnosticKind, EngineConfig, PredicateCache, PropertyDescriptor, PropertyType,
    RuleEngine, SchemaError, TargetType, MAX_NESTING_DEPTH,
};
use sieve_test_utils::assertions::*;
use sieve_test_utils::fixtures::*;
use std::sync::Arc;

fn age_name_engine() -> RuleEngine {
    let engine = RuleEngine::default();
    engine
        .set_target_type(age_name_properties())
        .expect("valid schema");
    engine
}

fn person_engine() -> RuleEngine {
    let engine = RuleEngine::default();
    engine.set_target::<Person>().expect("valid schema");
    engine
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_compile_and_evaluate_json_targets() {
    let engine = age_name_engine();
    let predicate = engine
        .compile("Age > 18 AND Name CONTAINS 'John'")
        .expect("rule compiles");

    assert!(predicate.evaluate(&person_json(25, "John Doe")));
    assert!(!predicate.evaluate(&person_json(10, "John Doe")));
}

#[test]
fn test_double_operator_is_reported_not_thrown() {
    let (tokens, report) = age_name_engine().validate_text("Age >> 5");

    assert!(!report.is_valid());
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].position(), 5);
    assert_eq!(report.diagnostics[0].len(), 1);
    assert!(tokens[2].has_error());
}

#[test]
fn test_unbalanced_parenthesis_blocks_compile() {
    let engine = age_name_engine();
    let (_, report) = engine.validate_text("(Age > 18");

    assert_eq!(report.of_kind(DiagnosticKind::Parenthesis).count(), 1);
    assert_eq!(
        engine.compile("(Age > 18").unwrap_err(),
        CompileError::UnbalancedParentheses { position: 0 }
    );
}

#[test]
fn test_suggest_operators_after_string_property() {
    let suggestions = age_name_engine().suggest_text("Name ", 5);
    assert_same_elements(
        &suggestions,
        &["==", "!=", "CONTAINS", "STARTSWITH", "ENDSWITH"],
    );
}

#[test]
fn test_empty_expression() {
    let engine = age_name_engine();
    let (tokens, report) = engine.validate_text("");

    assert!(tokens.is_empty());
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, DiagnosticKind::Empty);
    assert_eq!(engine.compile("").unwrap_err(), CompileError::EmptyExpression);

    let lenient = RuleEngine::new(EngineConfig {
        allow_empty_expression: true,
        ..EngineConfig::default()
    })
    .expect("valid config");
    let predicate = lenient.compile("  ").expect("empty compiles");
    assert!(predicate.evaluate(&john_doe()));
}

// ============================================================================
// HOST TYPE TARGETS
// ============================================================================

#[test]
fn test_person_rules() {
    let engine = person_engine();
    let people = [john_doe(), young_john(), jane_smith()];

    let adults = engine.compile("Age >= 18").expect("rule compiles");
    assert_partitions(
        |p: &Person| adults.evaluate(p),
        &[john_doe(), jane_smith()],
        &[young_john()],
    );

    let closed = engine
        .compile("status == Closed AND NOT Active == true")
        .expect("rule compiles");
    let matches: Vec<&str> = people
        .iter()
        .filter(|p| closed.evaluate(*p))
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(matches, vec!["Jane Smith"]);

    let joined = engine
        .compile("Joined < '2024-02-01' AND Score <= 0.5")
        .expect("rule compiles");
    assert!(joined.evaluate(&john_doe()));
    assert!(!joined.evaluate(&jane_smith()));
}

#[test]
fn test_allowed_values_are_enforced() {
    let engine = person_engine();

    let (_, report) = engine.validate_text("Status == 'Archived'");
    assert_eq!(report.of_kind(DiagnosticKind::Type).count(), 1);
    assert!(matches!(
        engine.compile("Status == 'Archived'"),
        Err(CompileError::ValueNotAllowed { .. })
    ));

    assert_same_elements(
        &engine.suggest_text("Status == ", 10),
        &["Open", "Closed", "Pending"],
    );
}

#[test]
fn test_unknown_property_is_distinct_from_syntax() {
    let (_, report) = person_engine().validate_text("Height > 5 OR Age > 1");

    assert_eq!(report.unknown_properties, vec!["Height".to_string()]);
    assert_eq!(report.of_kind(DiagnosticKind::UnknownProperty).count(), 1);
    assert_eq!(report.of_kind(DiagnosticKind::Syntax).count(), 0);
}

#[test]
fn test_chained_comparison_is_rejected() {
    let engine = person_engine();
    let (_, report) = engine.validate_text("Age == 1 == 2");

    assert!(!report.is_valid());
    assert!(matches!(
        engine.compile("Age == 1 == 2"),
        Err(CompileError::Syntax { .. })
    ));
}

#[test]
fn test_format_is_idempotent_through_engine() {
    let engine = person_engine();
    let once = engine.format("(age > 18 and name contains 'x') or not active == true");

    assert_eq!(
        once,
        "(\n    age > 18\n    AND name CONTAINS 'x'\n)\nOR NOT active == true"
    );
    assert_eq!(engine.format(&once), once);
}

#[test]
fn test_allowed_values_match_in_any_case() {
    let engine = person_engine();
    let (_, report) = engine.validate_text("Status == 'closed'");
    assert!(report.is_valid());

    let closed = engine.compile("Status == 'closed'").expect("rule compiles");
    assert_partitions(
        |p: &Person| closed.evaluate(p),
        &[jane_smith()],
        &[john_doe(), young_john()],
    );
}

#[test]
fn test_reserved_property_names_are_rejected() {
    let engine = age_name_engine();
    for name in ["Not", "Contains", "true"] {
        let properties = vec![PropertyDescriptor::new(name, PropertyType::Boolean)];
        let result = engine.set_target_type(properties);
        assert_eq!(
            result,
            Err(SchemaError::InvalidPropertyName {
                name: name.to_string()
            })
        );
    }
    // The previous schema stays in place
    assert_eq!(engine.schema().len(), 2);
}

// ============================================================================
// LARGE INPUTS
// ============================================================================

#[test]
fn test_long_connective_chains_compile() {
    let engine = person_engine();

    let all = vec!["Age > 1"; 50_000].join(" AND ");
    assert!(engine.validate_text(&all).1.is_valid());
    let predicate = engine.compile(&all).expect("rule compiles");
    assert!(predicate.evaluate(&john_doe()));

    let any = vec!["Name == 'nobody'"; 50_000].join(" OR ");
    let predicate = engine.compile(&any).expect("rule compiles");
    assert!(!predicate.evaluate(&john_doe()));
}

#[test]
fn test_deep_nesting_is_reported_not_overflowed() {
    let engine = person_engine();
    let deep = format!("{}Age > 1{}", "(".repeat(20_000), ")".repeat(20_000));

    let (_, report) = engine.validate_text(&deep);
    assert_eq!(report.of_kind(DiagnosticKind::Nesting).count(), 1);
    assert_eq!(
        engine.compile(&deep).unwrap_err(),
        CompileError::NestingTooDeep {
            position: MAX_NESTING_DEPTH,
            limit: MAX_NESTING_DEPTH,
        }
    );

    let nots = format!("{}Age > 1", "NOT ".repeat(20_000));
    assert!(matches!(
        engine.compile(&nots),
        Err(CompileError::NestingTooDeep { .. })
    ));
}

// ============================================================================
// CACHE
// ============================================================================

#[test]
fn test_concurrent_compiles_share_cache() {
    let engine = Arc::new(person_engine());

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                for _ in 0..50 {
                    let predicate = engine.compile("Age > 18 OR Name == 'x'").expect("compiles");
                    assert!(predicate.evaluate(&john_doe()));
                }
            });
        }
    });

    let stats = engine.cache().stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.hits + stats.misses, 400);
}

#[test]
fn test_shared_cache_keeps_schemas_apart() {
    let cache = Arc::new(PredicateCache::new(16));
    let integer_age = RuleEngine::with_cache(EngineConfig::default(), Arc::clone(&cache))
        .expect("valid config");
    integer_age
        .set_target_type(age_name_properties())
        .expect("valid schema");
    let person = RuleEngine::with_cache(EngineConfig::default(), Arc::clone(&cache))
        .expect("valid config");
    person.set_target_type(Person::properties()).expect("valid schema");

    let a = integer_age.compile("Age > 18").expect("compiles");
    let b = person.compile("Age > 18").expect("compiles");

    assert!(!a.ptr_eq(&b));
    assert_eq!(cache.stats().entries, 2);
}

#[test]
fn test_cache_bound_evicts_oldest() {
    let engine = RuleEngine::new(EngineConfig {
        cache_capacity: 2,
        ..EngineConfig::default()
    })
    .expect("valid config");
    engine.set_target::<Person>().expect("valid schema");

    let first = engine.compile("Age > 1").expect("compiles");
    engine.compile("Age > 2").expect("compiles");
    engine.compile("Age > 3").expect("compiles");

    let again = engine.compile("Age > 1").expect("compiles");
    assert!(!first.ptr_eq(&again));
    assert!(engine.cache().stats().evictions >= 1);
    assert_eq!(engine.cache().len(), 2);
}
