//! Sieve Test Utilities
//!
//! Centralized test infrastructure for the Sieve workspace:
//! - Proptest generators for schemas, literals and rule text
//! - Test fixtures for a sample target type
//! - Custom assertions for rule-engine results

// Re-export core types for convenience
pub use sieve_core::{
    is_reserved, CompareOp, ConfigError, ConfigResult, EngineConfig, LogicalOp,
    PropertyAccessor, PropertyDescriptor, PropertyType, SchemaError, SchemaResult, TargetType,
    Timestamp, Value, RESERVED_WORDS,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating rule-engine inputs.

    use super::*;
    use proptest::prelude::*;

    // === Schema Generators ===

    /// Generate a property type, including a host-defined one.
    pub fn arb_property_type() -> impl Strategy<Value = PropertyType> {
        prop_oneof![
            Just(PropertyType::String),
            Just(PropertyType::Integer),
            Just(PropertyType::Decimal),
            Just(PropertyType::Boolean),
            Just(PropertyType::DateTime),
            Just(PropertyType::Custom("Color".to_string())),
        ]
    }

    /// Generate a property name that is not a reserved word.
    pub fn arb_property_name() -> impl Strategy<Value = String> {
        "[A-Z][a-zA-Z0-9_]{0,10}".prop_filter("reserved word", |name| !is_reserved(name))
    }

    /// Generate an unrestricted property descriptor.
    pub fn arb_property_descriptor() -> impl Strategy<Value = PropertyDescriptor> {
        (arb_property_name(), arb_property_type())
            .prop_map(|(name, ty)| PropertyDescriptor::new(name, ty))
    }

    /// Generate 1-5 descriptors with case-insensitively unique names.
    pub fn arb_schema_properties() -> impl Strategy<Value = Vec<PropertyDescriptor>> {
        prop::collection::vec(arb_property_descriptor(), 1..6).prop_map(|descriptors| {
            let mut unique: Vec<PropertyDescriptor> = Vec::new();
            for descriptor in descriptors {
                if !unique
                    .iter()
                    .any(|d| d.name.eq_ignore_ascii_case(&descriptor.name))
                {
                    unique.push(descriptor);
                }
            }
            unique
        })
    }

    // === Operator Generators ===

    /// Generate any comparison operator.
    pub fn arb_compare_op() -> impl Strategy<Value = CompareOp> {
        prop::sample::select(CompareOp::ALL.to_vec())
    }

    /// Generate a binary connective.
    pub fn arb_connective() -> impl Strategy<Value = LogicalOp> {
        prop_oneof![Just(LogicalOp::And), Just(LogicalOp::Or)]
    }

    // === Literal Generators ===

    /// Generate a Timestamp (DateTime<Utc>), whole seconds.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // Generate timestamps within a reasonable range (2020-2030)
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_default()
        })
    }

    /// Generate rule literal text that parses as the given type.
    pub fn arb_literal_for(property_type: &PropertyType) -> BoxedStrategy<String> {
        match property_type {
            PropertyType::String => "'[a-zA-Z ]{0,8}'".boxed(),
            PropertyType::Integer => any::<i32>().prop_map(|n| n.to_string()).boxed(),
            PropertyType::Decimal => (-1000i32..1000, 0u8..100)
                .prop_map(|(whole, frac)| format!("{}.{:02}", whole, frac))
                .boxed(),
            PropertyType::Boolean => {
                prop_oneof![Just("true".to_string()), Just("false".to_string())].boxed()
            }
            PropertyType::DateTime => arb_timestamp()
                .prop_map(|ts| format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S")))
                .boxed(),
            PropertyType::Custom(_) => "'[a-z]{1,6}'".boxed(),
        }
    }

    /// Generate a runtime value of any variant except Null.
    pub fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            "[a-zA-Z ]{0,12}".prop_map(Value::String),
            any::<i64>().prop_map(Value::Integer),
            (-1.0e6f64..1.0e6).prop_map(Value::Decimal),
            any::<bool>().prop_map(Value::Boolean),
            arb_timestamp().prop_map(Value::DateTime),
        ]
    }

    // === Rule Text Generators ===

    /// Generate one well-formed comparison over the given properties.
    pub fn arb_comparison(properties: Vec<PropertyDescriptor>) -> BoxedStrategy<String> {
        prop::sample::select(properties)
            .prop_flat_map(|descriptor| {
                let ops = sieve_core::legal_operators(&descriptor.property_type);
                let literal = arb_literal_for(&descriptor.property_type);
                (Just(descriptor.name), prop::sample::select(ops), literal)
            })
            .prop_map(|(name, op, literal)| format!("{} {} {}", name, op, literal))
            .boxed()
    }

    /// Generate a well-formed rule: comparisons joined by connectives, with
    /// optional grouping and NOT.
    pub fn arb_rule(properties: Vec<PropertyDescriptor>) -> BoxedStrategy<String> {
        let leaf = arb_comparison(properties);
        leaf.prop_recursive(3, 16, 2, |inner| {
            prop_oneof![
                (inner.clone(), arb_connective(), inner.clone())
                    .prop_map(|(l, op, r)| format!("{} {} {}", l, op, r)),
                inner.clone().prop_map(|e| format!("({})", e)),
                inner.prop_map(|e| format!("NOT ({})", e)),
            ]
        })
        .boxed()
    }

    /// Generate arbitrary rule-like text, valid or not.
    ///
    /// Mixes grammar fragments, stray punctuation, unterminated quotes and
    /// irregular whitespace.
    pub fn arb_rule_text() -> impl Strategy<Value = String> {
        let fragment = prop_oneof![
            Just("Age".to_string()),
            Just("name".to_string()),
            Just("(".to_string()),
            Just(")".to_string()),
            Just("AND".to_string()),
            Just("or".to_string()),
            Just("NOT".to_string()),
            Just("==".to_string()),
            Just(">=".to_string()),
            Just("<".to_string()),
            Just("contains".to_string()),
            Just("-".to_string()),
            "[a-z]{1,5}",
            "[0-9]{1,4}(\\.[0-9]{1,2})?",
            "'[a-z ]{0,4}'?",
            "[=!<>&|]",
            "[ \t]{0,3}",
        ];
        prop::collection::vec(fragment, 0..16).prop_map(|parts| parts.join(" "))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Sample target type and schemas for common scenarios.

    use super::*;
    use chrono::{TimeZone, Utc};
    use serde::{Deserialize, Serialize};

    /// Sample target type exposing six rule-visible properties.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Person {
        pub name: String,
        pub age: i64,
        pub score: f64,
        pub active: bool,
        pub joined: Timestamp,
        pub status: String,
    }

    impl Person {
        pub fn new(name: impl Into<String>, age: i64) -> Self {
            Self {
                name: name.into(),
                age,
                score: 0.0,
                active: true,
                joined: Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).single().unwrap_or_default(),
                status: "Open".to_string(),
            }
        }

        pub fn with_score(mut self, score: f64) -> Self {
            self.score = score;
            self
        }

        pub fn with_active(mut self, active: bool) -> Self {
            self.active = active;
            self
        }

        pub fn with_joined(mut self, joined: Timestamp) -> Self {
            self.joined = joined;
            self
        }

        pub fn with_status(mut self, status: impl Into<String>) -> Self {
            self.status = status.into();
            self
        }
    }

    impl TargetType for Person {
        fn properties() -> Vec<PropertyDescriptor> {
            vec![
                PropertyDescriptor::new("Name", PropertyType::String),
                PropertyDescriptor::new("Age", PropertyType::Integer),
                PropertyDescriptor::new("Score", PropertyType::Decimal),
                PropertyDescriptor::new("Active", PropertyType::Boolean),
                PropertyDescriptor::new("Joined", PropertyType::DateTime),
                PropertyDescriptor::new("Status", PropertyType::String)
                    .with_allowed_values(["Open", "Closed", "Pending"]),
            ]
        }
    }

    impl PropertyAccessor for Person {
        fn property(&self, name: &str) -> Option<Value> {
            match name.to_ascii_lowercase().as_str() {
                "name" => Some(Value::from(self.name.as_str())),
                "age" => Some(Value::Integer(self.age)),
                "score" => Some(Value::Decimal(self.score)),
                "active" => Some(Value::Boolean(self.active)),
                "joined" => Some(Value::DateTime(self.joined)),
                "status" => Some(Value::from(self.status.as_str())),
                _ => None,
            }
        }
    }

    /// `Age:Integer`, `Name:String`.
    pub fn age_name_properties() -> Vec<PropertyDescriptor> {
        vec![
            PropertyDescriptor::new("Age", PropertyType::Integer),
            PropertyDescriptor::new("Name", PropertyType::String),
        ]
    }

    /// One property of every built-in type, plus a restricted one.
    pub fn all_types_properties() -> Vec<PropertyDescriptor> {
        vec![
            PropertyDescriptor::new("Title", PropertyType::String),
            PropertyDescriptor::new("Count", PropertyType::Integer),
            PropertyDescriptor::new("Ratio", PropertyType::Decimal),
            PropertyDescriptor::new("Enabled", PropertyType::Boolean),
            PropertyDescriptor::new("Created", PropertyType::DateTime),
            PropertyDescriptor::new("Color", PropertyType::Custom("Color".to_string())),
            PropertyDescriptor::new("Priority", PropertyType::String)
                .with_allowed_values(["Low", "High"]),
        ]
    }

    pub fn john_doe() -> Person {
        Person::new("John Doe", 25)
    }

    pub fn young_john() -> Person {
        Person::new("John Doe", 10)
    }

    pub fn jane_smith() -> Person {
        Person::new("Jane Smith", 41)
            .with_score(88.5)
            .with_active(false)
            .with_status("Closed")
    }

    /// JSON object with `Age` and `Name` keys.
    pub fn person_json(age: i64, name: &str) -> serde_json::Value {
        serde_json::json!({ "Age": age, "Name": name })
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for rule-engine validation.

    use super::*;
    use std::fmt::Debug;

    /// Assert that a result is Ok.
    #[track_caller]
    pub fn assert_ok<T: Debug, E: Debug>(result: &Result<T, E>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a result is Err.
    #[track_caller]
    pub fn assert_err<T: Debug, E: Debug>(result: &Result<T, E>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    /// Assert that a SchemaResult is a DuplicateProperty error for `name`.
    #[track_caller]
    pub fn assert_duplicate_property<T: Debug>(result: &SchemaResult<T>, name: &str) {
        match result {
            Err(SchemaError::DuplicateProperty { name: n }) => {
                assert!(n.eq_ignore_ascii_case(name), "Wrong duplicate name: {}", n);
            }
            other => panic!("Expected DuplicateProperty({}), got: {:?}", name, other),
        }
    }

    /// Assert that a ConfigResult rejects the given field.
    #[track_caller]
    pub fn assert_invalid_config_field<T: Debug>(result: &ConfigResult<T>, field: &str) {
        match result {
            Err(ConfigError::InvalidValue { field: f, .. }) => {
                assert_eq!(f, field, "Wrong field in InvalidValue error");
            }
            other => panic!("Expected InvalidValue for {}, got: {:?}", field, other),
        }
    }

    /// Assert two string lists hold the same elements, ignoring order.
    #[track_caller]
    pub fn assert_same_elements(actual: &[String], expected: &[&str]) {
        let mut actual_sorted: Vec<&str> = actual.iter().map(String::as_str).collect();
        let mut expected_sorted: Vec<&str> = expected.to_vec();
        actual_sorted.sort_unstable();
        expected_sorted.sort_unstable();
        assert_eq!(
            actual_sorted, expected_sorted,
            "Element sets differ: got {:?}, expected {:?}",
            actual, expected
        );
    }

    /// Assert a predicate accepts every instance in `matching` and rejects
    /// every instance in `rejected`.
    #[track_caller]
    pub fn assert_partitions<A, F>(predicate: F, matching: &[A], rejected: &[A])
    where
        A: PropertyAccessor + Debug,
        F: Fn(&A) -> bool,
    {
        for target in matching {
            assert!(predicate(target), "Expected match for {:?}", target);
        }
        for target in rejected {
            assert!(!predicate(target), "Expected no match for {:?}", target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_person_accessor_is_case_insensitive() {
        let person = john_doe();
        assert_eq!(person.property("AGE"), Some(Value::Integer(25)));
        assert_eq!(person.property("name"), Some(Value::from("John Doe")));
        assert_eq!(person.property("Height"), None);
    }

    #[test]
    fn test_person_properties_cover_accessor() {
        let person = jane_smith();
        for descriptor in Person::properties() {
            assert!(
                person.property(&descriptor.name).is_some(),
                "accessor misses {}",
                descriptor.name
            );
        }
    }
}
