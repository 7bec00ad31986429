//! Typed runtime values and the accessor seam to host objects

use crate::{PropertyType, Timestamp};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;

/// A value read from a target instance or parsed from a rule literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    DateTime(Timestamp),
    /// Host-defined value in its canonical string form
    Opaque(String),
    Null,
}

impl Value {
    /// Parse a rule literal as the given declared type.
    ///
    /// Surrounding quotes are stripped first, so `'2024-01-01'` parses as a
    /// DateTime and `'John'` as a String. Returns `None` when the literal is
    /// not a valid instance of the type.
    pub fn parse_literal(literal: &str, property_type: &PropertyType) -> Option<Value> {
        let text = unquote(literal);
        match property_type {
            PropertyType::String => Some(Value::String(text.to_string())),
            PropertyType::Integer => text.parse::<i64>().ok().map(Value::Integer),
            PropertyType::Decimal => text
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Value::Decimal),
            PropertyType::Boolean => parse_bool(text).map(Value::Boolean),
            PropertyType::DateTime => parse_datetime(text).map(Value::DateTime),
            PropertyType::Custom(_) => Some(Value::Opaque(text.to_string())),
        }
    }

    /// Convert a host-supplied value to the declared type of its property.
    ///
    /// Strings are re-parsed for non-string types (JSON payloads commonly
    /// carry dates and numbers as strings). Returns `None` on mismatch.
    pub fn coerce(&self, property_type: &PropertyType) -> Option<Value> {
        match (property_type, self) {
            (_, Value::Null) => None,
            (PropertyType::String, Value::String(_) | Value::Opaque(_)) => {
                Some(Value::String(self.to_string()))
            }
            (PropertyType::Integer, Value::Integer(_)) => Some(self.clone()),
            (PropertyType::Integer, Value::Decimal(n)) => {
                decimal_to_integer(*n).map(Value::Integer)
            }
            (PropertyType::Decimal, Value::Decimal(_)) => Some(self.clone()),
            (PropertyType::Decimal, Value::Integer(n)) => Some(Value::Decimal(*n as f64)),
            (PropertyType::Boolean, Value::Boolean(_)) => Some(self.clone()),
            (PropertyType::DateTime, Value::DateTime(_)) => Some(self.clone()),
            (PropertyType::Custom(_), value) => Some(Value::Opaque(value.to_string())),
            (ty, Value::String(s)) if !matches!(ty, PropertyType::String) => {
                Value::parse_literal(s, ty)
            }
            _ => None,
        }
    }

    /// Order two values of compatible types.
    ///
    /// Integers and decimals compare numerically with each other; every other
    /// pairing must be the same variant. Incomparable pairs yield `None`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Decimal(b)) => (*a as f64).partial_cmp(b),
            (Value::Decimal(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Decimal(a), Value::Decimal(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Opaque(a), Value::Opaque(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Opaque(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) | Value::Opaque(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Decimal(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Null => f.write_str("null"),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Decimal).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            other => Value::Opaque(other.to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Decimal(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Timestamp> for Value {
    fn from(dt: Timestamp) -> Self {
        Value::DateTime(dt)
    }
}

/// Reads named property values off a target instance.
///
/// This is the only way compiled predicates touch host data. Implementations
/// return `None` for properties the instance does not carry.
pub trait PropertyAccessor {
    fn property(&self, name: &str) -> Option<Value>;
}

impl<T: PropertyAccessor + ?Sized> PropertyAccessor for &T {
    fn property(&self, name: &str) -> Option<Value> {
        (**self).property(name)
    }
}

impl<S: BuildHasher> PropertyAccessor for HashMap<String, Value, S> {
    fn property(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().or_else(|| {
            self.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.clone())
        })
    }
}

impl PropertyAccessor for serde_json::Map<String, serde_json::Value> {
    fn property(&self, name: &str) -> Option<Value> {
        self.get(name)
            .or_else(|| {
                self.iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .map(Value::from)
    }
}

impl PropertyAccessor for serde_json::Value {
    fn property(&self, name: &str) -> Option<Value> {
        self.as_object().and_then(|map| map.property(name))
    }
}

/// Whole decimals inside the `i64` range; `as` would saturate the rest.
fn decimal_to_integer(n: f64) -> Option<i64> {
    // 2^63 is exact as an f64; i64::MAX is not
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if n.fract() == 0.0 && (-LIMIT..LIMIT).contains(&n) {
        Some(n as i64)
    } else {
        None
    }
}

/// Strip one pair of matching surrounding quotes, if present.
pub fn unquote(literal: &str) -> &str {
    let bytes = literal.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'\'' || first == b'"') && first == last {
            return &literal[1..literal.len() - 1];
        }
    }
    literal
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or a bare
/// `YYYY-MM-DD` (midnight UTC).
fn parse_datetime(text: &str) -> Option<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
