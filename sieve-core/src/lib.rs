//! Sieve Core - Shared Types
//!
//! Pure data structures for the rule expression engine: property schemas,
//! typed values, operators, errors and configuration. No parsing or
//! evaluation logic lives here.

pub mod config;
pub mod error;
pub mod filter;
pub mod value;

pub use config::*;
pub use error::*;
pub use filter::*;
pub use value::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// SHA-256 content hash.
pub type ContentHash = [u8; 32];

/// Compute SHA-256 hash of content.
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

// ============================================================================
// PROPERTY SCHEMA
// ============================================================================

/// Declared type of a target property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    String,
    Integer,
    Decimal,
    Boolean,
    DateTime,
    /// Host-defined type, compared by its canonical string form
    Custom(String),
}

impl PropertyType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, PropertyType::Integer | PropertyType::Decimal)
    }

    /// Whether values of this type support `>`, `<`, `>=`, `<=`.
    pub fn is_ordered(&self) -> bool {
        self.is_numeric() || matches!(self, PropertyType::DateTime)
    }

    pub fn name(&self) -> &str {
        match self {
            PropertyType::String => "String",
            PropertyType::Integer => "Integer",
            PropertyType::Decimal => "Decimal",
            PropertyType::Boolean => "Boolean",
            PropertyType::DateTime => "DateTime",
            PropertyType::Custom(name) => name,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PropertyType {
    type Err = std::convert::Infallible;

    /// Accepts common aliases; anything unrecognized is a host-defined type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "string" | "str" | "text" => PropertyType::String,
            "integer" | "int" | "long" | "i64" => PropertyType::Integer,
            "decimal" | "float" | "double" | "number" | "f64" => PropertyType::Decimal,
            "boolean" | "bool" => PropertyType::Boolean,
            "datetime" | "date" | "timestamp" => PropertyType::DateTime,
            _ => PropertyType::Custom(s.to_string()),
        })
    }
}

/// A named, typed property of the target object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub property_type: PropertyType,
    /// When present, values are restricted to exactly these literals
    pub allowed_values: Option<Vec<String>>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            allowed_values: None,
        }
    }

    /// Restrict the property to a finite set of literal values.
    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Whether a literal (quotes stripped) belongs to the allowed-value set.
    /// Always true for unrestricted properties.
    pub fn allows(&self, literal: &str) -> bool {
        self.allowed_values.is_none() || self.allowed_spelling(literal).is_some()
    }

    /// The registered spelling of an allowed value, matched case-insensitively.
    ///
    /// `None` for unrestricted properties and for literals outside the set.
    pub fn allowed_spelling(&self, literal: &str) -> Option<&str> {
        let text = unquote(literal);
        self.allowed_values
            .as_ref()?
            .iter()
            .find(|v| v.eq_ignore_ascii_case(text))
            .map(String::as_str)
    }
}

/// A host type that can describe its own rule-visible properties.
///
/// This is the explicit registration counterpart of reflecting over a type's
/// public members.
pub trait TargetType {
    fn properties() -> Vec<PropertyDescriptor>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(compute_content_hash(b"Age"), compute_content_hash(b"Age"));
        assert_ne!(compute_content_hash(b"Age"), compute_content_hash(b"age"));
    }

    #[test]
    fn test_property_type_aliases() {
        assert_eq!("int".parse::<PropertyType>().unwrap(), PropertyType::Integer);
        assert_eq!("Text".parse::<PropertyType>().unwrap(), PropertyType::String);
        assert_eq!("date".parse::<PropertyType>().unwrap(), PropertyType::DateTime);
        assert_eq!(
            "Color".parse::<PropertyType>().unwrap(),
            PropertyType::Custom("Color".to_string())
        );
    }

    #[test]
    fn test_allowed_values_membership() {
        let status = PropertyDescriptor::new("Status", PropertyType::String)
            .with_allowed_values(["Active", "Inactive"]);
        assert!(status.allows("'Active'"));
        assert!(status.allows("inactive"));
        assert!(!status.allows("'Pending'"));

        let free = PropertyDescriptor::new("Name", PropertyType::String);
        assert!(free.allows("anything"));
    }

    #[test]
    fn test_allowed_spelling_is_registered_casing() {
        let status = PropertyDescriptor::new("Status", PropertyType::String)
            .with_allowed_values(["Open", "Closed"]);
        assert_eq!(status.allowed_spelling("'open'"), Some("Open"));
        assert_eq!(status.allowed_spelling("CLOSED"), Some("Closed"));
        assert_eq!(status.allowed_spelling("'Archived'"), None);

        let free = PropertyDescriptor::new("Name", PropertyType::String);
        assert_eq!(free.allowed_spelling("'open'"), None);
    }
}
