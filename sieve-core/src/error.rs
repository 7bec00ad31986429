//! Error types for schema registration and configuration

use thiserror::Error;

/// Errors raised while registering a target type's properties.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Duplicate property: '{name}' is already registered (names are case-insensitive)")]
    DuplicateProperty { name: String },

    #[error("Invalid property name '{name}': names must be [A-Za-z_][A-Za-z0-9_]* and not a reserved word")]
    InvalidPropertyName { name: String },

    #[error("Property '{name}' declares an empty allowed-value set")]
    EmptyAllowedValues { name: String },
}

/// Errors raised while loading engine configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

pub type SchemaResult<T> = Result<T, SchemaError>;
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display_duplicate() {
        let err = SchemaError::DuplicateProperty {
            name: "Age".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Duplicate property"));
        assert!(msg.contains("Age"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "cache_capacity".to_string(),
            reason: "must be greater than zero".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("cache_capacity"));
        assert!(msg.contains("greater than zero"));
    }
}
