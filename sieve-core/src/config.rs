//! Engine configuration

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Default bound on the compiled-predicate cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Default indentation step used by the formatter.
pub const DEFAULT_INDENT_WIDTH: usize = 4;

/// Rule engine configuration.
///
/// Every field has a default, so a partial TOML document (or none at all) is
/// a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum number of compiled predicates kept in the cache
    pub cache_capacity: usize,
    /// Treat an unregistered bare word after a comparison operator as a value
    pub permissive_values: bool,
    /// Compile an empty expression to an always-true predicate instead of failing
    pub allow_empty_expression: bool,
    /// Spaces per nesting level in formatted output
    pub indent_width: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            permissive_values: true,
            allow_empty_expression: false,
            indent_width: DEFAULT_INDENT_WIDTH,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Recognized variables: `SIEVE_CACHE_CAPACITY`, `SIEVE_PERMISSIVE_VALUES`,
    /// `SIEVE_ALLOW_EMPTY_EXPRESSION`, `SIEVE_INDENT_WIDTH`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_capacity: std::env::var("SIEVE_CACHE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cache_capacity),
            permissive_values: std::env::var("SIEVE_PERMISSIVE_VALUES")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(defaults.permissive_values),
            allow_empty_expression: std::env::var("SIEVE_ALLOW_EMPTY_EXPRESSION")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(defaults.allow_empty_expression),
            indent_width: std::env::var("SIEVE_INDENT_WIDTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.indent_width),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot operate with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache_capacity".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.indent_width == 0 {
            return Err(ConfigError::InvalidValue {
                field: "indent_width".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cache_capacity, 1000);
        assert!(config.permissive_values);
        assert!(!config.allow_empty_expression);
        assert_eq!(config.indent_width, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("cache_capacity = 16\n").unwrap();
        assert_eq!(config.cache_capacity, 16);
        assert_eq!(config.indent_width, 4);
        assert!(config.permissive_values);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = EngineConfig::from_toml_str("cache_size = 3\n");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = EngineConfig::from_toml_str("cache_capacity = 0\n");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "cache_capacity"
        ));
    }
}
