//! Rule engine façade
//!
//! Composes the schema, tokenizer, validator, suggestion engine, compiler
//! and predicate cache behind the interface an editor front end drives.

use crate::compiler::{
    CacheKey, CompileError, CompileResult, Predicate, PredicateCache, RuleCompiler,
};
use crate::lexer::{Lexer, Token};
use crate::pretty_printer;
use crate::schema::SchemaRegistry;
use crate::suggest;
use crate::validator::{self, ValidationReport};
use sieve_core::{ConfigResult, EngineConfig, PropertyDescriptor, SchemaResult, TargetType};
use std::sync::{Arc, PoisonError, RwLock};

/// One editing session's rule engine.
///
/// All operations take `&self`. Replacing the schema swaps it atomically;
/// calls already in flight finish against the schema they started with.
#[derive(Debug)]
pub struct RuleEngine {
    schema: RwLock<Arc<SchemaRegistry>>,
    cache: Arc<PredicateCache>,
    config: EngineConfig,
}

impl RuleEngine {
    /// Create an engine with its own cache sized from the configuration.
    pub fn new(config: EngineConfig) -> ConfigResult<Self> {
        config.validate()?;
        let cache = Arc::new(PredicateCache::new(config.cache_capacity));
        Ok(Self::build(config, cache))
    }

    /// Create an engine sharing an existing cache.
    pub fn with_cache(config: EngineConfig, cache: Arc<PredicateCache>) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::build(config, cache))
    }

    fn build(config: EngineConfig, cache: Arc<PredicateCache>) -> Self {
        Self {
            schema: RwLock::new(Arc::new(SchemaRegistry::default())),
            cache,
            config,
        }
    }

    /// Replace the schema with the given properties.
    pub fn set_target_type(&self, properties: Vec<PropertyDescriptor>) -> SchemaResult<()> {
        let registry = SchemaRegistry::new(properties)?;
        tracing::debug!(
            properties = registry.len(),
            fingerprint = %hex::encode(registry.fingerprint()),
            "schema replaced"
        );
        *self.schema.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(registry);
        Ok(())
    }

    /// Replace the schema with a host type's own description.
    pub fn set_target<T: TargetType>(&self) -> SchemaResult<()> {
        self.set_target_type(T::properties())
    }

    /// Snapshot of the current schema.
    pub fn schema(&self) -> Arc<SchemaRegistry> {
        Arc::clone(&self.schema.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn cache(&self) -> &Arc<PredicateCache> {
        &self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        self.tokenize_with(text, &self.schema())
    }

    fn tokenize_with(&self, text: &str, schema: &SchemaRegistry) -> Vec<Token> {
        Lexer::new(text, schema)
            .with_permissive_values(self.config.permissive_values)
            .tokenize()
    }

    /// Validate tokens in place, setting each token's error flag.
    pub fn validate(&self, tokens: &mut [Token]) -> ValidationReport {
        validator::validate(tokens, &self.schema())
    }

    /// Tokenize and validate in one step.
    pub fn validate_text(&self, text: &str) -> (Vec<Token>, ValidationReport) {
        let schema = self.schema();
        let mut tokens = self.tokenize_with(text, &schema);
        let report = validator::validate(&mut tokens, &schema);
        (tokens, report)
    }

    pub fn suggest(&self, tokens: &[Token], caret: usize) -> Vec<String> {
        suggest::suggest(tokens, caret, &self.schema())
    }

    pub fn suggest_text(&self, text: &str, caret: usize) -> Vec<String> {
        let schema = self.schema();
        suggest::suggest(&self.tokenize_with(text, &schema), caret, &schema)
    }

    /// Compile rule text into a predicate, reusing a cached one when the
    /// normalized text has been compiled against this schema before.
    #[tracing::instrument(skip_all)]
    pub fn compile(&self, text: &str) -> CompileResult<Predicate> {
        let schema = self.schema();
        let tokens = self.tokenize_with(text, &schema);

        if tokens.is_empty() {
            return if self.config.allow_empty_expression {
                Ok(Predicate::always_true())
            } else {
                Err(CompileError::EmptyExpression)
            };
        }

        let normalized = pretty_printer::normalize(&tokens, &schema);
        let key = CacheKey::new(schema.fingerprint(), normalized.as_str());
        if let Some(predicate) = self.cache.get(&key) {
            return Ok(predicate);
        }

        let root = RuleCompiler::new(&schema).compile_tokens(&tokens)?;
        let predicate = Predicate::new(root, normalized);
        self.cache.insert(key, predicate.clone());
        tracing::debug!(source = %predicate.source(), "rule compiled");
        Ok(predicate)
    }

    /// Re-render rule text with canonical line breaks and indentation.
    pub fn format(&self, text: &str) -> String {
        pretty_printer::format(&self.tokenize(text), self.config.indent_width)
    }

    /// Canonical single-line spelling of rule text.
    pub fn normalize(&self, text: &str) -> String {
        let schema = self.schema();
        pretty_printer::normalize(&self.tokenize_with(text, &schema), &schema)
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        let config = EngineConfig::default();
        let cache = Arc::new(PredicateCache::new(config.cache_capacity));
        Self::build(config, cache)
    }
}
