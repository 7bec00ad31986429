//! SIEVE DSL - Rule Expression Engine
//!
//! Turns boolean rule text such as `Age > 18 AND Name CONTAINS 'John'` into
//! an executable predicate over a target type described by a schema, and
//! serves the editor-facing passes (validation, suggestions, formatting) from
//! the same token list.
//!
//! Architecture:
//! ```text
//! Rule text (+ caret)
//!     ↓
//! Lexer (schema-aware token classes)
//!     ↓                    ↘
//! Validator (diagnostics)   Suggest (candidates at caret)
//!     ↓
//! Parser (tokens → RuleExpr)
//!     ↓
//! Compiler (schema + types → Predicate) ⇄ PredicateCache
//!     ↓
//! Pretty Printer (format / normalize)
//! ```

pub mod compiler;
pub mod engine;
pub mod lexer;
pub mod parser;
pub mod pretty_printer;
pub mod schema;
pub mod suggest;
pub mod validator;

// Re-export key types for convenience
pub use compiler::*;
pub use engine::RuleEngine;
pub use lexer::{tokenize, Lexer, Span, Token, TokenKind};
pub use parser::{
    parse, Comparison, ParseError, ParseErrorKind, Parser, RuleExpr, MAX_NESTING_DEPTH,
};
pub use pretty_printer::{format, normalize};
pub use schema::SchemaRegistry;
pub use suggest::suggest;
pub use validator::{validate, Diagnostic, DiagnosticKind, ValidationReport};

pub use sieve_core::{
    CompareOp, EngineConfig, LogicalOp, PropertyAccessor, PropertyDescriptor, PropertyType,
    SchemaError, SchemaResult, TargetType, Value,
};
