//! SQL handling for model definitions
//!
//! This crate handles:
//! - Parsing model definitions (name directive, pure SQL body)
//! - Discovering dependencies between models by name
//! - Transpiling SQL between dialects with a passthrough fallback

pub mod parser;
pub mod dependencies;
pub mod transpile;

pub use parser::{ModelParser, ParseError};
pub use dependencies::{DependencyExtractor, WholeWordMatcher};
pub use transpile::{
    dialect_for, transpile, transpile_or_passthrough, SqlparserTranspiler, TranspileError, Transpiled, Transpiler,
};
