//! Model definition parsing
//!
//! A definition is plain SQL optionally carrying directive blocks:
//!
//! ```sql
//! MODEL (
//!   name nyc.yellow_tripdata_cleaned,
//!   kind VIEW
//! );
//!
//! -- drop zero-distance trips
//! SELECT * FROM nyc.yellow_tripdata_seed WHERE trip_distance > 0
//! ```
//!
//! The scan is textual: a directive starts on any line beginning with `MODEL`,
//! `AUDIT` or `MACRO` and ends on the next line holding only `)` or `);`.

use modelrun_core::{Diagnostic, DiagnosticCode, MaterializationKind, ModelDefinition, ParsedModel};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static MODEL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)MODEL\s*\(\s*name\s+([a-zA-Z0-9_.]+)").unwrap());

static DIRECTIVE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\)\s*;?\s*$").unwrap());

const DIRECTIVE_KEYWORDS: [&str; 3] = ["MODEL", "AUDIT", "MACRO"];

/// Reads model definitions and turns them into [`ParsedModel`]s
#[derive(Debug, Clone, Default)]
pub struct ModelParser {
    materialization: MaterializationKind,
}

impl ModelParser {
    /// Create a parser assigning `materialization` to every model it parses
    pub fn new(materialization: MaterializationKind) -> Self {
        Self { materialization }
    }

    /// Find the declared model name (`MODEL (name <identifier> ...`)
    ///
    /// Matching is case-insensitive and returns the first directive found.
    pub fn parse_name(text: &str) -> Option<String> {
        MODEL_NAME
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Strip directive blocks, blank lines and `--` comment lines
    ///
    /// Retained lines keep their indentation; the joined result is trimmed.
    pub fn extract_pure_sql(text: &str) -> String {
        let mut lines = Vec::new();
        let mut in_directive = false;

        for line in text.lines() {
            let stripped = line.trim();

            if starts_directive(stripped) {
                in_directive = true;
                continue;
            }

            if in_directive {
                if DIRECTIVE_END.is_match(stripped) {
                    in_directive = false;
                }
                continue;
            }

            if stripped.is_empty() || stripped.starts_with("--") {
                continue;
            }

            lines.push(line);
        }

        lines.join("\n").trim().to_string()
    }

    /// Build a definition from text already in memory
    pub fn definition_from_text(text: impl Into<String>, source_location: impl Into<String>) -> ModelDefinition {
        let text = text.into();
        let source_location = source_location.into();
        let name = Self::parse_name(&text);

        match &name {
            Some(name) => tracing::debug!(model = %name, source = %source_location, "Found model name"),
            None => tracing::warn!(source = %source_location, "No model name found"),
        }

        ModelDefinition::new(name, text, source_location)
    }

    /// Read a definition file
    pub fn read_definition(path: &Path) -> Result<ModelDefinition, ParseError> {
        let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::definition_from_text(text, path.display().to_string()))
    }

    /// Turn a definition into a parsed model
    ///
    /// A definition without a model name cannot take part in a run; the
    /// returned diagnostic explains why.
    pub fn parse(&self, definition: &ModelDefinition) -> Result<ParsedModel, Diagnostic> {
        let Some(name) = definition.name.as_ref() else {
            return Err(Diagnostic::warn(
                DiagnosticCode::MissingModelName,
                format!("No model name found in {}", definition.source_location),
            )
            .with_source(definition.source_location.clone()));
        };

        let pure_sql = Self::extract_pure_sql(&definition.raw_text);
        tracing::debug!(model = %name, "Extracted SQL (after removing directives):\n{}", pure_sql);

        Ok(ParsedModel::new(name.clone(), pure_sql, self.materialization)
            .with_source(definition.source_location.clone()))
    }

    /// Read and parse a definition file in one step
    pub fn parse_file(&self, path: &Path) -> Result<Result<ParsedModel, Diagnostic>, ParseError> {
        let definition = Self::read_definition(path)?;
        Ok(self.parse(&definition))
    }
}

fn starts_directive(stripped: &str) -> bool {
    let upper = stripped.to_ascii_uppercase();
    DIRECTIVE_KEYWORDS.iter().any(|keyword| upper.starts_with(keyword))
}

/// Errors reading model definitions
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to read model definition {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
