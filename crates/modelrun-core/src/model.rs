//! Model definitions and their parsed form
//!
//! Both types are rebuilt from the definition files on every run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a model is persisted in the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterializationKind {
    /// Re-evaluated on every read
    #[default]
    View,

    /// Computed once and stored
    Table,
}

impl MaterializationKind {
    /// SQL keyword used in `CREATE OR REPLACE <kind>`
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::View => "VIEW",
            Self::Table => "TABLE",
        }
    }
}

impl fmt::Display for MaterializationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::View => write!(f, "view"),
            Self::Table => write!(f, "table"),
        }
    }
}

impl FromStr for MaterializationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "view" => Ok(Self::View),
            "table" => Ok(Self::Table),
            other => Err(format!("unknown materialization '{}' (expected view or table)", other)),
        }
    }
}

/// A model definition as read from its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDefinition {
    /// Declared model name, absent when no `MODEL (name ...)` directive was found
    pub name: Option<String>,

    /// Full definition text, directives included
    pub raw_text: String,

    /// Where the definition came from (usually a file path)
    pub source_location: String,
}

impl ModelDefinition {
    pub fn new(name: Option<String>, raw_text: impl Into<String>, source_location: impl Into<String>) -> Self {
        Self {
            name,
            raw_text: raw_text.into(),
            source_location: source_location.into(),
        }
    }
}

/// A model ready for dependency analysis and materialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedModel {
    /// Model name, possibly schema-qualified (`schema.model`)
    pub name: String,

    /// SQL body with directives, blank lines and comment-only lines removed
    pub pure_sql: String,

    /// How the model is materialized
    pub materialization: MaterializationKind,

    /// Source location of the definition this model was parsed from
    pub source_location: String,
}

impl ParsedModel {
    pub fn new(
        name: impl Into<String>,
        pure_sql: impl Into<String>,
        materialization: MaterializationKind,
    ) -> Self {
        Self {
            name: name.into(),
            pure_sql: pure_sql.into(),
            materialization,
            source_location: String::new(),
        }
    }

    /// Set the source location
    pub fn with_source(mut self, source_location: impl Into<String>) -> Self {
        self.source_location = source_location.into();
        self
    }

    /// True when there is no SQL to execute
    pub fn is_empty(&self) -> bool {
        self.pure_sql.trim().is_empty()
    }

    /// Schema prefix of a qualified name (`nyc` for `nyc.trips`)
    pub fn schema(&self) -> Option<&str> {
        schema_of(&self.name)
    }
}

/// Schema prefix of a model name, if it is schema-qualified
pub fn schema_of(name: &str) -> Option<&str> {
    name.split_once('.').map(|(schema, _)| schema)
}
