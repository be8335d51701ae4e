//! Diagnostic codes for non-fatal run conditions
//!
//! Codes are stable strings: they appear in run reports.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    /// Definition has no `MODEL (name ...)` directive
    MissingModelName,

    /// Definition yields no SQL once directives and comments are stripped
    EmptyModelBody,

    /// Two definitions declare the same model name
    DuplicateModelName,

    /// Transpilation failed and the source SQL was used instead
    TranspileFailed,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingModelName => "MISSING_MODEL_NAME",
            Self::EmptyModelBody => "EMPTY_MODEL_BODY",
            Self::DuplicateModelName => "DUPLICATE_MODEL_NAME",
            Self::TranspileFailed => "TRANSPILE_FAILED",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A warning raised during a run, with structured metadata
///
/// Every diagnostic is a warning: fatal conditions are returned as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Human-readable message
    pub message: String,

    /// Model the diagnostic is about, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Definition the diagnostic came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Diagnostic {
    /// Create a warning with minimal fields
    pub fn warn(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            model: None,
            source: None,
        }
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the source location
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_code_stability() {
        assert_eq!(DiagnosticCode::MissingModelName.as_str(), "MISSING_MODEL_NAME");
        assert_eq!(DiagnosticCode::TranspileFailed.as_str(), "TRANSPILE_FAILED");
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::warn(DiagnosticCode::EmptyModelBody, "No SQL found")
            .with_model("nyc.empty")
            .with_source("models/empty.sql");

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("EMPTY_MODEL_BODY"));
        assert!(json.contains("nyc.empty"));
        assert!(json.contains("models/empty.sql"));
    }
}
