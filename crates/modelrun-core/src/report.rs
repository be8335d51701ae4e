//! Run report schema (stable v1)
//!
//! Breaking changes require a new version.

use crate::diagnostic::Diagnostic;
use crate::model::MaterializationKind;
use serde::{Deserialize, Serialize};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// What happened to a single model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Materialized,
    Skipped,
}

/// Outcome of one model in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOutcome {
    pub name: String,
    pub status: ModelStatus,
    pub materialization: MaterializationKind,

    /// Statements issued against the store, in order
    #[serde(default)]
    pub statements: Vec<String>,

    /// True when the source SQL was used because transpilation failed
    #[serde(default)]
    pub transpile_fallback: bool,
}

impl ModelOutcome {
    pub fn skipped(name: impl Into<String>, materialization: MaterializationKind) -> Self {
        Self {
            name: name.into(),
            status: ModelStatus::Skipped,
            materialization,
            statements: Vec::new(),
            transpile_fallback: false,
        }
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub models: usize,
    pub materialized: usize,
    pub skipped: usize,
    pub warnings: usize,
}

/// Run report (run.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Build order the run followed
    pub build_order: Vec<String>,

    /// Per-model outcomes in execution order
    pub models: Vec<ModelOutcome>,

    /// Non-fatal conditions encountered during the run
    pub diagnostics: Vec<Diagnostic>,

    pub summary: RunSummary,
}

impl RunReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            build_order: Vec::new(),
            models: Vec::new(),
            diagnostics: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    /// Add a diagnostic to the report
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.summary.warnings += 1;
        self.diagnostics.push(diagnostic);
    }

    pub fn extend_diagnostics(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.add_diagnostic(diagnostic);
        }
    }

    /// Record a model outcome
    pub fn add_outcome(&mut self, outcome: ModelOutcome) {
        self.summary.models += 1;
        match outcome.status {
            ModelStatus::Materialized => self.summary.materialized += 1,
            ModelStatus::Skipped => self.summary.skipped += 1,
        }
        self.models.push(outcome);
    }

    /// Look up the outcome for a model
    pub fn outcome(&self, name: &str) -> Option<&ModelOutcome> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;

    #[test]
    fn empty_report() {
        let report = RunReport::new();
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.summary, RunSummary::default());
    }

    #[test]
    fn summary_tracks_outcomes_and_warnings() {
        let mut report = RunReport::new();
        report.add_outcome(ModelOutcome {
            name: "seed".to_string(),
            status: ModelStatus::Materialized,
            materialization: MaterializationKind::View,
            statements: vec!["CREATE OR REPLACE VIEW seed AS SELECT 1".to_string()],
            transpile_fallback: false,
        });
        report.add_outcome(ModelOutcome::skipped("empty", MaterializationKind::View));
        report.add_diagnostic(Diagnostic::warn(DiagnosticCode::EmptyModelBody, "No SQL"));

        assert_eq!(report.summary.models, 2);
        assert_eq!(report.summary.materialized, 1);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.summary.warnings, 1);
        assert_eq!(report.outcome("empty").map(|o| o.status), Some(ModelStatus::Skipped));
    }

    #[test]
    fn report_serialization() {
        let report = RunReport::new();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"build_order\""));
    }

    #[test]
    fn save_to_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");

        let mut report = RunReport::new();
        report.build_order = vec!["seed".to_string(), "cleaned".to_string()];
        report.add_outcome(ModelOutcome::skipped("cleaned", MaterializationKind::Table));
        report.add_diagnostic(
            Diagnostic::warn(DiagnosticCode::EmptyModelBody, "No SQL found for model cleaned").with_model("cleaned"),
        );
        report.save_to_file(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let loaded: RunReport = serde_json::from_str(&contents).unwrap();
        assert_eq!(loaded, report);
    }
}
