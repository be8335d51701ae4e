//! modelrun core
//!
//! Domain types shared by the parser, graph, store and engine crates.
//! Never rename diagnostic codes - they appear in run reports.

pub mod config;
pub mod diagnostic;
pub mod model;
pub mod report;

pub use config::{Config, ConfigError, Params, SqlDialect, CONFIG_FILE, DATABASE_ENV};
pub use diagnostic::{Diagnostic, DiagnosticCode};
pub use model::{schema_of, MaterializationKind, ModelDefinition, ParsedModel};
pub use report::{ModelOutcome, ModelStatus, ReportVersion, RunReport, RunSummary};
