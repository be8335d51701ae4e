//! Configuration schema (modelrun.toml)

use crate::model::MaterializationKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable that overrides the configured database path
pub const DATABASE_ENV: &str = "MODELRUN_DATABASE";

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "modelrun.toml";

/// Named parameters substituted into model SQL
pub type Params = BTreeMap<String, String>;

/// SQL dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    /// DuckDB, the default backing store dialect
    #[default]
    DuckDb,

    /// Databricks SQL
    Databricks,

    /// BigQuery SQL dialect
    BigQuery,

    /// Snowflake SQL dialect
    Snowflake,

    /// PostgreSQL SQL dialect
    Postgres,

    /// Generic ANSI SQL
    Ansi,
}

impl SqlDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuckDb => "duckdb",
            Self::Databricks => "databricks",
            Self::BigQuery => "bigquery",
            Self::Snowflake => "snowflake",
            Self::Postgres => "postgres",
            Self::Ansi => "ansi",
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "duckdb" => Ok(Self::DuckDb),
            "databricks" => Ok(Self::Databricks),
            "bigquery" => Ok(Self::BigQuery),
            "snowflake" => Ok(Self::Snowflake),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "ansi" | "generic" => Ok(Self::Ansi),
            other => Err(format!("unknown dialect '{}'", other)),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Database file; in-memory when absent
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Dialect the model SQL is written in
    #[serde(default)]
    pub source_dialect: SqlDialect,

    /// Dialect of the backing store
    #[serde(default)]
    pub target_dialect: SqlDialect,

    /// Materialization used for every model in a run
    #[serde(default)]
    pub materialize_as: MaterializationKind,

    /// Model definition files, in the order given
    #[serde(default)]
    pub models: Vec<PathBuf>,

    /// Directory scanned recursively for `*.sql` definitions
    #[serde(default)]
    pub models_dir: Option<PathBuf>,

    /// Named parameters substituted into model SQL
    #[serde(default)]
    pub params: Params,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            source_dialect: SqlDialect::default(),
            target_dialect: SqlDialect::default(),
            materialize_as: MaterializationKind::default(),
            models: Vec::new(),
            models_dir: None,
            params: Params::new(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply the `MODELRUN_DATABASE` override, if set
    pub fn apply_env(&mut self) {
        if let Ok(database) = std::env::var(DATABASE_ENV) {
            if !database.is_empty() {
                self.database = Some(PathBuf::from(database));
            }
        }
    }

    /// Resolve a path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.project_root.join(path)
        } else {
            path.to_path_buf()
        }
    }

    /// Database path resolved against the project root
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database.as_deref().map(|p| self.resolve(p))
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.source_dialect, SqlDialect::DuckDb);
        assert_eq!(config.target_dialect, SqlDialect::DuckDb);
        assert_eq!(config.materialize_as, MaterializationKind::View);
        assert!(config.database.is_none());
    }

    #[test]
    fn parse_full_config() {
        let config = Config::from_toml(
            r#"
            database = "yellow_taxi.duckdb"
            target_dialect = "databricks"
            materialize_as = "table"
            models = ["models/seed.sql", "models/cleaned.sql"]

            [params]
            start_date = "2024-01-01"
            "#,
        )
        .unwrap();

        assert_eq!(config.database, Some(PathBuf::from("yellow_taxi.duckdb")));
        assert_eq!(config.source_dialect, SqlDialect::DuckDb);
        assert_eq!(config.target_dialect, SqlDialect::Databricks);
        assert_eq!(config.materialize_as, MaterializationKind::Table);
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.params.get("start_date").map(String::as_str), Some("2024-01-01"));
    }

    #[test]
    fn reject_unknown_dialect() {
        let result = Config::from_toml(r#"source_dialect = "oracle""#);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn dialect_from_str() {
        assert_eq!("DuckDB".parse::<SqlDialect>().unwrap(), SqlDialect::DuckDb);
        assert_eq!("postgresql".parse::<SqlDialect>().unwrap(), SqlDialect::Postgres);
        assert!("oracle".parse::<SqlDialect>().is_err());
    }

    #[test]
    fn from_file_sets_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "database = \"warehouse.duckdb\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.project_root, dir.path());
        assert_eq!(config.database_path(), Some(dir.path().join("warehouse.duckdb")));
    }

    #[test]
    fn database_env_overrides_file() {
        let toml = r#"database = "warehouse.duckdb""#;

        std::env::set_var(DATABASE_ENV, "override.duckdb");
        let mut config = Config::from_toml(toml).unwrap();
        config.apply_env();
        assert_eq!(config.database, Some(PathBuf::from("override.duckdb")));

        // an empty value leaves the configured database alone
        std::env::set_var(DATABASE_ENV, "");
        let mut config = Config::from_toml(toml).unwrap();
        config.apply_env();
        assert_eq!(config.database, Some(PathBuf::from("warehouse.duckdb")));

        std::env::remove_var(DATABASE_ENV);
    }
}
