//! SQL dialect transpilation using datafusion-sqlparser-rs
//!
//! Transpilation never fails from the caller's point of view: when the SQL
//! cannot be rewritten, the original text is used instead.

use modelrun_core::SqlDialect;
use sqlparser::ast::{visit_expressions_mut, visit_relations_mut, Expr, Ident, ObjectName, Statement};
use sqlparser::dialect::{
    BigQueryDialect, DatabricksDialect, Dialect, DuckDbDialect, GenericDialect, PostgreSqlDialect,
    SnowflakeDialect,
};
use sqlparser::parser::Parser;
use std::ops::ControlFlow;

/// Rewrites SQL from one dialect to another
pub trait Transpiler {
    fn transpile(&self, sql: &str, source: SqlDialect, target: SqlDialect) -> Result<String, TranspileError>;
}

/// Transpilation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranspileError {
    #[error("failed to parse SQL as {dialect}: {message}")]
    Parse { dialect: SqlDialect, message: String },

    #[error("rewritten SQL is not valid {dialect}: {message}")]
    Unsupported { dialect: SqlDialect, message: String },

    #[error("no SQL statement to transpile")]
    Empty,
}

/// sqlparser dialect for a configured dialect
pub fn dialect_for(dialect: SqlDialect) -> Box<dyn Dialect> {
    match dialect {
        SqlDialect::DuckDb => Box::new(DuckDbDialect {}),
        SqlDialect::Databricks => Box::new(DatabricksDialect {}),
        SqlDialect::BigQuery => Box::new(BigQueryDialect {}),
        SqlDialect::Snowflake => Box::new(SnowflakeDialect {}),
        SqlDialect::Postgres => Box::new(PostgreSqlDialect {}),
        SqlDialect::Ansi => Box::new(GenericDialect {}),
    }
}

/// Character used to delimit identifiers in a dialect
fn identifier_quote(dialect: SqlDialect) -> char {
    match dialect {
        SqlDialect::BigQuery | SqlDialect::Databricks => '`',
        _ => '"',
    }
}

/// Transpiler built on sqlparser
///
/// Parses with the source dialect, switches delimited identifiers to the
/// target's quote character, renders the first statement and checks that the
/// target dialect accepts the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlparserTranspiler;

impl SqlparserTranspiler {
    pub fn new() -> Self {
        Self
    }
}

impl Transpiler for SqlparserTranspiler {
    fn transpile(&self, sql: &str, source: SqlDialect, target: SqlDialect) -> Result<String, TranspileError> {
        tracing::debug!("Transpiling SQL from {} to {}.", source, target);

        let statements = Parser::parse_sql(&*dialect_for(source), sql).map_err(|e| TranspileError::Parse {
            dialect: source,
            message: e.to_string(),
        })?;

        let count = statements.len();
        let mut statement = statements.into_iter().next().ok_or(TranspileError::Empty)?;
        if count > 1 {
            tracing::debug!("Keeping the first of {} statements", count);
        }

        requote(&mut statement, identifier_quote(target));
        let rendered = statement.to_string();

        Parser::parse_sql(&*dialect_for(target), &rendered).map_err(|e| TranspileError::Unsupported {
            dialect: target,
            message: e.to_string(),
        })?;

        tracing::debug!("Transpiled SQL:\n{}", rendered);
        Ok(rendered)
    }
}

fn requote(statement: &mut Statement, quote: char) {
    let _ = visit_relations_mut(statement, |name: &mut ObjectName| {
        name.0.iter_mut().for_each(|ident| requote_ident(ident, quote));
        ControlFlow::<()>::Continue(())
    });

    let _ = visit_expressions_mut(statement, |expr: &mut Expr| {
        match expr {
            Expr::Identifier(ident) => requote_ident(ident, quote),
            Expr::CompoundIdentifier(idents) => idents.iter_mut().for_each(|ident| requote_ident(ident, quote)),
            _ => {}
        }
        ControlFlow::<()>::Continue(())
    });
}

fn requote_ident(ident: &mut Ident, quote: char) {
    if matches!(ident.quote_style, Some('"') | Some('`')) {
        ident.quote_style = Some(quote);
    }
}

/// Result of a transpilation that may have fallen back to the source SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transpiled {
    /// SQL to execute
    pub sql: String,

    /// Why the source SQL was kept, if it was
    pub fallback: Option<TranspileError>,
}

impl Transpiled {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Transpile, keeping the original SQL when the transpiler fails
pub fn transpile_or_passthrough(
    transpiler: &dyn Transpiler,
    sql: &str,
    source: SqlDialect,
    target: SqlDialect,
) -> Transpiled {
    match transpiler.transpile(sql, source, target) {
        Ok(sql) => Transpiled { sql, fallback: None },
        Err(e) => {
            tracing::error!("Failed to transpile SQL from {} to {}, using it unchanged: {}", source, target, e);
            Transpiled {
                sql: sql.to_string(),
                fallback: Some(e),
            }
        }
    }
}

/// Transpile `sql`, returning the original text on failure
pub fn transpile(transpiler: &dyn Transpiler, sql: &str, source: SqlDialect, target: SqlDialect) -> String {
    transpile_or_passthrough(transpiler, sql, source, target).sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct AlwaysFails;

    impl Transpiler for AlwaysFails {
        fn transpile(&self, _sql: &str, source: SqlDialect, _target: SqlDialect) -> Result<String, TranspileError> {
            Err(TranspileError::Parse {
                dialect: source,
                message: "unsupported".to_string(),
            })
        }
    }

    #[test]
    fn same_dialect_round_trip() {
        let sql = SqlparserTranspiler
            .transpile("SELECT a FROM t", SqlDialect::DuckDb, SqlDialect::DuckDb)
            .unwrap();
        assert_eq!(sql, "SELECT a FROM t");
    }

    #[test]
    fn quoted_identifiers_follow_target() {
        let sql = SqlparserTranspiler
            .transpile(
                r#"SELECT "Trip Id" FROM "nyc"."trips""#,
                SqlDialect::DuckDb,
                SqlDialect::Databricks,
            )
            .unwrap();
        assert_eq!(sql, "SELECT `Trip Id` FROM `nyc`.`trips`");
    }

    #[test]
    fn backticks_become_double_quotes() {
        let sql = SqlparserTranspiler
            .transpile("SELECT `fare` FROM trips", SqlDialect::BigQuery, SqlDialect::Postgres)
            .unwrap();
        assert_eq!(sql, r#"SELECT "fare" FROM trips"#);
    }

    #[test]
    fn only_first_statement_is_kept() {
        let sql = SqlparserTranspiler
            .transpile("SELECT 1; SELECT 2", SqlDialect::Ansi, SqlDialect::Ansi)
            .unwrap();
        assert_eq!(sql, "SELECT 1");
    }

    #[test]
    fn malformed_sql_is_an_error() {
        let result = SqlparserTranspiler.transpile("SELEC broken FROM", SqlDialect::DuckDb, SqlDialect::DuckDb);
        assert!(matches!(result, Err(TranspileError::Parse { .. })));
    }

    #[test]
    fn empty_sql_is_an_error() {
        let result = SqlparserTranspiler.transpile("", SqlDialect::DuckDb, SqlDialect::DuckDb);
        assert_eq!(result, Err(TranspileError::Empty));
    }

    #[test]
    fn failure_passes_original_through() {
        let original = "SELECT * FROM read_parquet('trips.parquet')";
        let transpiled = transpile_or_passthrough(&AlwaysFails, original, SqlDialect::DuckDb, SqlDialect::Databricks);

        assert_eq!(transpiled.sql, original);
        assert!(transpiled.is_fallback());
        assert_eq!(transpile(&AlwaysFails, original, SqlDialect::DuckDb, SqlDialect::Databricks), original);
    }

    #[test]
    fn success_is_not_a_fallback() {
        let transpiled = transpile_or_passthrough(&SqlparserTranspiler, "SELECT 1", SqlDialect::DuckDb, SqlDialect::Snowflake);
        assert_eq!(transpiled.sql, "SELECT 1");
        assert!(!transpiled.is_fallback());
    }
}
