//! Model materialization
//!
//! Turns a parsed model into `CREATE OR REPLACE VIEW|TABLE` statements and
//! issues them through the session.

use crate::params::ParameterRenderer;
use modelrun_core::{
    Diagnostic, DiagnosticCode, MaterializationKind, ModelOutcome, ModelStatus, Params, ParsedModel, SqlDialect,
};
use modelrun_sql::{transpile_or_passthrough, Transpiler};
use modelrun_store::{Session, StoreError};

/// `CREATE SCHEMA IF NOT EXISTS <schema>;`
pub fn create_schema_statement(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {};", schema)
}

/// `CREATE OR REPLACE <VIEW|TABLE> <name> AS <sql>`
pub fn create_model_statement(kind: MaterializationKind, name: &str, sql: &str) -> String {
    format!("CREATE OR REPLACE {} {} AS {}", kind.keyword(), name, sql)
}

/// Outcome of materializing one model, with any non-fatal diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct Materialized {
    pub outcome: ModelOutcome,
    pub diagnostics: Vec<Diagnostic>,
}

/// Materializes models into a session
pub struct Materializer<'a> {
    transpiler: &'a dyn Transpiler,
    renderer: &'a dyn ParameterRenderer,
    source_dialect: SqlDialect,
    target_dialect: SqlDialect,
}

impl<'a> Materializer<'a> {
    pub fn new(
        transpiler: &'a dyn Transpiler,
        renderer: &'a dyn ParameterRenderer,
        source_dialect: SqlDialect,
        target_dialect: SqlDialect,
    ) -> Self {
        Self {
            transpiler,
            renderer,
            source_dialect,
            target_dialect,
        }
    }

    /// Materialize `model` as `kind`
    ///
    /// Empty models are skipped. A transpilation failure falls back to the
    /// model's own SQL. Store errors are returned as-is; statements already
    /// issued are not undone.
    pub fn materialize(
        &self,
        session: &mut Session,
        model: &ParsedModel,
        kind: MaterializationKind,
        params: Option<&Params>,
    ) -> Result<Materialized, StoreError> {
        let mut diagnostics = Vec::new();

        if model.is_empty() {
            tracing::warn!("No SQL found in {}. Nothing to execute.", model.source_location);
            diagnostics.push(
                Diagnostic::warn(
                    DiagnosticCode::EmptyModelBody,
                    format!("No SQL found for model {}", model.name),
                )
                .with_model(model.name.clone())
                .with_source(model.source_location.clone()),
            );
            return Ok(Materialized {
                outcome: ModelOutcome::skipped(model.name.clone(), kind),
                diagnostics,
            });
        }

        let sql = match params {
            Some(params) if !params.is_empty() => self.renderer.render(&model.pure_sql, params),
            _ => model.pure_sql.clone(),
        };

        let transpiled = transpile_or_passthrough(self.transpiler, &sql, self.source_dialect, self.target_dialect);
        if let Some(error) = &transpiled.fallback {
            diagnostics.push(
                Diagnostic::warn(
                    DiagnosticCode::TranspileFailed,
                    format!("Using untranspiled SQL: {}", error),
                )
                .with_model(model.name.clone())
                .with_source(model.source_location.clone()),
            );
        }

        let mut statements = Vec::new();

        if let Some(schema) = model.schema() {
            tracing::debug!("Ensuring schema exists: {}", schema);
            let stmt = create_schema_statement(schema);
            session.execute(&stmt)?;
            statements.push(stmt);
        }

        let stmt = create_model_statement(kind, &model.name, &transpiled.sql);
        tracing::info!("Materializing model as a {}: {}", kind.keyword(), model.name);
        tracing::debug!("Executing:\n{}", stmt);
        session.execute(&stmt)?;
        statements.push(stmt);

        Ok(Materialized {
            outcome: ModelOutcome {
                name: model.name.clone(),
                status: ModelStatus::Materialized,
                materialization: kind,
                statements,
                transpile_fallback: transpiled.is_fallback(),
            },
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::BraceRenderer;
    use modelrun_sql::{SqlparserTranspiler, TranspileError};
    use modelrun_store::MockStore;
    use pretty_assertions::assert_eq;

    struct FailingTranspiler;

    impl Transpiler for FailingTranspiler {
        fn transpile(&self, _sql: &str, _source: SqlDialect, target: SqlDialect) -> Result<String, TranspileError> {
            Err(TranspileError::Unsupported {
                dialect: target,
                message: "always fails".to_string(),
            })
        }
    }

    fn materializer<'a>(transpiler: &'a dyn Transpiler) -> Materializer<'a> {
        Materializer::new(transpiler, &BraceRenderer, SqlDialect::DuckDb, SqlDialect::DuckDb)
    }

    #[test]
    fn statement_builders() {
        assert_eq!(create_schema_statement("nyc"), "CREATE SCHEMA IF NOT EXISTS nyc;");
        assert_eq!(
            create_model_statement(MaterializationKind::Table, "nyc.seed", "SELECT 1"),
            "CREATE OR REPLACE TABLE nyc.seed AS SELECT 1"
        );
    }

    #[test]
    fn qualified_name_creates_schema_first() {
        let store = MockStore::new();
        let mut session = Session::open(store.clone());
        let model = ParsedModel::new("nyc.yellow_tripdata_seed", "SELECT 1 AS id", MaterializationKind::View);

        let result = materializer(&SqlparserTranspiler)
            .materialize(&mut session, &model, MaterializationKind::View, None)
            .unwrap();

        assert_eq!(
            store.statements(),
            vec![
                "CREATE SCHEMA IF NOT EXISTS nyc;",
                "CREATE OR REPLACE VIEW nyc.yellow_tripdata_seed AS SELECT 1 AS id",
            ]
        );
        assert_eq!(result.outcome.status, ModelStatus::Materialized);
        assert_eq!(result.outcome.statements, store.statements());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn unqualified_name_skips_schema() {
        let store = MockStore::new();
        let mut session = Session::open(store.clone());
        let model = ParsedModel::new("seed", "SELECT 1", MaterializationKind::Table);

        materializer(&SqlparserTranspiler)
            .materialize(&mut session, &model, MaterializationKind::Table, None)
            .unwrap();

        assert_eq!(store.statements(), vec!["CREATE OR REPLACE TABLE seed AS SELECT 1"]);
    }

    #[test]
    fn transpile_failure_uses_original_sql() {
        let store = MockStore::new();
        let mut session = Session::open(store.clone());
        let model = ParsedModel::new("seed", "SELECT * FROM read_parquet('trips.parquet')", MaterializationKind::View);

        let result = materializer(&FailingTranspiler)
            .materialize(&mut session, &model, MaterializationKind::View, None)
            .unwrap();

        assert_eq!(
            store.statements(),
            vec!["CREATE OR REPLACE VIEW seed AS SELECT * FROM read_parquet('trips.parquet')"]
        );
        assert!(result.outcome.transpile_fallback);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, DiagnosticCode::TranspileFailed);
    }

    #[test]
    fn empty_model_is_skipped() {
        let store = MockStore::new();
        let mut session = Session::open(store.clone());
        let model = ParsedModel::new("nyc.empty", "", MaterializationKind::View);

        let result = materializer(&SqlparserTranspiler)
            .materialize(&mut session, &model, MaterializationKind::View, None)
            .unwrap();

        assert!(store.statements().is_empty());
        assert_eq!(result.outcome.status, ModelStatus::Skipped);
        assert_eq!(result.diagnostics[0].code, DiagnosticCode::EmptyModelBody);
    }

    #[test]
    fn params_are_rendered_before_transpiling() {
        let store = MockStore::new();
        let mut session = Session::open(store.clone());
        let model = ParsedModel::new("recent", "SELECT * FROM trips WHERE fare > {min_fare}", MaterializationKind::View);
        let params: Params = [("min_fare".to_string(), "10".to_string())].into_iter().collect();

        materializer(&FailingTranspiler)
            .materialize(&mut session, &model, MaterializationKind::View, Some(&params))
            .unwrap();

        assert_eq!(
            store.statements(),
            vec!["CREATE OR REPLACE VIEW recent AS SELECT * FROM trips WHERE fare > 10"]
        );
    }

    #[test]
    fn store_failure_is_returned() {
        let store = MockStore::new().with_failure("CREATE OR REPLACE", "Catalog Error");
        let mut session = Session::open(store.clone());
        let model = ParsedModel::new("nyc.seed", "SELECT 1", MaterializationKind::View);

        let err = materializer(&SqlparserTranspiler)
            .materialize(&mut session, &model, MaterializationKind::View, None)
            .unwrap_err();

        assert_eq!(err, StoreError::ExecutionError("Catalog Error".to_string()));
        assert_eq!(store.statements(), vec!["CREATE SCHEMA IF NOT EXISTS nyc;"]);
    }
}
