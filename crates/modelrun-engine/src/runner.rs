//! Orchestration of a model run
//!
//! A run parses every definition, builds the dependency map, computes the
//! build order and materializes the models one at a time in that order.
//! Ordering errors abort the run before any statement reaches the store.

use crate::materializer::{Materialized, Materializer};
use crate::params::{BraceRenderer, ParameterRenderer};
use indexmap::IndexMap;
use modelrun_core::{
    Config, Diagnostic, DiagnosticCode, MaterializationKind, Params, ParsedModel, RunReport, SqlDialect,
};
use modelrun_dag::{DependencyMap, ExecutionOrder, GraphError};
use modelrun_sql::{
    transpile_or_passthrough, DependencyExtractor, ModelParser, ParseError, SqlparserTranspiler, Transpiled,
    Transpiler, WholeWordMatcher,
};
use modelrun_store::{QueryResult, Session, StoreError};
use std::path::Path;

/// Errors that end a run
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Failed to materialize model '{model}': {source}")]
    Materialize {
        model: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Dialects, default materialization and parameters for a runner
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSettings {
    pub source_dialect: SqlDialect,
    pub target_dialect: SqlDialect,
    pub materialization: MaterializationKind,
    pub params: Params,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_dialect: config.source_dialect,
            target_dialect: config.target_dialect,
            materialization: config.materialize_as,
            params: config.params.clone(),
        }
    }
}

/// Models parsed for a run, with the diagnostics raised while loading them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedModels {
    /// Usable models, one per name, in order of first appearance
    pub models: Vec<ParsedModel>,

    pub diagnostics: Vec<Diagnostic>,
}

impl LoadedModels {
    pub fn get(&self, name: &str) -> Option<&ParsedModel> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }
}

/// A planned run: models and the order to build them in
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub loaded: LoadedModels,
    pub dependencies: DependencyMap,
    pub order: ExecutionOrder,
}

/// Runs models against a backing store session
pub struct ModelRunner {
    settings: RunSettings,
    extractor: Box<dyn DependencyExtractor>,
    transpiler: Box<dyn Transpiler>,
    renderer: Box<dyn ParameterRenderer>,
}

impl ModelRunner {
    /// Create a runner with whole-word dependency matching, the sqlparser
    /// transpiler and `{name}` parameter rendering
    pub fn new(settings: RunSettings) -> Self {
        Self {
            settings,
            extractor: Box::new(WholeWordMatcher),
            transpiler: Box::new(SqlparserTranspiler),
            renderer: Box::new(BraceRenderer),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(RunSettings::from_config(config))
    }

    /// Replace the dependency extractor
    pub fn with_extractor(mut self, extractor: impl DependencyExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Replace the transpiler
    pub fn with_transpiler(mut self, transpiler: impl Transpiler + 'static) -> Self {
        self.transpiler = Box::new(transpiler);
        self
    }

    /// Replace the parameter renderer
    pub fn with_renderer(mut self, renderer: impl ParameterRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    fn materializer(&self) -> Materializer<'_> {
        Materializer::new(
            self.transpiler.as_ref(),
            self.renderer.as_ref(),
            self.settings.source_dialect,
            self.settings.target_dialect,
        )
    }

    fn params(&self) -> Option<&Params> {
        Some(&self.settings.params).filter(|p| !p.is_empty())
    }

    /// Read and parse definition files
    ///
    /// Definitions without a model name are left out with a warning. When a
    /// name is declared twice, the later definition replaces the earlier one.
    pub fn load_models<P: AsRef<Path>>(
        &self,
        paths: &[P],
        kind: MaterializationKind,
    ) -> Result<LoadedModels, EngineError> {
        let parser = ModelParser::new(kind);
        let mut models: IndexMap<String, ParsedModel> = IndexMap::new();
        let mut diagnostics = Vec::new();

        for path in paths {
            let definition = ModelParser::read_definition(path.as_ref())?;

            let model = match parser.parse(&definition) {
                Ok(model) => model,
                Err(diagnostic) => {
                    diagnostics.push(diagnostic);
                    continue;
                }
            };

            if let Some(previous) = models.get(&model.name) {
                tracing::warn!(
                    "Model {} defined in both {} and {}; using the latter",
                    model.name,
                    previous.source_location,
                    model.source_location
                );
                diagnostics.push(
                    Diagnostic::warn(
                        DiagnosticCode::DuplicateModelName,
                        format!("Model {} is also defined in {}", model.name, previous.source_location),
                    )
                    .with_model(model.name.clone())
                    .with_source(model.source_location.clone()),
                );
            }

            models.insert(model.name.clone(), model);
        }

        Ok(LoadedModels {
            models: models.into_values().collect(),
            diagnostics,
        })
    }

    /// Dependency map for a set of parsed models
    pub fn dependencies(&self, models: &[ParsedModel]) -> DependencyMap {
        DependencyMap::build(models, self.extractor.as_ref())
    }

    /// Compute and log the dependency map without touching the store
    pub fn show_dependencies<P: AsRef<Path>>(&self, paths: &[P]) -> Result<DependencyMap, EngineError> {
        let loaded = self.load_models(paths, self.settings.materialization)?;
        let dependencies = self.dependencies(&loaded.models);

        tracing::info!("Model dependency mapping:");
        for (model, deps) in dependencies.iter() {
            if deps.is_empty() {
                tracing::info!("  {}: No dependencies", model);
            } else {
                tracing::info!("  {}: {:?}", model, deps);
            }
        }

        Ok(dependencies)
    }

    /// Parse the definitions and compute the build order
    pub fn plan<P: AsRef<Path>>(&self, paths: &[P], kind: MaterializationKind) -> Result<RunPlan, EngineError> {
        let loaded = self.load_models(paths, kind)?;
        let dependencies = self.dependencies(&loaded.models);
        let order = dependencies.compute_order()?;

        tracing::info!("Model build order: {}", order);

        Ok(RunPlan {
            loaded,
            dependencies,
            order,
        })
    }

    /// Materialize every model in dependency order
    ///
    /// A cycle fails the run before anything is executed. A store failure
    /// stops the run; models materialized before it keep their new state.
    pub fn run_all<P: AsRef<Path>>(
        &self,
        session: &mut Session,
        paths: &[P],
        kind: MaterializationKind,
    ) -> Result<RunReport, EngineError> {
        let plan = self.plan(paths, kind)?;
        let materializer = self.materializer();

        let mut report = RunReport::new();
        report.build_order = plan.order.as_slice().to_vec();
        report.extend_diagnostics(plan.loaded.diagnostics.iter().cloned());

        for model in plan.order.iter().filter_map(|name| plan.loaded.get(name)) {
            let name = &model.name;
            let Materialized { outcome, diagnostics } = materializer
                .materialize(session, model, model.materialization, self.params())
                .map_err(|source| EngineError::Materialize {
                    model: name.clone(),
                    source,
                })?;

            report.extend_diagnostics(diagnostics);
            report.add_outcome(outcome);
        }

        tracing::info!(
            "Run complete: {} materialized, {} skipped",
            report.summary.materialized,
            report.summary.skipped
        );

        Ok(report)
    }

    /// Materialize a single definition, ignoring dependency order
    ///
    /// Returns `None` when the definition declares no model name.
    pub fn execute_model(
        &self,
        session: &mut Session,
        path: &Path,
        params: Option<&Params>,
        kind: MaterializationKind,
    ) -> Result<Option<Materialized>, EngineError> {
        let definition = ModelParser::read_definition(path)?;
        let model = match ModelParser::new(kind).parse(&definition) {
            Ok(model) => model,
            Err(_) => return Ok(None),
        };

        let params = params.or_else(|| self.params());
        let materialized = self
            .materializer()
            .materialize(session, &model, kind, params)
            .map_err(|source| EngineError::Materialize {
                model: model.name.clone(),
                source,
            })?;

        Ok(Some(materialized))
    }

    /// Run an ad hoc query, substituting parameters first
    pub fn query(&self, session: &mut Session, sql: &str, params: Option<&Params>) -> Result<QueryResult, EngineError> {
        let sql = match params {
            Some(params) if !params.is_empty() => self.renderer.render(sql, params),
            _ => sql.to_string(),
        };

        tracing::info!("Running query:\n{}", sql);
        Ok(session.query(&sql)?)
    }

    /// Extract a definition's SQL and transpile it for inspection
    ///
    /// Returns the pure SQL alongside its transpiled form.
    pub fn transpile_model(&self, path: &Path, target: SqlDialect) -> Result<(String, Transpiled), EngineError> {
        let definition = ModelParser::read_definition(path)?;
        let pure_sql = ModelParser::extract_pure_sql(&definition.raw_text);
        let transpiled =
            transpile_or_passthrough(self.transpiler.as_ref(), &pure_sql, self.settings.source_dialect, target);

        Ok((pure_sql, transpiled))
    }
}

impl Default for ModelRunner {
    fn default() -> Self {
        Self::new(RunSettings::default())
    }
}
