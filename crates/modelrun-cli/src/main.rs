use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use modelrun_core::{Config, MaterializationKind, Params, RunReport, SqlDialect, CONFIG_FILE};
use modelrun_engine::{model_paths, ModelRunner};
use modelrun_store::{DuckDbStore, QueryResult, Session};

/// Modelrun - Build SQL models in dependency order
#[derive(Parser)]
#[command(name = "modelrun")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: modelrun.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file (in-memory when neither this nor the config sets one)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Dialect the model SQL is written in
    #[arg(long, global = true)]
    source_dialect: Option<SqlDialect>,

    /// Dialect of the backing store
    #[arg(long, global = true)]
    target_dialect: Option<SqlDialect>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Materialize every model in dependency order
    Run {
        /// Model definition files (default: the files named in the config)
        models: Vec<PathBuf>,

        /// Materialize as view or table
        #[arg(short, long)]
        materialize: Option<MaterializationKind>,

        /// Parameter substituted into model SQL (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Output file for the JSON run report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show which models each model depends on
    Deps {
        /// Model definition files (default: the files named in the config)
        models: Vec<PathBuf>,
    },

    /// Show the build order without touching the database
    Plan {
        /// Model definition files (default: the files named in the config)
        models: Vec<PathBuf>,
    },

    /// Materialize a single model, ignoring its dependencies
    Exec {
        /// Model definition file
        model: PathBuf,

        /// Materialize as view or table
        #[arg(short, long)]
        materialize: Option<MaterializationKind>,

        /// Parameter substituted into model SQL (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Run a query and print its rows
    Query {
        /// SQL text; `{name}` placeholders are filled from parameters
        sql: String,

        /// Parameter substituted into the query (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Print a model's SQL transpiled to another dialect
    Transpile {
        /// Model definition file
        model: PathBuf,

        /// Dialect to transpile to (default: the target dialect)
        #[arg(short, long)]
        to: Option<SqlDialect>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env before reading any environment overrides
    dotenvy::dotenv().ok();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = load_config(&cli)?;

    if cli.verbose {
        eprintln!(
            "{} {} -> {}",
            "Dialects:".cyan(),
            config.source_dialect,
            config.target_dialect
        );
    }

    match cli.command {
        Commands::Run {
            models,
            materialize,
            params,
            output,
        } => run_command(&config, &models, materialize, params, output.as_deref()),
        Commands::Deps { models } => deps_command(&config, &models),
        Commands::Plan { models } => plan_command(&config, &models),
        Commands::Exec {
            model,
            materialize,
            params,
        } => exec_command(&config, &model, materialize, params),
        Commands::Query { sql, params } => query_command(&config, &sql, params),
        Commands::Transpile { model, to } => transpile_command(&config, &model, to),
    }
}

/// Config from `--config`, else ./modelrun.toml, else defaults; then
/// environment and command-line overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new(CONFIG_FILE).exists() {
        Config::from_file(Path::new(CONFIG_FILE))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    config.apply_env();

    if let Some(database) = &cli.database {
        config.database = Some(database.clone());
    }
    if let Some(dialect) = cli.source_dialect {
        config.source_dialect = dialect;
    }
    if let Some(dialect) = cli.target_dialect {
        config.target_dialect = dialect;
    }

    Ok(config)
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Config params with command-line params layered on top
fn merged_params(config: &Config, overrides: Vec<(String, String)>) -> Params {
    let mut params = config.params.clone();
    params.extend(overrides);
    params
}

fn resolve_models(config: &Config, models: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let paths = if models.is_empty() {
        model_paths(config)
    } else {
        models.to_vec()
    };

    if paths.is_empty() {
        anyhow::bail!(
            "No models given. Pass definition files or set `models` / `models_dir` in {}",
            CONFIG_FILE
        );
    }

    Ok(paths)
}

fn open_store(config: &Config) -> Result<DuckDbStore> {
    let database = config.database_path();
    let store = DuckDbStore::open(database.as_deref())
        .with_context(|| format!("Failed to open database {}", describe_database(database.as_deref())))?;
    Ok(store)
}

fn describe_database(database: Option<&Path>) -> String {
    database
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ":memory:".to_string())
}

/// Run command - materialize all models in dependency order
fn run_command(
    config: &Config,
    models: &[PathBuf],
    materialize: Option<MaterializationKind>,
    params: Vec<(String, String)>,
    output: Option<&Path>,
) -> Result<()> {
    let paths = resolve_models(config, models)?;
    let kind = materialize.unwrap_or(config.materialize_as);

    let mut settings = modelrun_engine::RunSettings::from_config(config);
    settings.params = merged_params(config, params);
    let runner = ModelRunner::new(settings);

    let store = open_store(config)?;
    let report = Session::scoped(store, |session| runner.run_all(session, &paths, kind))?;

    if let Some(output) = output {
        report.save_to_file(output)?;
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    print_run_summary(&report);

    Ok(())
}

/// Deps command - print each model's dependencies
fn deps_command(config: &Config, models: &[PathBuf]) -> Result<()> {
    let paths = resolve_models(config, models)?;
    let dependencies = ModelRunner::from_config(config).show_dependencies(&paths)?;

    println!("{}", "Model dependencies:".bold());
    for (model, deps) in dependencies.iter() {
        if deps.is_empty() {
            println!("  {}: {}", model.green(), "No dependencies".dimmed());
        } else {
            println!("  {}: {}", model.green(), deps.join(", "));
        }
    }

    Ok(())
}

/// Plan command - print the build order
fn plan_command(config: &Config, models: &[PathBuf]) -> Result<()> {
    let paths = resolve_models(config, models)?;
    let plan = ModelRunner::from_config(config).plan(&paths, config.materialize_as)?;

    println!("{}", "Build order:".bold());
    for (i, model) in plan.order.iter().enumerate() {
        let deps = plan.dependencies.dependencies(model);
        if deps.is_empty() {
            println!("  {}. {}", i + 1, model.green());
        } else {
            println!("  {}. {} {}", i + 1, model.green(), format!("(after {})", deps.join(", ")).dimmed());
        }
    }

    for diag in &plan.loaded.diagnostics {
        println!("  [{}] {}: {}", "WARN".yellow().bold(), diag.code, diag.message);
    }

    Ok(())
}

/// Exec command - materialize one model
fn exec_command(
    config: &Config,
    model: &Path,
    materialize: Option<MaterializationKind>,
    params: Vec<(String, String)>,
) -> Result<()> {
    let kind = materialize.unwrap_or(config.materialize_as);
    let params = merged_params(config, params);
    let runner = ModelRunner::from_config(config);

    let store = open_store(config)?;
    let materialized = Session::scoped(store, |session| {
        runner.execute_model(session, model, Some(&params), kind)
    })?;

    match materialized {
        Some(materialized) => {
            for stmt in &materialized.outcome.statements {
                println!("{}", stmt);
            }
            for diag in &materialized.diagnostics {
                eprintln!("[{}] {}: {}", "WARN".yellow().bold(), diag.code, diag.message);
            }
        }
        None => {
            eprintln!("{} {}", "No model name found in".yellow(), model.display());
        }
    }

    Ok(())
}

/// Query command - run ad hoc SQL and print the rows
fn query_command(config: &Config, sql: &str, params: Vec<(String, String)>) -> Result<()> {
    let params = merged_params(config, params);
    let runner = ModelRunner::from_config(config);

    let store = open_store(config)?;
    let result = Session::scoped(store, |session| runner.query(session, sql, Some(&params)))?;

    print_query_result(&result);
    Ok(())
}

/// Transpile command - show a model's SQL in another dialect
fn transpile_command(config: &Config, model: &Path, to: Option<SqlDialect>) -> Result<()> {
    let target = to.unwrap_or(config.target_dialect);
    let (pure_sql, transpiled) = ModelRunner::from_config(config).transpile_model(model, target)?;

    println!("{} ({})", "Source SQL".bold(), config.source_dialect);
    println!("{}", pure_sql);
    println!();
    println!("{} ({})", "Transpiled SQL".bold(), target);
    println!("{}", transpiled.sql);

    if let Some(error) = &transpiled.fallback {
        eprintln!();
        eprintln!("{} {}", "Transpilation failed, SQL left unchanged:".yellow(), error);
    }

    Ok(())
}

fn print_run_summary(report: &RunReport) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Model Run Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!("Build order: {}", report.build_order.join(" -> "));
    println!();

    println!("{}", "Summary:".bold());
    println!("  Models:       {}", report.summary.models);
    println!("  Materialized: {}", report.summary.materialized.to_string().green());

    if report.summary.skipped > 0 {
        println!("  Skipped:      {}", report.summary.skipped.to_string().yellow());
    } else {
        println!("  Skipped:      {}", report.summary.skipped);
    }

    if report.summary.warnings > 0 {
        println!("  Warnings:     {}", report.summary.warnings.to_string().yellow());
    } else {
        println!("  Warnings:     {}", report.summary.warnings.to_string().green());
    }
    println!();

    if report.diagnostics.is_empty() {
        println!("{}", "✓ All models built".green().bold());
        return;
    }

    println!("{}", "Diagnostics:".bold());
    for diag in &report.diagnostics {
        println!("  [{}] {}: {}", "WARN".yellow().bold(), diag.code, diag.message);

        if let Some(source) = &diag.source {
            println!("    at {}", source);
        }
    }
}

fn print_query_result(result: &QueryResult) {
    println!("{}", result.columns.join("\t").bold());
    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(format_value).collect();
        println!("{}", cells.join("\t"));
    }
    eprintln!("{}", format!("({} rows)", result.len()).dimmed());
}

fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
