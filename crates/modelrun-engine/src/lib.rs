//! Modelrun engine - Orchestration of model runs
//!
//! This crate ties the pieces of a run together:
//! - Model file discovery
//! - Parameter rendering
//! - Materialization of a single model
//! - Dependency-ordered runs over one store session

pub mod discovery;
pub mod materializer;
pub mod params;
pub mod runner;

pub use discovery::{discover_models, model_paths};
pub use materializer::{create_model_statement, create_schema_statement, Materialized, Materializer};
pub use params::{BraceRenderer, ParameterRenderer};
pub use runner::{EngineError, LoadedModels, ModelRunner, RunPlan, RunSettings};
