//! Model dependency graph
//!
//! This crate handles:
//! - Building the dependency map from parsed models
//! - Computing a build order, detecting cycles

pub mod dag;

pub use dag::{DependencyMap, ExecutionOrder, GraphError, ModelName};
