//! Dependency map construction and build ordering
//!
//! Edges point from a model to the models it reads from. The build order puts
//! every dependency before the models that reference it.

use indexmap::IndexMap;
use modelrun_core::ParsedModel;
use modelrun_sql::DependencyExtractor;
use std::collections::VecDeque;
use std::fmt;

/// Model identifier (declared model name)
pub type ModelName = String;

/// Mapping from each model to the models it references
///
/// Keys keep insertion order, which makes ordering deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyMap {
    edges: IndexMap<ModelName, Vec<ModelName>>,
}

impl DependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map for a set of models
    ///
    /// Each model is matched against every other model name in the set. A
    /// name that appears twice keeps its first position and the later model.
    pub fn build(models: &[ParsedModel], extractor: &dyn DependencyExtractor) -> Self {
        let mut latest: IndexMap<&str, &ParsedModel> = IndexMap::new();
        for model in models {
            latest.insert(model.name.as_str(), model);
        }

        let names: Vec<&str> = latest.keys().copied().collect();
        let mut map = Self::new();

        for (name, model) in &latest {
            let candidates: Vec<&str> = names.iter().copied().filter(|n| n != name).collect();
            let deps = extractor.find_dependencies(&model.pure_sql, &candidates);
            map.insert(*name, deps);
        }

        map
    }

    /// Set the dependencies of a model, replacing any previous entry
    pub fn insert(&mut self, model: impl Into<ModelName>, dependencies: Vec<ModelName>) {
        self.edges.insert(model.into(), dependencies);
    }

    /// Immediate dependencies of a model
    pub fn dependencies(&self, model: &str) -> &[ModelName] {
        self.edges.get(model).map(Vec::as_slice).unwrap_or_default()
    }

    /// Models that reference `model` directly
    pub fn dependents(&self, model: &str) -> Vec<&ModelName> {
        self.edges
            .iter()
            .filter(|(_, deps)| deps.iter().any(|d| d == model))
            .map(|(name, _)| name)
            .collect()
    }

    /// All models, in insertion order
    pub fn models(&self) -> impl Iterator<Item = &ModelName> {
        self.edges.keys()
    }

    /// All (model, dependencies) entries, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&ModelName, &[ModelName])> {
        self.edges.iter().map(|(name, deps)| (name, deps.as_slice()))
    }

    pub fn contains(&self, model: &str) -> bool {
        self.edges.contains_key(model)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Compute the build order (Kahn's algorithm)
    ///
    /// In-degree counts how many models depend on a node, so the queue starts
    /// from the most downstream models and walks towards their dependencies.
    /// The visit order is reversed at the end. Ties are served first-in,
    /// first-out.
    pub fn compute_order(&self) -> Result<ExecutionOrder, GraphError> {
        let mut in_degree: IndexMap<&str, usize> = self.edges.keys().map(|k| (k.as_str(), 0)).collect();

        for (model, deps) in &self.edges {
            for dep in deps {
                match in_degree.get_mut(dep.as_str()) {
                    Some(degree) => *degree += 1,
                    None => {
                        return Err(GraphError::UnknownDependency {
                            model: model.clone(),
                            dependency: dep.clone(),
                        })
                    }
                }
            }
        }

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut visited: Vec<ModelName> = Vec::with_capacity(self.edges.len());

        while let Some(node) = queue.pop_front() {
            visited.push(node.to_string());

            for dep in self.dependencies(node) {
                if let Some(degree) = in_degree.get_mut(dep.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dep.as_str());
                    }
                }
            }
        }

        if visited.len() != self.edges.len() {
            let unresolved = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(name, _)| name.to_string())
                .collect();
            return Err(GraphError::CycleDetected { unresolved });
        }

        visited.reverse();
        Ok(ExecutionOrder(visited))
    }
}

impl<N: Into<ModelName>> FromIterator<(N, Vec<ModelName>)> for DependencyMap {
    fn from_iter<I: IntoIterator<Item = (N, Vec<ModelName>)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (model, deps) in iter {
            map.insert(model, deps);
        }
        map
    }
}

/// A build order: dependencies before dependents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOrder(Vec<ModelName>);

impl ExecutionOrder {
    /// Index of a model in the order
    pub fn position(&self, model: &str) -> Option<usize> {
        self.0.iter().position(|m| m == model)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ModelName> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ModelName] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<ModelName> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a ExecutionOrder {
    type Item = &'a ModelName;
    type IntoIter = std::slice::Iter<'a, ModelName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ExecutionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Errors computing a build order
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Circular dependency detected! Unresolved models: {}", .unresolved.join(", "))]
    CycleDetected { unresolved: Vec<ModelName> },

    #[error("Model '{model}' depends on unknown model '{dependency}'")]
    UnknownDependency { model: ModelName, dependency: ModelName },
}
