//! Name-based dependency discovery
//!
//! Dependencies are found by matching model names against SQL text, not by
//! analysing the query. A name that only appears in a comment or a string
//! literal still counts as a reference.

use regex::RegexBuilder;

/// Finds which candidate models a SQL body refers to
pub trait DependencyExtractor {
    /// Return the candidates referenced by `sql`, in candidate order
    fn find_dependencies(&self, sql: &str, candidates: &[&str]) -> Vec<String>;
}

/// Case-insensitive whole-word matching of model names
///
/// `orders` matches `FROM orders` and `FROM Orders o` but not
/// `FROM customer_orders`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeWordMatcher;

impl WholeWordMatcher {
    pub fn new() -> Self {
        Self
    }

    /// True when `name` occurs in `sql` as a whole word
    pub fn references(sql: &str, name: &str) -> bool {
        let pattern = format!(r"\b{}\b", regex::escape(name));

        match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(re) => re.is_match(sql),
            Err(e) => {
                tracing::warn!(name, error = %e, "Cannot build name pattern");
                false
            }
        }
    }
}

impl DependencyExtractor for WholeWordMatcher {
    fn find_dependencies(&self, sql: &str, candidates: &[&str]) -> Vec<String> {
        let deps: Vec<String> = candidates
            .iter()
            .filter(|name| Self::references(sql, name))
            .map(|name| name.to_string())
            .collect();

        tracing::debug!("Dependencies found: {:?}", deps);
        deps
    }
}
