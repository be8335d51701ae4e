//! Backing store trait for executing model statements

use serde::{Deserialize, Serialize};

/// Rows returned by an ad hoc query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names, when the store reports them
    pub columns: Vec<String>,

    /// Row values, one vector per row
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows }
    }

    /// First value of the first row (`SELECT COUNT(*) ...`)
    pub fn scalar(&self) -> Option<&serde_json::Value> {
        self.rows.first().and_then(|row| row.first())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Errors raised by a backing store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    ConnectionError(String),

    #[error("Statement failed: {0}")]
    ExecutionError(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Session is closed")]
    SessionClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// An analytical store that models are materialized into
///
/// Implementations must accept `CREATE SCHEMA IF NOT EXISTS`,
/// `CREATE OR REPLACE VIEW|TABLE ... AS` and plain `SELECT` statements.
/// Calls are synchronous and issued one at a time.
pub trait BackingStore {
    /// Get the store name (e.g., "DuckDB")
    fn name(&self) -> &'static str;

    /// Execute a statement that returns no rows
    fn execute(&mut self, sql: &str) -> Result<(), StoreError>;

    /// Execute a query and collect its rows
    fn query(&mut self, sql: &str) -> Result<QueryResult, StoreError>;

    /// Release the underlying connection
    ///
    /// Called once by the owning session; later calls may be no-ops.
    fn close(&mut self) -> Result<(), StoreError>;
}

impl<S: BackingStore + ?Sized> BackingStore for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        (**self).execute(sql)
    }

    fn query(&mut self, sql: &str) -> Result<QueryResult, StoreError> {
        (**self).query(sql)
    }

    fn close(&mut self) -> Result<(), StoreError> {
        (**self).close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_result() {
        let result = QueryResult::new(vec!["count_star()".to_string()], vec![vec![json!(42)]]);
        assert_eq!(result.scalar(), Some(&json!(42)));
        assert_eq!(result.len(), 1);

        assert_eq!(QueryResult::default().scalar(), None);
    }

    #[test]
    fn error_messages() {
        let err = StoreError::ExecutionError("Catalog Error: Table with name seed does not exist!".to_string());
        assert_eq!(err.to_string(), "Statement failed: Catalog Error: Table with name seed does not exist!");
        assert_eq!(StoreError::SessionClosed.to_string(), "Session is closed");
    }
}
