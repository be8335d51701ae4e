//! DuckDB backing store
//!
//! Connects to a DuckDB database file, or to a private in-memory database when
//! no path is given. Requires the `duckdb` feature.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let store = DuckDbStore::open(Some(Path::new("yellow_taxi.duckdb")))?;
//! let mut session = Session::open(store);
//! session.execute("CREATE SCHEMA IF NOT EXISTS nyc;")?;
//! ```

use crate::adapter::{BackingStore, QueryResult, StoreError};
use std::path::Path;

#[cfg(feature = "duckdb")]
use duckdb::{types::Value, Connection};

/// DuckDB store
pub struct DuckDbStore {
    /// Open connection (only available with duckdb feature)
    #[cfg(feature = "duckdb")]
    conn: Option<Connection>,

    /// Database file, or `:memory:`
    location: String,

    /// Placeholder for when feature is disabled
    #[cfg(not(feature = "duckdb"))]
    _phantom: std::marker::PhantomData<()>,
}

impl DuckDbStore {
    /// Open a database file, or an in-memory database when `path` is `None`
    #[cfg(feature = "duckdb")]
    pub fn open(path: Option<&Path>) -> Result<Self, StoreError> {
        let (conn, location) = match path {
            Some(path) => (Connection::open(path), path.display().to_string()),
            None => (Connection::open_in_memory(), ":memory:".to_string()),
        };

        let conn = conn.map_err(|e| {
            StoreError::ConnectionError(format!("Failed to open DuckDB database {}: {}", location, e))
        })?;

        tracing::debug!(database = %location, "Opened DuckDB connection");

        Ok(Self {
            conn: Some(conn),
            location,
        })
    }

    /// Open without duckdb feature (returns error)
    #[cfg(not(feature = "duckdb"))]
    pub fn open(path: Option<&Path>) -> Result<Self, StoreError> {
        let _ = path;
        Err(StoreError::ConfigError(
            "DuckDB support not enabled. Rebuild with --features duckdb".to_string(),
        ))
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::open(None)
    }

    /// Database file, or `:memory:`
    pub fn location(&self) -> &str {
        &self.location
    }

    #[cfg(feature = "duckdb")]
    fn connection(&self) -> Result<&Connection, StoreError> {
        self.conn.as_ref().ok_or(StoreError::SessionClosed)
    }

    #[cfg(feature = "duckdb")]
    fn collect_rows(conn: &Connection, sql: &str) -> Result<QueryResult, duckdb::Error> {
        let mut stmt = conn.prepare(sql)?;
        let mut result = QueryResult::default();

        {
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let width = row.as_ref().column_count();
                let mut values = Vec::with_capacity(width);
                for idx in 0..width {
                    let value: Value = row.get(idx)?;
                    values.push(to_json(value));
                }
                result.rows.push(values);
            }
        }

        // set once executed, even with no rows
        result.columns = stmt.column_names();

        Ok(result)
    }
}

#[cfg(feature = "duckdb")]
fn to_json(value: Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(b),
        Value::TinyInt(v) => v.into(),
        Value::SmallInt(v) => v.into(),
        Value::Int(v) => v.into(),
        Value::BigInt(v) => v.into(),
        Value::UTinyInt(v) => v.into(),
        Value::USmallInt(v) => v.into(),
        Value::UInt(v) => v.into(),
        Value::UBigInt(v) => v.into(),
        Value::HugeInt(v) => Json::String(v.to_string()),
        Value::Float(v) => serde_json::Number::from_f64(f64::from(v)).map_or(Json::Null, Json::Number),
        Value::Double(v) => serde_json::Number::from_f64(v).map_or(Json::Null, Json::Number),
        Value::Text(s) => Json::String(s),
        other => Json::String(format!("{:?}", other)),
    }
}

impl BackingStore for DuckDbStore {
    fn name(&self) -> &'static str {
        "DuckDB"
    }

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        #[cfg(feature = "duckdb")]
        {
            self.connection()?
                .execute_batch(sql)
                .map_err(|e| StoreError::ExecutionError(e.to_string()))
        }

        #[cfg(not(feature = "duckdb"))]
        {
            let _ = sql;
            Err(StoreError::ConfigError("DuckDB support not enabled".to_string()))
        }
    }

    fn query(&mut self, sql: &str) -> Result<QueryResult, StoreError> {
        #[cfg(feature = "duckdb")]
        {
            let conn = self.connection()?;
            Self::collect_rows(conn, sql).map_err(|e| StoreError::QueryError(e.to_string()))
        }

        #[cfg(not(feature = "duckdb"))]
        {
            let _ = sql;
            Err(StoreError::ConfigError("DuckDB support not enabled".to_string()))
        }
    }

    fn close(&mut self) -> Result<(), StoreError> {
        #[cfg(feature = "duckdb")]
        {
            if let Some(conn) = self.conn.take() {
                conn.close()
                    .map_err(|(_, e)| StoreError::ConnectionError(format!("Failed to close {}: {}", self.location, e)))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "duckdb"))]
    #[test]
    fn open_without_feature() {
        let result = DuckDbStore::in_memory();
        assert!(matches!(result, Err(StoreError::ConfigError(_))));
    }

    #[cfg(feature = "duckdb")]
    #[test]
    fn create_and_query_view() {
        let mut store = DuckDbStore::in_memory().unwrap();
        assert_eq!(store.location(), ":memory:");

        store.execute("CREATE SCHEMA IF NOT EXISTS nyc;").unwrap();
        store
            .execute("CREATE OR REPLACE VIEW nyc.seed AS SELECT * FROM range(5) t(id)")
            .unwrap();

        let result = store.query("SELECT COUNT(*) AS n FROM nyc.seed").unwrap();
        assert_eq!(result.columns, vec!["n".to_string()]);
        assert_eq!(result.scalar(), Some(&serde_json::json!(5)));

        store.close().unwrap();
        assert!(matches!(store.execute("SELECT 1"), Err(StoreError::SessionClosed)));
    }

    #[cfg(feature = "duckdb")]
    #[test]
    fn empty_result_keeps_columns() {
        let mut store = DuckDbStore::in_memory().unwrap();
        store
            .execute("CREATE TABLE trips AS SELECT 1 AS vendor_id, 2.5 AS fare")
            .unwrap();

        let result = store.query("SELECT vendor_id, fare FROM trips WHERE fare < 0").unwrap();
        assert!(result.is_empty());
        assert_eq!(result.columns, vec!["vendor_id".to_string(), "fare".to_string()]);
    }

    #[cfg(feature = "duckdb")]
    #[test]
    fn failing_statement() {
        let mut store = DuckDbStore::in_memory().unwrap();
        let result = store.execute("CREATE OR REPLACE VIEW v AS SELECT * FROM missing_table");
        assert!(matches!(result, Err(StoreError::ExecutionError(_))));
    }
}
