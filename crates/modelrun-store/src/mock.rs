//! Mock backing store for testing
//!
//! Records every statement instead of executing it. Clones share state, so a
//! test can hand one clone to a session and inspect the other afterwards.
//!
//! ```rust,ignore
//! let store = MockStore::new().with_failure("daily_agg", "Binder Error");
//! let handle = store.clone();
//!
//! let mut session = Session::open(store);
//! session.execute("CREATE OR REPLACE VIEW seed AS SELECT 1")?;
//! assert_eq!(handle.statements().len(), 1);
//! ```

use crate::adapter::{BackingStore, QueryResult, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockState {
    statements: Vec<String>,
    failures: Vec<(String, String)>,
    results: HashMap<String, QueryResult>,
    close_count: usize,
    fail_close: bool,
}

/// In-memory store that records statements
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<MockState>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any statement containing `pattern` with `message`
    pub fn with_failure(self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.lock().failures.push((pattern.into(), message.into()));
        self
    }

    /// Return `result` for the exact query text `sql`
    pub fn with_result(self, sql: impl Into<String>, result: QueryResult) -> Self {
        self.lock().results.insert(sql.into(), result);
        self
    }

    /// Make `close` report an error
    pub fn with_close_failure(self) -> Self {
        self.lock().fail_close = true;
        self
    }

    /// Statements executed so far, queries included
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().close_count > 0
    }

    /// Number of times the store was closed
    pub fn close_count(&self) -> usize {
        self.lock().close_count
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(state: &MockState, sql: &str) -> Result<(), String> {
        if state.close_count > 0 {
            return Err("connection already closed".to_string());
        }
        match state.failures.iter().find(|(pattern, _)| sql.contains(pattern.as_str())) {
            Some((_, message)) => Err(message.clone()),
            None => Ok(()),
        }
    }
}

impl BackingStore for MockStore {
    fn name(&self) -> &'static str {
        "Mock"
    }

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        Self::check(&state, sql).map_err(StoreError::ExecutionError)?;
        state.statements.push(sql.to_string());
        Ok(())
    }

    fn query(&mut self, sql: &str) -> Result<QueryResult, StoreError> {
        let mut state = self.lock();
        Self::check(&state, sql).map_err(StoreError::QueryError)?;
        state.statements.push(sql.to_string());
        Ok(state.results.get(sql).cloned().unwrap_or_default())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.close_count += 1;
        if state.fail_close {
            return Err(StoreError::ConnectionError("Simulated close failure".to_string()));
        }
        Ok(())
    }
}
