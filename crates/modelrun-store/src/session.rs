//! Scoped store session
//!
//! A run holds exactly one session. The underlying connection is released when
//! the session is closed or dropped, whichever comes first.

use crate::adapter::{BackingStore, QueryResult, StoreError};

/// One open connection to a backing store
pub struct Session {
    store: Box<dyn BackingStore>,
    closed: bool,
}

impl Session {
    /// Open a session over a store
    pub fn open(store: impl BackingStore + 'static) -> Self {
        tracing::info!("Initializing {} session.", store.name());
        Self {
            store: Box::new(store),
            closed: false,
        }
    }

    /// Run `f` with a fresh session, closing it afterwards even when `f` fails
    ///
    /// An error from `f` takes precedence over an error closing the store.
    pub fn scoped<T, E, F>(store: impl BackingStore + 'static, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Session) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut session = Self::open(store);
        let result = f(&mut session);
        let closed = session.close();

        let value = result?;
        closed?;
        Ok(value)
    }

    /// Name of the underlying store
    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn is_open(&self) -> bool {
        !self.closed
    }

    /// Execute a statement
    pub fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::SessionClosed);
        }
        self.store.execute(sql)
    }

    /// Execute a query and collect its rows
    pub fn query(&mut self, sql: &str) -> Result<QueryResult, StoreError> {
        if self.closed {
            return Err(StoreError::SessionClosed);
        }
        self.store.query(sql)
    }

    /// Close the session
    pub fn close(mut self) -> Result<(), StoreError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), StoreError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        tracing::info!("Closing {} connection.", self.store.name());
        self.store.close()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!("Failed to close {} connection: {}", self.store.name(), e);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store.name())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockStore;

    #[test]
    fn close_releases_store() {
        let store = MockStore::new();
        let session = Session::open(store.clone());

        assert!(session.is_open());
        session.close().unwrap();
        assert!(store.is_closed());
        assert_eq!(store.close_count(), 1);
    }

    #[test]
    fn drop_releases_store() {
        let store = MockStore::new();
        {
            let mut session = Session::open(store.clone());
            session.execute("SELECT 1").unwrap();
        }
        assert!(store.is_closed());
        assert_eq!(store.close_count(), 1);
    }

    #[test]
    fn scoped_closes_on_error() {
        let store = MockStore::new();

        let result: Result<(), StoreError> = Session::scoped(store.clone(), |session| {
            session.execute("CREATE SCHEMA IF NOT EXISTS nyc;")?;
            Err(StoreError::ExecutionError("boom".to_string()))
        });

        assert_eq!(result, Err(StoreError::ExecutionError("boom".to_string())));
        assert!(store.is_closed());
        assert_eq!(store.statements(), vec!["CREATE SCHEMA IF NOT EXISTS nyc;"]);
    }

    #[test]
    fn scoped_returns_value() {
        let store = MockStore::new();
        let value: Result<usize, StoreError> = Session::scoped(store.clone(), |session| {
            session.execute("SELECT 1")?;
            Ok(7)
        });

        assert_eq!(value, Ok(7));
        assert_eq!(store.close_count(), 1);
    }
}
