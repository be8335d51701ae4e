//! Backing store adapters
//!
//! Models are materialized through a [`Session`] wrapping one
//! [`BackingStore`] connection for the whole run.
//!
//! ## Features
//!
//! - `duckdb` - DuckDB support (file-backed or in-memory)
//!
//! ## Example
//!
//! ```rust,ignore
//! use modelrun_store::{DuckDbStore, Session};
//!
//! let store = DuckDbStore::open(Some(Path::new("yellow_taxi.duckdb")))?;
//! let rows = Session::scoped(store, |session| session.query("SELECT 42"))?;
//! ```

pub mod adapter;
pub mod duckdb_store;
pub mod mock;
pub mod session;

pub use adapter::{BackingStore, QueryResult, StoreError};
pub use duckdb_store::DuckDbStore;
pub use mock::MockStore;
pub use session::Session;
