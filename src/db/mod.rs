//! Database access layer.
//!
//! This module provides:
//! - Capability traits for connections, transactions and their results
//! - sqlx-backed adapters implementing those traits
//! - Driver error classification
//! - A registry of named, reusable physical connections

pub mod adapter;
pub mod capability;
pub mod classify;
pub mod connector;
pub mod params;
pub mod registry;
pub mod rows;
pub mod transaction;

pub use adapter::DbAdapter;
pub use capability::{Db, ExecResult, Row, Rows, Tx};
pub use classify::{classify, is_no_rows, unexpected};
pub use connector::{Connector, SqlxConnector};
pub use registry::{InstanceRegistry, RegistryError};
pub use rows::{ResultAdapter, ResultError, RowAdapter, RowsAdapter, RowsError};
pub use transaction::TxAdapter;
