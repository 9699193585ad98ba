//! Data models for the database access layer.
//!
//! This module re-exports the value types used throughout the crate.

pub mod connection;
pub mod query;

pub use connection::{ConnectionConfig, ConnectionConfigError, DatabaseType};
pub use query::QueryParam;
