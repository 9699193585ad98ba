//! DB Adapter Library
//!
//! A uniform access layer over SQL databases (SQLite, PostgreSQL, MySQL):
//! driver errors come back as classified [`Exception`]s, transactions commit or
//! roll back around a callback, and named connections are fabricated once and
//! reused through an [`InstanceRegistry`](db::InstanceRegistry).

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod models;

pub use config::{Config, PoolOption, PoolSettings};
pub use context::{Context, ContextError};
pub use db::{Db, DbAdapter, InstanceRegistry, Tx};
pub use error::{Exception, ExceptionKind};
pub use models::{ConnectionConfig, DatabaseType, QueryParam};
