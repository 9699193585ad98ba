//! Named connection registry.
//!
//! An [`InstanceRegistry`] maps logical instance names to live physical
//! connection pools for one driver family. Fabricating the same name twice
//! hands back an adapter over the same pool; the registry is the only owner of
//! those pools and releases them in [`InstanceRegistry::close_all`].
//!
//! # Concurrency
//!
//! - Each key owns an `Arc<OnceCell<AnyPool>>`. Concurrent fabrications of the
//!   same key wait on the cell, so exactly one pool is opened.
//! - The map lock is never held across a connect or close await.
//! - A failed open leaves the cell empty. Empty cells are invisible to lookups
//!   and the next fabrication retries the open.

use crate::config::{DEFAULT_CLOSE_TIMEOUT_SECS, PoolOption, PoolSettings};
use crate::db::adapter::DbAdapter;
use crate::db::connector::{Connector, SqlxConnector};
use crate::error::{Exception, ExceptionKind};
use crate::models::{ConnectionConfig, DatabaseType};
use sqlx::AnyPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no instance registered under {key}")]
    InstanceNotFound { key: String },

    #[error("connections of {key} were not released within {timeout:?}")]
    CloseTimedOut { key: String, timeout: Duration },
}

/// Registry of named physical connections for one driver family.
#[derive(Debug)]
pub struct InstanceRegistry {
    connector: Arc<dyn Connector>,
    instances: RwLock<HashMap<String, Arc<OnceCell<AnyPool>>>>,
    close_timeout: Duration,
}

impl InstanceRegistry {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            instances: RwLock::new(HashMap::new()),
            close_timeout: Duration::from_secs(DEFAULT_CLOSE_TIMEOUT_SECS),
        }
    }

    /// Registry backed by the sqlx driver for `db_type`.
    pub fn for_driver(db_type: DatabaseType) -> Self {
        Self::new(Arc::new(SqlxConnector::new(db_type)))
    }

    pub fn mysql() -> Self {
        Self::for_driver(DatabaseType::MySQL)
    }

    pub fn postgres() -> Self {
        Self::for_driver(DatabaseType::PostgreSQL)
    }

    pub fn sqlite() -> Self {
        Self::for_driver(DatabaseType::SQLite)
    }

    /// How long [`close_all`](Self::close_all) waits for checked-out
    /// connections of each instance.
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn family(&self) -> DatabaseType {
        self.connector.family()
    }

    /// Registry key of `name`, e.g. `mysql-main_db`.
    pub fn key(&self, name: &str) -> String {
        format!("{}-{}", self.family().tag(), name)
    }

    /// Get or open the physical connection registered as `name`.
    ///
    /// `config` and `options` only matter for the first successful call per
    /// name; later calls reuse the stored pool as is.
    pub async fn fabricate(
        &self,
        name: &str,
        config: &ConnectionConfig,
        options: &[PoolOption],
    ) -> Result<DbAdapter, Exception> {
        let key = self.key(name);
        let cell = self.slot(&key).await;

        if let Some(pool) = cell.get() {
            debug!(instance = %key, "Reusing existing instance");
            return Ok(DbAdapter::adapt(pool.clone()));
        }

        let settings = PoolSettings::from_options(options);
        let pool = cell
            .get_or_try_init(|| async {
                let pool = self.connector.connect(config, &settings).await?;
                info!(
                    instance = %key,
                    max_open = settings.max_open_connections,
                    max_idle = settings.max_idle_connections,
                    "Fabricated connection"
                );
                Ok::<_, sqlx::Error>(pool)
            })
            .await
            .map_err(|err| {
                warn!(instance = %key, error = %err, "Failed to open connection");
                Exception::throw(err)
                    .with_title(format!("error opening {} connection", self.family().tag()))
                    .with_detail(format!("instance name: {}", key))
            })?;

        Ok(DbAdapter::adapt(pool.clone()))
    }

    /// The physical connection registered as `name`.
    pub async fn get_instance(&self, name: &str) -> Result<AnyPool, Exception> {
        let key = self.key(name);
        let instances = self.instances.read().await;
        match instances.get(&key).and_then(|cell| cell.get()) {
            Some(pool) => Ok(pool.clone()),
            None => Err(Exception::throw(RegistryError::InstanceNotFound { key: key.clone() })
                .with_kind(ExceptionKind::NotFound)
                .with_title(format!("{} instance not found", self.family().tag()))
                .with_detail(format!("instance name: {}", key))),
        }
    }

    /// Keys of every live instance, sorted.
    pub async fn instance_names(&self) -> Vec<String> {
        let instances = self.instances.read().await;
        let mut names: Vec<String> = instances
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(key, _)| key.clone())
            .collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        let instances = self.instances.read().await;
        instances.values().filter(|cell| cell.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Close and forget every registered connection.
    ///
    /// Returns one exception per connection that failed to close. The sweep
    /// always visits every instance.
    pub async fn close_all(&self) -> Vec<Exception> {
        // Drain under lock, close outside lock
        let mut drained: Vec<_> = {
            let mut instances = self.instances.write().await;
            instances.drain().collect()
        };
        drained.sort_by(|a, b| a.0.cmp(&b.0));

        let mut errors = Vec::new();
        for (key, cell) in drained {
            let Some(pool) = cell.get() else {
                continue;
            };
            match tokio::time::timeout(self.close_timeout, pool.close()).await {
                Ok(()) => info!(instance = %key, "Closed connection"),
                Err(_) => {
                    warn!(
                        instance = %key,
                        timeout = ?self.close_timeout,
                        "Connection close timed out"
                    );
                    errors.push(
                        Exception::throw(RegistryError::CloseTimedOut {
                            key: key.clone(),
                            timeout: self.close_timeout,
                        })
                        .with_title(format!("error closing {} connection", self.family().tag()))
                        .with_detail(format!("instance name: {}", key)),
                    );
                }
            }
        }

        info!(failed = errors.len(), "All instances closed");
        errors
    }

    /// The cell for `key`, created empty on first use.
    async fn slot(&self, key: &str) -> Arc<OnceCell<AnyPool>> {
        {
            let instances = self.instances.read().await;
            if let Some(cell) = instances.get(key) {
                return Arc::clone(cell);
            }
        }

        let mut instances = self.instances.write().await;
        // Double-check after acquiring write lock
        Arc::clone(
            instances
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_uses_family_tag() {
        assert_eq!(InstanceRegistry::mysql().key("main_db"), "mysql-main_db");
        assert_eq!(InstanceRegistry::postgres().key("main_db"), "postgres-main_db");
        assert_eq!(InstanceRegistry::sqlite().key("cache"), "sqlite-cache");
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let registry = InstanceRegistry::postgres();
        assert!(registry.is_empty().await);
        assert!(registry.instance_names().await.is_empty());
        assert!(registry.close_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_instance_is_not_found() {
        let registry = InstanceRegistry::mysql();
        let exc = registry.get_instance("missing").await.unwrap_err();
        assert_eq!(exc.kind(), ExceptionKind::NotFound);
        assert_eq!(exc.detail(), "instance name: mysql-missing");
    }

    #[tokio::test]
    async fn test_failed_open_leaves_no_instance() {
        let registry = InstanceRegistry::sqlite();
        // An empty SQLite path cannot be turned into a URL.
        let exc = registry
            .fabricate("broken", &ConnectionConfig::default(), &[])
            .await
            .unwrap_err();
        assert_eq!(exc.kind(), ExceptionKind::Unexpected);
        assert_eq!(exc.title(), "error opening sqlite connection");
        assert_eq!(exc.detail(), "instance name: sqlite-broken");
        assert!(registry.is_empty().await);
        assert!(registry.get_instance("broken").await.is_err());
    }
}
