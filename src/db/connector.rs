//! Opening physical connections.
//!
//! The registry never talks to sqlx directly; it goes through a [`Connector`]
//! so tests can count or delay opens without a live server.

use crate::config::PoolSettings;
use crate::models::{ConnectionConfig, DatabaseType};
use async_trait::async_trait;
use sqlx::AnyPool;
use sqlx::any::{AnyConnectOptions, AnyPoolOptions};
use std::str::FromStr;
use tracing::debug;

/// Opens a physical connection pool for one driver family.
#[async_trait]
pub trait Connector: Send + Sync + std::fmt::Debug {
    /// The driver family this connector opens.
    fn family(&self) -> DatabaseType;

    async fn connect(
        &self,
        config: &ConnectionConfig,
        settings: &PoolSettings,
    ) -> Result<AnyPool, sqlx::Error>;
}

/// Production connector backed by the sqlx `Any` driver.
///
/// Pools are opened lazily: no connection is made until the first statement
/// or ping, matching how the driver's own open call behaves.
#[derive(Debug, Clone, Copy)]
pub struct SqlxConnector {
    db_type: DatabaseType,
}

impl SqlxConnector {
    pub fn new(db_type: DatabaseType) -> Self {
        Self { db_type }
    }
}

#[async_trait]
impl Connector for SqlxConnector {
    fn family(&self) -> DatabaseType {
        self.db_type
    }

    async fn connect(
        &self,
        config: &ConnectionConfig,
        settings: &PoolSettings,
    ) -> Result<AnyPool, sqlx::Error> {
        sqlx::any::install_default_drivers();

        let url = config
            .connection_url(self.db_type)
            .map_err(|e| sqlx::Error::Configuration(Box::new(e)))?;
        let options = AnyConnectOptions::from_str(url.as_str())?;

        debug!(
            db_type = %self.db_type,
            url = %config.masked_connection_url(self.db_type),
            max_connections = settings.max_connections(),
            min_connections = settings.min_connections(),
            "Opening connection pool"
        );

        Ok(AnyPoolOptions::new()
            .max_connections(settings.max_connections())
            .min_connections(settings.min_connections())
            .max_lifetime(settings.conn_max_lifetime)
            .connect_lazy_with(options))
    }
}
