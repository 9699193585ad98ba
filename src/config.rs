//! Configuration handling.
//!
//! This module holds the pool tuning model shared by the library and the
//! CLI/environment configuration of the connectivity check binary.

use crate::models::{ConnectionConfig, DatabaseType};
use clap::Parser;
use std::time::Duration;

// Pool configuration defaults
pub const DEFAULT_MAX_IDLE_CONNECTIONS: u32 = 2;
/// Zero means unbounded.
pub const DEFAULT_MAX_OPEN_CONNECTIONS: u32 = 0;
/// Cap handed to the driver when the open-connection limit is unbounded.
pub const UNBOUNDED_POOL_SIZE: u32 = u16::MAX as u32;

pub const DEFAULT_CLOSE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PING_TIMEOUT_SECS: u64 = 5;

/// A single pool tuning adjustment.
///
/// Options are applied in order on top of [`PoolSettings::default`]; when two
/// options target the same setting the later one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolOption {
    /// Idle connections the pool keeps warm once it has seen traffic.
    ///
    /// This is a floor, not a cap: the driver keeps at least this many
    /// connections open (clamped to the open limit) and never fewer.
    MaxIdleConnections(u32),
    /// Upper bound on open connections. Zero means unbounded.
    MaxOpenConnections(u32),
    /// Connections older than this are closed. Zero means no limit.
    ConnMaxLifetime(Duration),
}

/// Effective pool tuning for one physical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_idle_connections: u32,
    /// Zero means unbounded
    pub max_open_connections: u32,
    pub conn_max_lifetime: Option<Duration>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_idle_connections: DEFAULT_MAX_IDLE_CONNECTIONS,
            max_open_connections: DEFAULT_MAX_OPEN_CONNECTIONS,
            conn_max_lifetime: None,
        }
    }
}

impl PoolSettings {
    /// Defaults with `options` applied in order.
    pub fn from_options<'a>(options: impl IntoIterator<Item = &'a PoolOption>) -> Self {
        let mut settings = Self::default();
        for option in options {
            settings.apply(*option);
        }
        settings
    }

    pub fn apply(&mut self, option: PoolOption) {
        match option {
            PoolOption::MaxIdleConnections(n) => self.max_idle_connections = n,
            PoolOption::MaxOpenConnections(n) => self.max_open_connections = n,
            PoolOption::ConnMaxLifetime(d) if d.is_zero() => self.conn_max_lifetime = None,
            PoolOption::ConnMaxLifetime(d) => self.conn_max_lifetime = Some(d),
        }
    }

    /// Maximum pool size as understood by the driver.
    pub fn max_connections(&self) -> u32 {
        match self.max_open_connections {
            0 => UNBOUNDED_POOL_SIZE,
            n => n,
        }
    }

    /// Connections the pool keeps warm; never more than the open limit.
    pub fn min_connections(&self) -> u32 {
        self.max_idle_connections.min(self.max_connections())
    }
}

/// Configuration for the connectivity check.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-adapter",
    about = "Fabricate a named database connection, ping it and shut it down cleanly",
    version,
    author
)]
pub struct Config {
    /// Driver family of the connection
    #[arg(long, value_enum, default_value = "mysql", env = "DB_DRIVER")]
    pub driver: DatabaseType,

    /// Logical instance name the connection is registered under
    #[arg(long, default_value = "main_db", env = "DB_INSTANCE")]
    pub instance: String,

    #[arg(long, default_value = "", env = "DB_USERNAME")]
    pub username: String,

    /// Prefer the environment variable over the flag
    #[arg(long, default_value = "", env = "DB_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long, default_value = "localhost", env = "DB_HOST")]
    pub host: String,

    /// Defaults to the driver's standard port
    #[arg(long, env = "DB_PORT")]
    pub port: Option<u16>,

    /// Database name, or the file path for SQLite
    #[arg(long, default_value = "", env = "DB_NAME")]
    pub name: String,

    #[arg(long, env = "DB_MAX_IDLE_CONNECTIONS")]
    pub max_idle_connections: Option<u32>,

    /// Zero means unbounded
    #[arg(long, env = "DB_MAX_OPEN_CONNECTIONS")]
    pub max_open_connections: Option<u32>,

    #[arg(long, env = "DB_CONN_MAX_LIFETIME_SECS")]
    pub conn_max_lifetime_secs: Option<u64>,

    /// Seconds to wait for checked-out connections when closing
    #[arg(long, default_value_t = DEFAULT_CLOSE_TIMEOUT_SECS, env = "DB_CLOSE_TIMEOUT")]
    pub close_timeout_secs: u64,

    /// Deadline for the ping in seconds
    #[arg(long, default_value_t = DEFAULT_PING_TIMEOUT_SECS, env = "DB_PING_TIMEOUT")]
    pub timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "DB_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "DB_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            username: self.username.clone(),
            password: self.password.clone(),
            host: self.host.clone(),
            port: self.port,
            name: self.name.clone(),
        }
    }

    /// Pool options for the values given on the command line, in a fixed order.
    pub fn pool_options(&self) -> Vec<PoolOption> {
        let mut options = Vec::new();
        if let Some(n) = self.max_idle_connections {
            options.push(PoolOption::MaxIdleConnections(n));
        }
        if let Some(n) = self.max_open_connections {
            options.push(PoolOption::MaxOpenConnections(n));
        }
        if let Some(secs) = self.conn_max_lifetime_secs {
            options.push(PoolOption::ConnMaxLifetime(Duration::from_secs(secs)));
        }
        options
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_defaults() {
        let settings = PoolSettings::default();
        assert_eq!(settings.max_idle_connections, 2);
        assert_eq!(settings.max_open_connections, 0);
        assert_eq!(settings.max_connections(), UNBOUNDED_POOL_SIZE);
        assert_eq!(settings.min_connections(), 2);
        assert_eq!(settings.conn_max_lifetime, None);
    }

    #[test]
    fn test_options_apply_in_order() {
        let settings = PoolSettings::from_options(&[
            PoolOption::MaxOpenConnections(10),
            PoolOption::MaxIdleConnections(5),
            PoolOption::MaxOpenConnections(3),
        ]);
        assert_eq!(settings.max_open_connections, 3);
        assert_eq!(settings.max_idle_connections, 5);
        // idle is clamped to the open limit
        assert_eq!(settings.min_connections(), 3);
    }

    #[test]
    fn test_idle_is_a_floor_within_open_limit() {
        let settings = PoolSettings::from_options(&[PoolOption::MaxIdleConnections(5)]);
        assert_eq!(settings.min_connections(), 5);
        assert_eq!(settings.max_connections(), UNBOUNDED_POOL_SIZE);

        let settings = PoolSettings::from_options(&[PoolOption::MaxIdleConnections(0)]);
        assert_eq!(settings.min_connections(), 0);
    }

    #[test]
    fn test_zero_lifetime_means_unlimited() {
        let settings = PoolSettings::from_options(&[
            PoolOption::ConnMaxLifetime(Duration::from_secs(60)),
            PoolOption::ConnMaxLifetime(Duration::ZERO),
        ]);
        assert_eq!(settings.conn_max_lifetime, None);
    }

    #[test]
    fn test_cli_parse() {
        let config = Config::try_parse_from([
            "db-adapter",
            "--driver",
            "sqlite",
            "--instance",
            "secondary_db",
            "--name",
            "/tmp/check.db",
            "--max-open-connections",
            "4",
            "--conn-max-lifetime-secs",
            "30",
        ])
        .unwrap();

        assert_eq!(config.driver, DatabaseType::SQLite);
        assert_eq!(config.instance, "secondary_db");
        assert_eq!(config.connection_config().name, "/tmp/check.db");
        assert_eq!(
            config.pool_options(),
            vec![
                PoolOption::MaxOpenConnections(4),
                PoolOption::ConnMaxLifetime(Duration::from_secs(30)),
            ]
        );
        assert_eq!(config.close_timeout(), Duration::from_secs(DEFAULT_CLOSE_TIMEOUT_SECS));
    }

    #[test]
    fn test_cli_defaults_to_mysql_main_db() {
        let config = Config::try_parse_from(["db-adapter"]).unwrap();
        assert_eq!(config.driver, DatabaseType::MySQL);
        assert_eq!(config.instance, "main_db");
        assert!(config.pool_options().is_empty());
    }
}
