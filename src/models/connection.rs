//! Connection-related data models.
//!
//! This module defines the driver family of a registry and the value object
//! describing where a physical connection points.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use url::Url;

/// Supported database driver families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// Includes MariaDB
    #[value(name = "mysql")]
    MySQL,
    #[value(name = "postgres")]
    PostgreSQL,
    #[value(name = "sqlite")]
    SQLite,
}

impl DatabaseType {
    /// Tag used as the prefix of registry keys and as the URL scheme.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::MySQL => "mysql",
            Self::PostgreSQL => "postgres",
            Self::SQLite => "sqlite",
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Get the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::PostgreSQL => Some(5432),
            Self::MySQL => Some(3306),
            Self::SQLite => None,
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Where a physical connection points.
///
/// Pool tuning is not part of this struct; it is supplied through
/// [`PoolOption`](crate::config::PoolOption) values at fabrication time.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub username: String,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub password: String,
    /// Empty means `localhost`
    pub host: String,
    /// `None` means the driver's standard port
    pub port: Option<u16>,
    /// Database (schema) name. For SQLite this is the file path or `:memory:`.
    pub name: String,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("username", &self.username)
            .field("password", &"****")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .finish()
    }
}

impl ConnectionConfig {
    /// Configuration for a SQLite database file (created when missing).
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            name: path.into(),
            ..Self::default()
        }
    }

    /// Port to connect to, falling back to the driver default.
    pub fn port_or_default(&self, db_type: DatabaseType) -> Option<u16> {
        self.port.or(db_type.default_port())
    }

    /// Build the driver URL for `db_type`. Credentials are percent-encoded.
    pub fn connection_url(&self, db_type: DatabaseType) -> Result<Url, ConnectionConfigError> {
        if db_type == DatabaseType::SQLite {
            if self.name.is_empty() {
                return Err(ConnectionConfigError::MissingDatabaseName);
            }
            let mut url = Url::parse(&format!("sqlite:{}", self.name))?;
            url.query_pairs_mut().append_pair("mode", "rwc");
            return Ok(url);
        }

        let host = if self.host.is_empty() {
            "localhost"
        } else {
            self.host.as_str()
        };

        let mut url = Url::parse(&format!("{}://{}", db_type.tag(), host))?;
        url.set_port(self.port_or_default(db_type))
            .map_err(|_| ConnectionConfigError::InvalidComponent("port"))?;
        if !self.username.is_empty() {
            url.set_username(&self.username)
                .map_err(|_| ConnectionConfigError::InvalidComponent("username"))?;
        }
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| ConnectionConfigError::InvalidComponent("password"))?;
        }
        url.set_path(&format!("/{}", self.name));

        if db_type == DatabaseType::MySQL {
            url.query_pairs_mut().append_pair("charset", "utf8mb4");
        }

        Ok(url)
    }

    /// Get a display-safe version of the connection URL (credentials masked).
    pub fn masked_connection_url(&self, db_type: DatabaseType) -> String {
        match self.connection_url(db_type) {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some("****"));
                }
                url.to_string()
            }
            Err(e) => format!("<invalid: {}>", e),
        }
    }
}

/// Errors that can occur when turning a connection configuration into a URL.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionConfigError {
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Connection URL rejected the {0}")]
    InvalidComponent(&'static str),

    #[error("SQLite connections need a database path in `name`")]
    MissingDatabaseName,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mysql_config() -> ConnectionConfig {
        ConnectionConfig {
            username: "root".to_string(),
            password: "p@ss:word".to_string(),
            host: "db.internal".to_string(),
            port: None,
            name: "main".to_string(),
        }
    }

    #[test]
    fn test_mysql_url_uses_default_port() {
        let url = mysql_config().connection_url(DatabaseType::MySQL).unwrap();
        assert_eq!(url.scheme(), "mysql");
        assert_eq!(url.host_str(), Some("db.internal"));
        assert_eq!(url.port_or_known_default(), Some(3306));
        assert_eq!(url.path(), "/main");
        assert_eq!(url.username(), "root");
        assert!(url.query().unwrap_or_default().contains("charset=utf8mb4"));
    }

    #[test]
    fn test_postgres_url_uses_explicit_port() {
        let mut config = mysql_config();
        config.port = Some(6543);
        let url = config.connection_url(DatabaseType::PostgreSQL).unwrap();
        assert_eq!(url.scheme(), "postgres");
        assert_eq!(url.port(), Some(6543));
        assert!(url.query().is_none());
    }

    #[test]
    fn test_password_is_percent_encoded() {
        let url = mysql_config().connection_url(DatabaseType::MySQL).unwrap();
        let password = url.password().unwrap();
        assert!(!password.contains('@'));
        assert!(!password.contains(':'));
    }

    #[test]
    fn test_empty_host_defaults_to_localhost() {
        let config = ConnectionConfig {
            name: "app".to_string(),
            ..Default::default()
        };
        let url = config.connection_url(DatabaseType::MySQL).unwrap();
        assert_eq!(url.host_str(), Some("localhost"));
    }

    #[test]
    fn test_sqlite_url() {
        let url = ConnectionConfig::sqlite("/tmp/app.db")
            .connection_url(DatabaseType::SQLite)
            .unwrap();
        assert_eq!(url.as_str(), "sqlite:/tmp/app.db?mode=rwc");
    }

    #[test]
    fn test_sqlite_requires_name() {
        let result = ConnectionConfig::default().connection_url(DatabaseType::SQLite);
        assert!(matches!(
            result,
            Err(ConnectionConfigError::MissingDatabaseName)
        ));
    }

    #[test]
    fn test_masked_url_hides_password() {
        let masked = mysql_config().masked_connection_url(DatabaseType::MySQL);
        assert!(!masked.contains("p%40ss"));
        assert!(masked.contains("****"));
    }

    #[test]
    fn test_debug_hides_password() {
        let debug = format!("{:?}", mysql_config());
        assert!(!debug.contains("p@ss:word"));
    }

    #[test]
    fn test_database_type_tags() {
        assert_eq!(DatabaseType::MySQL.tag(), "mysql");
        assert_eq!(DatabaseType::PostgreSQL.tag(), "postgres");
        assert_eq!(DatabaseType::SQLite.tag(), "sqlite");
        assert_eq!(DatabaseType::SQLite.default_port(), None);
    }
}
