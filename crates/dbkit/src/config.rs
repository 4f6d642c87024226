//! Connection settings.

use dbkit_core::{Backend, ParamMode, UnknownDriver};
use serde::{Deserialize, Serialize};

/// Everything needed to open a [`Connection`](crate::Connection).
///
/// `host` accepts `name`, `name:port` or an absolute Unix socket path. For
/// SQLite, `database` is the file path or `:memory:`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Driver name: `mysql`, `mariadb`, `pgsql` or `sqlite`.
    pub driver: String,
    /// Server host, `host:port` or socket path.
    #[serde(default)]
    pub host: String,
    /// Database name, or file path for SQLite.
    pub database: String,
    /// User name.
    #[serde(default)]
    pub user: String,
    /// Password.
    #[serde(default)]
    pub password: String,
    /// Keep the driver-side prepared statement cache.
    #[serde(default)]
    pub persistent: bool,
    /// Turn table lock failures into warnings.
    #[serde(default)]
    pub weak_lock: bool,
    /// Parameter mode of queries built through the connection.
    #[serde(default)]
    pub param_mode: ParamMode,
}

impl ConnectionConfig {
    /// Creates a configuration for `driver` and `database`.
    #[must_use]
    pub fn new(driver: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// A private in-memory SQLite database.
    #[must_use]
    pub fn sqlite_memory() -> Self {
        Self::new("sqlite", ":memory:")
    }

    /// Sets the host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets user and password.
    #[must_use]
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    /// Enables or disables the prepared statement cache.
    #[must_use]
    pub const fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Enables or disables weak locking.
    #[must_use]
    pub const fn weak_lock(mut self, weak_lock: bool) -> Self {
        self.weak_lock = weak_lock;
        self
    }

    /// Sets the parameter mode.
    #[must_use]
    pub const fn param_mode(mut self, mode: ParamMode) -> Self {
        self.param_mode = mode;
        self
    }

    /// Resolves the driver name.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownDriver`] for names outside the supported set.
    pub fn backend(&self) -> Result<Backend, UnknownDriver> {
        self.driver.parse()
    }

    /// Splits `host` into a socket path, or a host name and optional port.
    pub(crate) fn endpoint(&self) -> Endpoint<'_> {
        let host = self.host.trim();
        if host.starts_with('/') {
            return Endpoint::Socket(host);
        }
        let host = if host.is_empty() { "localhost" } else { host };
        match host.rsplit_once(':') {
            Some((name, port)) => match port.parse() {
                Ok(port) => Endpoint::Tcp(name, Some(port)),
                Err(_) => Endpoint::Tcp(host, None),
            },
            None => Endpoint::Tcp(host, None),
        }
    }
}

/// Where a server listens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endpoint<'a> {
    Socket(&'a str),
    Tcp(&'a str, Option<u16>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parsing() {
        let config = ConnectionConfig::new("pgsql", "app");
        assert_eq!(config.endpoint(), Endpoint::Tcp("localhost", None));
        assert_eq!(
            config.clone().host("db:5433").endpoint(),
            Endpoint::Tcp("db", Some(5433))
        );
        assert_eq!(
            config.host("/run/mysqld/mysqld.sock").endpoint(),
            Endpoint::Socket("/run/mysqld/mysqld.sock")
        );
    }

    #[test]
    fn test_backend_resolution() {
        assert_eq!(
            ConnectionConfig::new("postgresql", "x").backend(),
            Ok(Backend::Postgres)
        );
        assert!(ConnectionConfig::new("oracle", "x").backend().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{"driver": "sqlite", "database": ":memory:"}"#).unwrap();
        assert_eq!(config, ConnectionConfig::sqlite_memory());
        assert_eq!(config.param_mode, ParamMode::Placeholders);
    }
}
