use sea_orm::ConnectOptions;
use std::time::Duration;

#[cfg(feature = "config")]
use core_config::{env_parse_or, env_required, ConfigError, FromEnv};

/// Connection pool settings for the relational store
#[derive(Clone, Debug)]
pub struct SqlConfig {
    /// Connection URL, e.g. `postgres://…` or `sqlite://data/app.db?mode=rwc`
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
    /// Log every statement through sqlx
    pub sql_logging: bool,
}

impl SqlConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 20,
            min_connections: 2,
            connect_timeout_secs: 8,
            acquire_timeout_secs: 8,
            sql_logging: false,
        }
    }

    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    pub fn is_in_memory(&self) -> bool {
        self.is_sqlite() && self.url.contains(":memory:")
    }

    /// Build SeaORM options.
    ///
    /// An in-memory SQLite database exists per connection, so the pool is
    /// pinned to a single connection in that case.
    pub fn into_connect_options(self) -> ConnectOptions {
        let (max, min) = if self.is_in_memory() {
            (1, 1)
        } else {
            (self.max_connections, self.min_connections.min(self.max_connections))
        };

        let mut opt = ConnectOptions::new(self.url);
        opt.max_connections(max)
            .min_connections(min)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .sqlx_logging(self.sql_logging);
        opt
    }
}

/// Environment variables:
/// - `DATABASE_URL` (required)
/// - `DATABASE_MAX_CONNECTIONS` (default 20)
/// - `DATABASE_MIN_CONNECTIONS` (default 2)
/// - `DATABASE_CONNECT_TIMEOUT_SECS` (default 8)
/// - `DATABASE_SQL_LOGGING` (default false)
#[cfg(feature = "config")]
impl FromEnv for SqlConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = SqlConfig::new(env_required("DATABASE_URL")?);
        Ok(Self {
            max_connections: env_parse_or("DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: env_parse_or("DATABASE_MIN_CONNECTIONS", defaults.min_connections)?,
            connect_timeout_secs: env_parse_or(
                "DATABASE_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            )?,
            acquire_timeout_secs: defaults.acquire_timeout_secs,
            sql_logging: env_parse_or("DATABASE_SQL_LOGGING", defaults.sql_logging)?,
            url: defaults.url,
        })
    }
}
