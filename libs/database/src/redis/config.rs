#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv};

/// Redis connection settings
#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// Redis connection URL (e.g. `redis://127.0.0.1:6379`)
    pub url: String,
    /// Logical database number
    pub database: Option<u8>,
    /// Username for Redis ACL
    pub username: Option<String>,
    /// Password for authentication
    pub password: Option<String>,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: None,
            username: None,
            password: None,
        }
    }

    pub fn with_database(mut self, database: u8) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_auth(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    /// Full connection URL with credentials and database folded in.
    ///
    /// Credentials already embedded in `url` are left untouched.
    pub fn connection_url(&self) -> String {
        let (scheme, rest) = match self.url.split_once("://") {
            Some(parts) => parts,
            None => ("redis", self.url.as_str()),
        };

        let mut url = String::from(scheme);
        url.push_str("://");

        if !rest.contains('@') {
            match (&self.username, &self.password) {
                (Some(user), Some(pass)) => url.push_str(&format!("{}:{}@", user, pass)),
                (None, Some(pass)) => url.push_str(&format!(":{}@", pass)),
                (Some(user), None) => url.push_str(&format!("{}@", user)),
                (None, None) => {}
            }
        }

        let rest = rest.trim_end_matches('/');
        url.push_str(rest);

        if let Some(db) = self.database {
            // A path segment already selects a database
            let host_part = rest.rsplit_once('@').map_or(rest, |(_, host)| host);
            if !host_part.contains('/') {
                url.push_str(&format!("/{}", db));
            }
        }

        url
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::new("redis://127.0.0.1:6379")
    }
}

/// Environment variables:
/// - `REDIS_URL` or `REDIS_HOST` (required)
/// - `REDIS_DATABASE` (optional)
/// - `REDIS_USERNAME` (optional)
/// - `REDIS_PASSWORD` (optional)
#[cfg(feature = "config")]
impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("REDIS_URL")
            .or_else(|_| std::env::var("REDIS_HOST"))
            .map_err(|_| ConfigError::MissingEnvVar("REDIS_URL or REDIS_HOST".to_string()))?;

        let database = match std::env::var("REDIS_DATABASE") {
            Ok(db_str) => Some(db_str.parse().map_err(|e| ConfigError::ParseError {
                key: "REDIS_DATABASE".to_string(),
                details: format!("{}", e),
            })?),
            Err(_) => None,
        };

        Ok(Self {
            url,
            database,
            username: std::env::var("REDIS_USERNAME").ok(),
            password: std::env::var("REDIS_PASSWORD").ok(),
        })
    }
}
