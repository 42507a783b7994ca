use core_config::{ConfigError, Environment, FromEnv, env_optional, env_parse_or};
use database::redis::RedisConfig;
use database::sql::SqlConfig;
use domain_settings::SettingsConfig;
use domain_vector::QdrantConfig;
use std::time::Duration;

/// Process configuration
///
/// Redis and Qdrant are optional: without Redis the settings cache stays
/// in-process, without Qdrant the vector admin runs on relational data only.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub environment: Environment,
    pub sql: SqlConfig,
    pub redis: Option<RedisConfig>,
    pub qdrant: Option<QdrantConfig>,
    pub settings: SettingsConfig,
    /// Period of the stuck-job sweep
    pub recovery_interval: Duration,
}

/// Environment variables:
/// - `DATABASE_*` (see `SqlConfig`)
/// - `REDIS_URL` / `REDIS_HOST` (optional)
/// - `QDRANT_URL` (optional) and the other `QDRANT_*` knobs
/// - `SETTING_CACHE_EXPIRE` (optional, seconds)
/// - `STUCK_RECOVERY_INTERVAL_SECS` (optional, default 300)
impl FromEnv for ServiceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let redis = if env_optional("REDIS_URL").is_some() || env_optional("REDIS_HOST").is_some() {
            Some(RedisConfig::from_env()?)
        } else {
            None
        };

        let qdrant = if env_optional("QDRANT_URL").is_some() {
            Some(QdrantConfig::from_env()?)
        } else {
            None
        };

        let interval_secs: u64 = env_parse_or("STUCK_RECOVERY_INTERVAL_SECS", 300)?;

        Ok(Self {
            environment: Environment::from_env(),
            sql: SqlConfig::from_env()?,
            redis,
            qdrant,
            settings: SettingsConfig::from_env()?,
            recovery_interval: Duration::from_secs(interval_secs.max(1)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_backends_absent() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("sqlite::memory:")),
                ("REDIS_URL", None),
                ("REDIS_HOST", None),
                ("QDRANT_URL", None),
                ("STUCK_RECOVERY_INTERVAL_SECS", None),
            ],
            || {
                let config = ServiceConfig::from_env().unwrap();
                assert!(config.redis.is_none());
                assert!(config.qdrant.is_none());
                assert_eq!(config.recovery_interval, Duration::from_secs(300));
            },
        );
    }

    #[test]
    fn test_optional_backends_present() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://localhost/settings")),
                ("REDIS_URL", Some("redis://127.0.0.1:6379")),
                ("QDRANT_URL", Some("http://localhost:6334")),
                ("STUCK_RECOVERY_INTERVAL_SECS", Some("60")),
            ],
            || {
                let config = ServiceConfig::from_env().unwrap();
                assert!(config.redis.is_some());
                assert_eq!(config.qdrant.unwrap().url, "http://localhost:6334");
                assert_eq!(config.recovery_interval, Duration::from_secs(60));
            },
        );
    }

    #[test]
    fn test_bad_interval_is_an_error() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("sqlite::memory:")),
                ("STUCK_RECOVERY_INTERVAL_SECS", Some("soon")),
            ],
            || {
                assert!(ServiceConfig::from_env().is_err());
            },
        );
    }
}
