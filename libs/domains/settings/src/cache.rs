//! Read-through cache for single settings and group aggregates.
//!
//! Backend failures never reach callers: [`SettingsCache`] logs them and
//! reports a miss, so the store falls back to the database.

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_parse_or};
use database::redis::{AsyncCommands, ConnectionManager};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{Setting, SettingGroup};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),
}

impl From<database::redis::RedisError> for CacheError {
    fn from(err: database::redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

/// Opaque string key/value store with optional expiry
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// `ttl_secs = 0` stores without expiry
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

/// Redis-backed cache
#[derive(Clone)]
pub struct RedisCacheBackend {
    conn: ConnectionManager,
}

impl RedisCacheBackend {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        if ttl_secs == 0 {
            conn.set::<_, _, ()>(key, value).await?;
        } else {
            conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        }
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }
}

/// Process-local cache, used when Redis is not configured and in tests
#[derive(Debug, Default, Clone)]
pub struct InMemoryCacheBackend {
    entries: Arc<RwLock<HashMap<String, (String, Option<Instant>)>>>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|(_, expires)| expires.is_none_or(|at| at > now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).and_then(|(value, expires)| match expires {
            Some(at) if *at <= Instant::now() => None,
            _ => Some(value.clone()),
        }))
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let expires = (ttl_secs > 0).then(|| Instant::now() + Duration::from_secs(ttl_secs));
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Settings store tuning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsConfig {
    /// Cache TTL in seconds; 0 keeps entries until invalidated
    pub cache_expire_secs: u64,
}

/// Environment variables:
/// - `SETTING_CACHE_EXPIRE` (optional, seconds, default 0)
impl FromEnv for SettingsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cache_expire_secs: env_parse_or("SETTING_CACHE_EXPIRE", 0)?,
        })
    }
}

pub fn setting_key(key: &str) -> String {
    format!("setting:{}", key)
}

pub fn group_key(group: &str) -> String {
    format!("setting:group:{}", group)
}

/// Typed facade over a [`CacheBackend`]
#[derive(Clone)]
pub struct SettingsCache {
    backend: Arc<dyn CacheBackend>,
    ttl_secs: u64,
}

impl SettingsCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: &SettingsConfig) -> Self {
        Self {
            backend,
            ttl_secs: config.cache_expire_secs,
        }
    }

    /// In-process cache without expiry
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCacheBackend::new()), &SettingsConfig::default())
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub async fn get_setting(&self, key: &str) -> Option<Setting> {
        self.read(&setting_key(key)).await
    }

    pub async fn put_setting(&self, setting: &Setting) {
        self.write(&setting_key(&setting.key), setting).await;
    }

    pub async fn get_group(&self, group: &str) -> Option<SettingGroup> {
        self.read(&group_key(group)).await
    }

    pub async fn put_group(&self, group: &SettingGroup) {
        self.write(&group_key(&group.group), group).await;
    }

    pub async fn invalidate_key(&self, key: &str) {
        self.remove(&setting_key(key)).await;
    }

    pub async fn invalidate_group(&self, group: &str) {
        self.remove(&group_key(group)).await;
    }

    async fn read<T: serde::de::DeserializeOwned>(&self, cache_key: &str) -> Option<T> {
        let raw = match self.backend.get(cache_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(cache_key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(cache_key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn write<T: serde::Serialize>(&self, cache_key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(cache_key, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        if let Err(e) = self.backend.set(cache_key, &raw, self.ttl_secs).await {
            tracing::warn!(cache_key, error = %e, "Cache write failed");
        }
    }

    async fn remove(&self, cache_key: &str) {
        if let Err(e) = self.backend.del(cache_key).await {
            tracing::warn!(cache_key, error = %e, "Cache invalidation failed");
        }
    }
}
