//! Disposable Redis for exercising the settings cache against a real server.

use database::redis::{self as redis_db, AsyncCommands, ConnectionManager};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::Redis;

const REDIS_TAG: &str = "8-alpine";

/// Redis container plus a shared connection manager.
///
/// The container is removed when the value is dropped.
///
/// ```no_run
/// use test_utils::TestRedis;
///
/// # async fn example() {
/// let redis = TestRedis::new().await;
/// let cached = redis.keys("setting:*").await;
/// assert!(cached.is_empty());
/// # }
/// ```
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    connection: ConnectionManager,
    url: String,
}

impl TestRedis {
    pub async fn new() -> Self {
        let container = Redis::default()
            .with_tag(REDIS_TAG)
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let url = format!("redis://127.0.0.1:{port}");
        let connection = redis_db::connect(&url)
            .await
            .expect("Failed to connect to Redis");

        tracing::info!(port, tag = REDIS_TAG, "Test Redis ready");

        Self {
            _container: container,
            connection,
            url,
        }
    }

    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Keys matching `pattern`, sorted
    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        let mut conn = self.connection();
        let mut keys: Vec<String> = conn.keys(pattern).await.expect("KEYS failed");
        keys.sort();
        keys
    }

    /// Raw string stored under `key`
    pub async fn raw(&self, key: &str) -> Option<String> {
        let mut conn = self.connection();
        conn.get(key).await.expect("GET failed")
    }

    /// Remaining TTL in seconds; -1 means no expiry, -2 means missing
    pub async fn ttl(&self, key: &str) -> i64 {
        let mut conn = self.connection();
        conn.ttl(key).await.expect("TTL failed")
    }
}
