use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use super::RedisConfig;
use crate::common::{DatabaseResult, RetryConfig, retry_with_backoff};

/// Connect to Redis and return a ConnectionManager
///
/// The ConnectionManager reconnects on its own after transient failures,
/// so one instance is cloned into every cache handle.
pub async fn connect(url: &str) -> DatabaseResult<ConnectionManager> {
    info!("Connecting to Redis");

    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;

    // Verify connection with PING
    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    info!("Connected to Redis");
    Ok(manager)
}

/// Connect using a [`RedisConfig`], honouring its database/credentials.
pub async fn connect_from_config(config: &RedisConfig) -> DatabaseResult<ConnectionManager> {
    connect(&config.connection_url()).await
}

/// Connect from config with exponential backoff
pub async fn connect_with_retry(
    config: &RedisConfig,
    retry_config: Option<RetryConfig>,
) -> DatabaseResult<ConnectionManager> {
    retry_with_backoff(|| connect_from_config(config), retry_config.unwrap_or_default()).await
}
