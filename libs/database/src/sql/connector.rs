use sea_orm::{Database, DatabaseConnection, DbErr};
use tracing::info;

use super::SqlConfig;
use crate::common::{DatabaseResult, RetryConfig, retry_with_backoff};

/// Open a pooled connection described by `config`.
pub async fn connect(config: SqlConfig) -> DatabaseResult<DatabaseConnection> {
    let backend = if config.is_sqlite() { "sqlite" } else { "postgres" };
    let db = Database::connect(config.into_connect_options()).await?;
    info!(backend, "Connected to relational store");
    Ok(db)
}

/// Connect with exponential backoff; `None` uses [`RetryConfig::default`].
pub async fn connect_with_retry(
    config: SqlConfig,
    retry_config: Option<RetryConfig>,
) -> DatabaseResult<DatabaseConnection> {
    retry_with_backoff(|| connect(config.clone()), retry_config.unwrap_or_default()).await
}

/// Verify the pool can hand out a live connection.
pub async fn ping(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.ping().await
}
