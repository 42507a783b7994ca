/// Connector-level error type for the SQL and Redis backends.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// SeaORM / sqlx errors
    #[cfg(feature = "sql")]
    #[error("SQL error: {0}")]
    Sql(#[from] sea_orm::DbErr),

    /// Redis errors
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Result type alias for connector operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;
