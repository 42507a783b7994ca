//! Redis connector used by the settings cache
//!
//! Provides connection management with retry and the config struct.

mod config;
mod connector;

pub use config::RedisConfig;
pub use connector::{connect, connect_from_config, connect_with_retry};

// Re-export redis types for convenience
pub use redis::aio::ConnectionManager;
pub use redis::{AsyncCommands, RedisError, RedisResult};
