//! Connectors for the relational store (SeaORM over PostgreSQL or SQLite)
//! and the Redis cache.
//!
//! # Features
//!
//! - `sql` (default) - SeaORM connections, pool tuning from [`sql::SqlConfig`]
//! - `redis` (default) - Redis `ConnectionManager` connections
//! - `config` - `core_config::FromEnv` impls for both config structs
//!
//! # Examples
//!
//! ```ignore
//! use database::{redis, sql};
//!
//! let db = sql::connect_with_retry(sql::SqlConfig::new("sqlite::memory:"), None).await?;
//! let cache = redis::connect("redis://127.0.0.1:6379").await?;
//! ```

pub mod common;

#[cfg(feature = "sql")]
pub mod sql;

#[cfg(feature = "redis")]
pub mod redis;

pub use common::{DatabaseError, DatabaseResult, RetryConfig};
