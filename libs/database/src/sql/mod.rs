//! Relational store connector (SeaORM)
//!
//! The settings table, the migration ledger and the vector job index all
//! live behind one [`DatabaseConnection`]. PostgreSQL is the production
//! backend; SQLite is used by tests and single-node deployments.

mod config;
mod connector;

pub use config::SqlConfig;
pub use connector::{connect, connect_with_retry, ping};

// Re-export SeaORM types for convenience
pub use sea_orm::{ConnectOptions, DatabaseConnection, DbBackend, DbErr};
