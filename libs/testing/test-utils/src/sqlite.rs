//! Relational test infrastructure
//!
//! Each `TestDatabase` is a private in-memory SQLite database opened through
//! sea-orm, so repository tests need no running services. Schemas are owned
//! by the domain crates; call their `create_tables` on the connection.

use database::sql::{self, SqlConfig};
use sea_orm::DatabaseConnection;

/// Test database wrapper
///
/// The database lives as long as its single pooled connection, so it is
/// discarded when this struct (and every clone of the connection) is dropped.
pub struct TestDatabase {
    pub connection: DatabaseConnection,
    pub connection_string: String,
}

impl TestDatabase {
    /// Open a fresh, empty in-memory database
    ///
    /// # Example
    ///
    /// ```ignore
    /// use test_utils::TestDatabase;
    ///
    /// # async fn example() {
    /// let db = TestDatabase::new().await;
    /// domain_settings::entity::create_tables(&db.connection()).await.unwrap();
    /// # }
    /// ```
    pub async fn new() -> Self {
        let connection_string = "sqlite::memory:".to_string();

        let connection = sql::connect(SqlConfig::new(connection_string.clone()))
            .await
            .expect("Failed to open in-memory SQLite database");

        tracing::debug!("Test database ready (in-memory SQLite)");

        Self {
            connection,
            connection_string,
        }
    }

    /// Get a cloned connection handle
    pub fn connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }
}
