pub mod files;
pub mod vector_jobs;

use sea_orm::{DatabaseConnection, DbErr, Schema};
use sea_orm_migration::SchemaManager;

/// Create the `files` and `vector_jobs` tables if they do not exist yet
pub async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let manager = SchemaManager::new(db);
    let schema = Schema::new(db.get_database_backend());

    manager
        .create_table(
            schema
                .create_table_from_entity(files::Entity)
                .if_not_exists()
                .to_owned(),
        )
        .await?;

    manager
        .create_table(
            schema
                .create_table_from_entity(vector_jobs::Entity)
                .if_not_exists()
                .to_owned(),
        )
        .await
}
