use async_trait::async_trait;
use sea_orm::Schema;

use crate::entity::{announcements, category_templates};
use crate::error::MigrationResult;
use crate::runner::{Migration, MigrationContext};

/// Settings, vector job, file and content tables
pub struct CreateCoreTables;

#[async_trait]
impl Migration for CreateCoreTables {
    fn name(&self) -> &'static str {
        "create_core_tables"
    }

    async fn up(&self, ctx: &MigrationContext) -> MigrationResult<()> {
        domain_settings::entity::create_tables(&ctx.db).await?;
        domain_vector::entity::create_tables(&ctx.db).await?;

        let schema = Schema::new(ctx.db.get_database_backend());
        let manager = ctx.schema();

        manager
            .create_table(
                schema
                    .create_table_from_entity(category_templates::Entity)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(announcements::Entity)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
