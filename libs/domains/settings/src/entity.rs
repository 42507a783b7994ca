use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseConnection, DbErr, Schema};
use sea_orm_migration::SchemaManager;
use serde::{Deserialize, Serialize};

use crate::models::{SettingRecord, SettingType};

/// Sea-ORM Entity for the settings table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique, column_type = "String(StringLen::N(100))")]
    pub key: String,
    #[sea_orm(column_type = "Text")]
    pub value: String,
    #[sea_orm(column_name = "type")]
    pub setting_type: SettingType,
    #[sea_orm(column_type = "String(StringLen::N(50))")]
    pub group: String,
    #[sea_orm(column_type = "String(StringLen::N(500))")]
    pub description: String,
    pub is_system: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SettingRecord {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            key: model.key,
            value: model.value,
            setting_type: model.setting_type,
            group: model.group,
            description: model.description,
            is_system: model.is_system,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

/// Create the settings table if it does not exist yet
pub async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let manager = SchemaManager::new(db);
    let schema = Schema::new(db.get_database_backend());

    manager
        .create_table(
            schema
                .create_table_from_entity(Entity)
                .if_not_exists()
                .to_owned(),
        )
        .await
}
