use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{JobStatus, VectorJob};

/// Sea-ORM Entity for the vector_jobs table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vector_jobs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub file_id: i32,
    pub status: JobStatus,
    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub model: String,
    pub dimension: i32,
    pub retry_count: i32,
    pub last_retry_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
    pub processing_duration: Option<i64>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for VectorJob {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            file_id: model.file_id,
            status: model.status,
            model: model.model,
            dimension: model.dimension,
            retry_count: model.retry_count,
            last_retry_at: model.last_retry_at.map(Into::into),
            error_message: model.error_message,
            processing_duration: model.processing_duration,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}
