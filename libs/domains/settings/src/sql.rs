use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};

use crate::{
    entity,
    error::{SettingsError, SettingsResult},
    models::{NewSetting, SettingFilter, SettingRecord},
    repository::{AppliedWrite, BatchWrite, RejectedWrite, SettingRepository, WriteMode, WriteRejection},
};

/// Sea-ORM implementation of SettingRepository
#[derive(Clone)]
pub struct SqlSettingRepository {
    db: DatabaseConnection,
}

impl SqlSettingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn apply_item(
        txn: &DatabaseTransaction,
        mode: WriteMode,
        index: usize,
        item: NewSetting,
        out: &mut BatchWrite,
    ) -> SettingsResult<()> {
        let existing = entity::Entity::find()
            .filter(entity::Column::Key.eq(item.key.as_str()))
            .one(txn)
            .await
            .map_err(|e| SettingsError::DbQuery(e.to_string()))?;

        let now = Utc::now();

        match (mode, existing) {
            (WriteMode::Create, Some(_)) => out.rejected.push(RejectedWrite {
                index,
                key: item.key,
                reason: WriteRejection::DuplicateKey,
            }),
            (WriteMode::Update, None) => out.rejected.push(RejectedWrite {
                index,
                key: item.key,
                reason: WriteRejection::Missing,
            }),
            (WriteMode::Create | WriteMode::Upsert, None) => {
                let model = entity::ActiveModel {
                    id: NotSet,
                    key: Set(item.key),
                    value: Set(item.value),
                    setting_type: Set(item.setting_type),
                    group: Set(item.group),
                    description: Set(item.description),
                    is_system: Set(item.is_system),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                }
                .insert(txn)
                .await
                .map_err(|e| SettingsError::DbCreate(e.to_string()))?;

                out.applied.push(AppliedWrite {
                    index,
                    record: model.into(),
                    previous_group: None,
                });
            }
            (WriteMode::Update | WriteMode::Upsert, Some(row)) => {
                if row.is_system && row.group != item.group {
                    out.rejected.push(RejectedWrite {
                        index,
                        key: item.key,
                        reason: WriteRejection::SystemGroupChange,
                    });
                    return Ok(());
                }

                let previous_group = (row.group != item.group).then(|| row.group.clone());
                let is_system = row.is_system || item.is_system;

                let mut active: entity::ActiveModel = row.into();
                active.value = Set(item.value);
                active.setting_type = Set(item.setting_type);
                active.group = Set(item.group);
                active.description = Set(item.description);
                active.is_system = Set(is_system);
                active.updated_at = Set(now.into());

                let model = active
                    .update(txn)
                    .await
                    .map_err(|e| SettingsError::DbUpdate(e.to_string()))?;

                out.applied.push(AppliedWrite {
                    index,
                    record: model.into(),
                    previous_group,
                });
            }
        }

        Ok(())
    }
}

#[async_trait]
impl SettingRepository for SqlSettingRepository {
    async fn list(&self, filter: SettingFilter) -> SettingsResult<Vec<SettingRecord>> {
        let mut query = entity::Entity::find();

        if let Some(group) = filter.group {
            query = query.filter(entity::Column::Group.eq(group));
        }

        if let Some(key) = filter.key {
            query = query.filter(entity::Column::Key.contains(key.as_str()));
        }

        let models = query
            .order_by_asc(entity::Column::Group)
            .order_by_asc(entity::Column::Key)
            .all(&self.db)
            .await
            .map_err(|e| SettingsError::DbQuery(e.to_string()))?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_by_key(&self, key: &str) -> SettingsResult<Option<SettingRecord>> {
        let model = entity::Entity::find()
            .filter(entity::Column::Key.eq(key))
            .one(&self.db)
            .await
            .map_err(|e| SettingsError::DbQuery(e.to_string()))?;

        Ok(model.map(Into::into))
    }

    async fn find_by_group(&self, group: &str) -> SettingsResult<Vec<SettingRecord>> {
        let models = entity::Entity::find()
            .filter(entity::Column::Group.eq(group))
            .order_by_asc(entity::Column::Key)
            .all(&self.db)
            .await
            .map_err(|e| SettingsError::DbQuery(e.to_string()))?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn apply_batch(&self, mode: WriteMode, items: Vec<NewSetting>) -> SettingsResult<BatchWrite> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| SettingsError::DbCommit(e.to_string()))?;

        let mut out = BatchWrite::default();
        for (index, item) in items.into_iter().enumerate() {
            // Dropping `txn` on error rolls the batch back
            Self::apply_item(&txn, mode, index, item, &mut out).await?;
        }

        txn.commit()
            .await
            .map_err(|e| SettingsError::DbCommit(e.to_string()))?;

        tracing::debug!(
            applied = out.applied.len(),
            rejected = out.rejected.len(),
            "Committed settings batch"
        );
        Ok(out)
    }

    async fn delete(&self, key: &str) -> SettingsResult<bool> {
        let result = entity::Entity::delete_many()
            .filter(entity::Column::Key.eq(key))
            .exec(&self.db)
            .await
            .map_err(|e| SettingsError::DbDelete(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}
