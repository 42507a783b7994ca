use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::entity::files as entity;
use crate::error::{VectorError, VectorResult};

/// Source of the files that should have embeddings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileCatalog: Send + Sync {
    /// Ids of live (not deleted) files, ascending
    async fn active_file_ids(&self) -> VectorResult<Vec<i32>>;
}

/// Sea-ORM implementation over the `files` table
#[derive(Clone)]
pub struct SqlFileCatalog {
    db: DatabaseConnection,
}

impl SqlFileCatalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FileCatalog for SqlFileCatalog {
    async fn active_file_ids(&self) -> VectorResult<Vec<i32>> {
        entity::Entity::find()
            .select_only()
            .column(entity::Column::Id)
            .filter(entity::Column::Deleted.eq(false))
            .order_by_asc(entity::Column::Id)
            .into_tuple::<i32>()
            .all(&self.db)
            .await
            .map_err(|e| VectorError::DbQuery(e.to_string()))
    }
}

/// In-memory catalog (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryFileCatalog {
    files: Arc<RwLock<BTreeSet<i32>>>,
}

impl InMemoryFileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(ids: impl IntoIterator<Item = i32>) -> Self {
        Self {
            files: Arc::new(RwLock::new(ids.into_iter().collect())),
        }
    }

    pub async fn add(&self, file_id: i32) {
        self.files.write().await.insert(file_id);
    }

    pub async fn remove(&self, file_id: i32) {
        self.files.write().await.remove(&file_id);
    }
}

#[async_trait]
impl FileCatalog for InMemoryFileCatalog {
    async fn active_file_ids(&self) -> VectorResult<Vec<i32>> {
        Ok(self.files.read().await.iter().copied().collect())
    }
}
