use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

use crate::entity::vector_jobs as entity;
use crate::error::{VectorError, VectorResult};
use crate::models::{EmbeddingOutcome, JobCounts, JobFilter, JobStatus, RecoveryReport, VectorJob};

// Claims race only against other workers of this process; a few retries suffice
const CLAIM_ATTEMPTS: usize = 3;

/// Repository trait for vector job rows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorJobRepository: Send + Sync {
    async fn counts(&self) -> VectorResult<JobCounts>;

    async fn get(&self, file_id: i32) -> VectorResult<Option<VectorJob>>;

    /// Jobs ordered by id
    async fn list(&self, filter: JobFilter) -> VectorResult<Vec<VectorJob>>;

    /// Insert a pending job; `false` if the file already has one
    async fn insert_pending(&self, file_id: i32) -> VectorResult<bool>;

    /// Move a job to `to` if its status is one of `from`, clearing the
    /// previous run's error, duration and retry count.
    async fn transition(&self, file_id: i32, from: Vec<JobStatus>, to: JobStatus) -> VectorResult<bool>;

    async fn delete(&self, file_id: i32) -> VectorResult<bool>;

    /// Atomically move the oldest pending job to running
    async fn claim_next(&self) -> VectorResult<Option<VectorJob>>;

    async fn complete(&self, file_id: i32, outcome: EmbeddingOutcome, duration_ms: i64) -> VectorResult<()>;

    async fn fail(&self, file_id: i32, error: String, duration_ms: i64) -> VectorResult<()>;

    /// Requeue running jobs last touched before `cutoff`; jobs that already
    /// used `max_retries` retries are failed instead.
    async fn recover_stuck(&self, cutoff: DateTime<Utc>, max_retries: i32) -> VectorResult<RecoveryReport>;
}

/// Sea-ORM implementation of VectorJobRepository
#[derive(Clone)]
pub struct SqlVectorJobRepository {
    db: DatabaseConnection,
}

impl SqlVectorJobRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn count_status(&self, status: JobStatus) -> VectorResult<u64> {
        entity::Entity::find()
            .filter(entity::Column::Status.eq(status.to_string()))
            .count(&self.db)
            .await
            .map_err(|e| VectorError::DbQuery(e.to_string()))
    }

    /// Apply `patch` to the job of `file_id` only while it is `running`
    async fn update_running(&self, file_id: i32, patch: entity::ActiveModel) -> VectorResult<bool> {
        let result = entity::Entity::update_many()
            .set(patch)
            .filter(entity::Column::FileId.eq(file_id))
            .filter(entity::Column::Status.eq(JobStatus::Running.to_string()))
            .exec(&self.db)
            .await
            .map_err(|e| VectorError::DbUpdate(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }
}

#[async_trait]
impl VectorJobRepository for SqlVectorJobRepository {
    async fn counts(&self) -> VectorResult<JobCounts> {
        let total = entity::Entity::find()
            .count(&self.db)
            .await
            .map_err(|e| VectorError::DbQuery(e.to_string()))?;

        Ok(JobCounts {
            total,
            pending: self.count_status(JobStatus::Pending).await?,
            running: self.count_status(JobStatus::Running).await?,
            completed: self.count_status(JobStatus::Completed).await?,
            failed: self.count_status(JobStatus::Failed).await?,
            reset: self.count_status(JobStatus::Reset).await?,
        })
    }

    async fn get(&self, file_id: i32) -> VectorResult<Option<VectorJob>> {
        let model = entity::Entity::find()
            .filter(entity::Column::FileId.eq(file_id))
            .one(&self.db)
            .await
            .map_err(|e| VectorError::DbQuery(e.to_string()))?;

        Ok(model.map(Into::into))
    }

    async fn list(&self, filter: JobFilter) -> VectorResult<Vec<VectorJob>> {
        let mut query = entity::Entity::find().order_by_asc(entity::Column::Id);

        if let Some(status) = filter.status {
            query = query.filter(entity::Column::Status.eq(status.to_string()));
        }

        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let models = query
            .all(&self.db)
            .await
            .map_err(|e| VectorError::DbQuery(e.to_string()))?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn insert_pending(&self, file_id: i32) -> VectorResult<bool> {
        if self.get(file_id).await?.is_some() {
            return Ok(false);
        }

        let now = Utc::now();
        entity::ActiveModel {
            id: NotSet,
            file_id: Set(file_id),
            status: Set(JobStatus::Pending),
            model: Set(String::new()),
            dimension: Set(0),
            retry_count: Set(0),
            last_retry_at: Set(None),
            error_message: Set(None),
            processing_duration: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.db)
        .await
        .map_err(|e| VectorError::DbUpdate(e.to_string()))?;

        tracing::debug!(file_id, "Queued vector job");
        Ok(true)
    }

    async fn transition(&self, file_id: i32, from: Vec<JobStatus>, to: JobStatus) -> VectorResult<bool> {
        let patch = entity::ActiveModel {
            status: Set(to),
            retry_count: Set(0),
            error_message: Set(None),
            processing_duration: Set(None),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let result = entity::Entity::update_many()
            .set(patch)
            .filter(entity::Column::FileId.eq(file_id))
            .filter(entity::Column::Status.is_in(from.iter().map(|s| s.to_string())))
            .exec(&self.db)
            .await
            .map_err(|e| VectorError::DbUpdate(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    async fn delete(&self, file_id: i32) -> VectorResult<bool> {
        let result = entity::Entity::delete_many()
            .filter(entity::Column::FileId.eq(file_id))
            .exec(&self.db)
            .await
            .map_err(|e| VectorError::DbDelete(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    async fn claim_next(&self) -> VectorResult<Option<VectorJob>> {
        for _ in 0..CLAIM_ATTEMPTS {
            let Some(candidate) = entity::Entity::find()
                .filter(entity::Column::Status.eq(JobStatus::Pending.to_string()))
                .order_by_asc(entity::Column::Id)
                .one(&self.db)
                .await
                .map_err(|e| VectorError::DbQuery(e.to_string()))?
            else {
                return Ok(None);
            };

            let patch = entity::ActiveModel {
                status: Set(JobStatus::Running),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            };

            let result = entity::Entity::update_many()
                .set(patch)
                .filter(entity::Column::Id.eq(candidate.id))
                .filter(entity::Column::Status.eq(JobStatus::Pending.to_string()))
                .exec(&self.db)
                .await
                .map_err(|e| VectorError::DbUpdate(e.to_string()))?;

            if result.rows_affected == 1 {
                return self.get(candidate.file_id).await;
            }
        }

        Ok(None)
    }

    async fn complete(&self, file_id: i32, outcome: EmbeddingOutcome, duration_ms: i64) -> VectorResult<()> {
        let patch = entity::ActiveModel {
            status: Set(JobStatus::Completed),
            model: Set(outcome.model),
            dimension: Set(outcome.dimension),
            error_message: Set(None),
            processing_duration: Set(Some(duration_ms)),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        if !self.update_running(file_id, patch).await? {
            tracing::warn!(file_id, "Job left running state before completion was recorded");
        }
        Ok(())
    }

    async fn fail(&self, file_id: i32, error: String, duration_ms: i64) -> VectorResult<()> {
        let patch = entity::ActiveModel {
            status: Set(JobStatus::Failed),
            error_message: Set(Some(error)),
            processing_duration: Set(Some(duration_ms)),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        if !self.update_running(file_id, patch).await? {
            tracing::warn!(file_id, "Job left running state before failure was recorded");
        }
        Ok(())
    }

    async fn recover_stuck(&self, cutoff: DateTime<Utc>, max_retries: i32) -> VectorResult<RecoveryReport> {
        let running = entity::Entity::find()
            .filter(entity::Column::Status.eq(JobStatus::Running.to_string()))
            .all(&self.db)
            .await
            .map_err(|e| VectorError::DbQuery(e.to_string()))?;

        let mut report = RecoveryReport::default();
        let now = Utc::now();

        for job in running {
            let updated_at: DateTime<Utc> = job.updated_at.into();
            if updated_at >= cutoff {
                continue;
            }

            let give_up = job.retry_count >= max_retries;
            let patch = if give_up {
                entity::ActiveModel {
                    status: Set(JobStatus::Failed),
                    error_message: Set(Some(format!(
                        "任务处理超时，已达到最大重试次数 ({})",
                        max_retries
                    ))),
                    updated_at: Set(now.into()),
                    ..Default::default()
                }
            } else {
                entity::ActiveModel {
                    status: Set(JobStatus::Pending),
                    retry_count: Set(job.retry_count + 1),
                    last_retry_at: Set(Some(now.into())),
                    updated_at: Set(now.into()),
                    ..Default::default()
                }
            };

            if self.update_running(job.file_id, patch).await? {
                if give_up {
                    report.failed += 1;
                } else {
                    report.requeued += 1;
                }
                tracing::info!(
                    file_id = job.file_id,
                    retry_count = job.retry_count,
                    give_up,
                    "Recovered stuck vector job"
                );
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};

    #[tokio::test]
    async fn test_delete_failure_is_reported_as_delete() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_errors([DbErr::Custom("database is locked".to_string())])
            .into_connection();

        let err = SqlVectorJobRepository::new(db).delete(3).await.unwrap_err();

        assert!(matches!(err, VectorError::DbDelete(_)));
        assert_eq!(err.kind(), "db_delete_failed");
    }
}
