use chrono::{Duration, Utc};
use domain_settings::keys::{self, groups};
use domain_settings::{BatchOutcome, SettingInput, SettingRepository, SettingType, SettingsService};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;

use crate::error::{VectorError, VectorResult};
use crate::files::FileCatalog;
use crate::jobs::VectorJobRepository;
use crate::models::{
    BatchAction, BatchActionOutcome, BatchActionResult, CleanReport, CollectionStatus, JobFilter,
    JobStatus, QdrantRealStats, QueueStats, ReconcileReport, RuntimeStats, VectorJob,
};
use crate::qdrant::DEFAULT_COLLECTION;
use crate::runtime::QueueRuntime;
use crate::store::VectorStore;

const DEFAULT_STUCK_MINUTES: i64 = 30;
const MAX_STUCK_MINUTES: i64 = 7 * 24 * 60;
const DEFAULT_MAX_RETRIES: i64 = 3;
const DEFAULT_CONCURRENCY: i64 = 2;
// Upper bound on payload ids pulled from the store in one orphan scan
const STORE_SCAN_LIMIT: usize = 10_000;

/// Operator surface of the vector queue.
///
/// Combines the job table, the file catalog, the optional vector store and
/// the live runtime; persistent knobs are written through the settings
/// store so they survive restarts.
pub struct VectorAdminService<S: SettingRepository> {
    jobs: Arc<dyn VectorJobRepository>,
    files: Arc<dyn FileCatalog>,
    store: Option<Arc<dyn VectorStore>>,
    runtime: Arc<QueueRuntime>,
    settings: SettingsService<S>,
}

impl<S: SettingRepository> Clone for VectorAdminService<S> {
    fn clone(&self) -> Self {
        Self {
            jobs: Arc::clone(&self.jobs),
            files: Arc::clone(&self.files),
            store: self.store.clone(),
            runtime: Arc::clone(&self.runtime),
            settings: self.settings.clone(),
        }
    }
}

impl<S: SettingRepository> VectorAdminService<S> {
    pub fn new(
        jobs: Arc<dyn VectorJobRepository>,
        files: Arc<dyn FileCatalog>,
        runtime: Arc<QueueRuntime>,
        settings: SettingsService<S>,
    ) -> Self {
        Self {
            jobs,
            files,
            store: None,
            runtime,
            settings,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn runtime(&self) -> &Arc<QueueRuntime> {
        &self.runtime
    }

    pub fn jobs(&self) -> &Arc<dyn VectorJobRepository> {
        &self.jobs
    }

    /// Pause or resume automatic processing and persist the choice
    #[instrument(skip(self))]
    pub async fn set_paused(&self, paused: bool) -> VectorResult<()> {
        self.persist(keys::VECTOR_AUTO_PROCESSING_ENABLED, Value::Bool(!paused), SettingType::Boolean)
            .await?;
        self.runtime.set_paused(paused).await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_concurrency(&self, workers: usize) -> VectorResult<()> {
        if workers == 0 {
            return Err(VectorError::Validation("并发数必须大于 0".to_string()));
        }

        self.persist(keys::VECTOR_CONCURRENCY, Value::from(workers), SettingType::Number)
            .await?;
        self.runtime.set_concurrency(workers).await;
        Ok(())
    }

    /// Apply the persisted pause flag and worker count to the runtime
    pub async fn load_runtime_settings(&self) -> RuntimeStats {
        let enabled = self
            .settings
            .get_bool(groups::VECTOR, keys::VECTOR_AUTO_PROCESSING_ENABLED, true)
            .await;
        let workers = self
            .settings
            .get_int(groups::VECTOR, keys::VECTOR_CONCURRENCY, DEFAULT_CONCURRENCY)
            .await;

        self.runtime.set_paused(!enabled).await;
        self.runtime
            .set_concurrency(usize::try_from(workers).unwrap_or(1).max(1))
            .await;

        self.runtime.stats()
    }

    pub async fn stats(&self) -> VectorResult<QueueStats> {
        let counts = self.jobs.counts().await?;
        Ok(QueueStats::new(counts, self.runtime.stats()))
    }

    /// Queue files that should have embeddings but do not.
    ///
    /// Candidates are active files without a job, files whose job failed or
    /// was reset, and (with a store configured) completed jobs whose points
    /// are missing. Pending and running jobs are already in flight.
    #[instrument(skip(self))]
    pub async fn reconcile_missing(&self, limit: Option<usize>, dry_run: bool) -> VectorResult<ReconcileReport> {
        let active = self.files.active_file_ids().await?;
        let jobs = self.jobs_by_file().await?;
        let cap = limit.unwrap_or(usize::MAX);

        let mut store_reachable = true;
        let mut candidates: Vec<(i32, Option<JobStatus>)> = Vec::new();

        for file_id in active {
            if candidates.len() >= cap {
                break;
            }

            let status = jobs.get(&file_id).map(|job| job.status);
            let missing = match status {
                None | Some(JobStatus::Failed) | Some(JobStatus::Reset) => true,
                Some(JobStatus::Completed) => match self.store.as_ref().filter(|_| store_reachable) {
                    Some(store) => match store.has_file(file_id).await {
                        Ok(present) => !present,
                        Err(VectorError::CollectionMissing(_)) => true,
                        Err(e) => {
                            tracing::warn!(error = %e, "Vector store unreachable, skipping point checks");
                            store_reachable = false;
                            false
                        }
                    },
                    None => false,
                },
                Some(JobStatus::Pending) | Some(JobStatus::Running) => false,
            };

            if missing {
                candidates.push((file_id, status));
            }
        }

        let mut report = ReconcileReport {
            found: candidates.len(),
            enqueued: 0,
        };

        if dry_run {
            tracing::info!(found = report.found, "Reconcile dry run");
            return Ok(report);
        }

        for (file_id, status) in candidates {
            let queued = match status {
                None => self.jobs.insert_pending(file_id).await?,
                Some(from) => self.jobs.transition(file_id, vec![from], JobStatus::Pending).await?,
            };
            if queued {
                report.enqueued += 1;
            }
        }

        tracing::info!(found = report.found, enqueued = report.enqueued, "Reconciled missing embeddings");
        Ok(report)
    }

    /// Remove job rows and store points whose file is gone
    #[instrument(skip(self))]
    pub async fn clean_orphans(&self, limit: Option<usize>, dry_run: bool) -> VectorResult<CleanReport> {
        let active: HashSet<i32> = self.files.active_file_ids().await?.into_iter().collect();
        let cap = limit.unwrap_or(usize::MAX);

        let mut orphans: BTreeSet<i32> = self
            .jobs
            .list(JobFilter::default())
            .await?
            .into_iter()
            .map(|job| job.file_id)
            .filter(|file_id| !active.contains(file_id))
            .collect();

        if let Some(store) = &self.store {
            match store.file_ids(STORE_SCAN_LIMIT).await {
                Ok(ids) => orphans.extend(ids.into_iter().filter(|id| !active.contains(id))),
                Err(e) => tracing::warn!(error = %e, "Vector store unreachable, cleaning job rows only"),
            }
        }

        let orphans: Vec<i32> = orphans.into_iter().take(cap).collect();
        let mut report = CleanReport {
            found: orphans.len(),
            removed: 0,
        };

        if dry_run {
            tracing::info!(found = report.found, "Orphan scan dry run");
            return Ok(report);
        }

        for file_id in orphans {
            if let Some(store) = &self.store {
                if let Err(e) = store.delete_file(file_id).await {
                    tracing::warn!(file_id, error = %e, "Failed to delete orphan points");
                    continue;
                }
            }
            self.jobs.delete(file_id).await?;
            report.removed += 1;
        }

        tracing::info!(found = report.found, removed = report.removed, "Cleaned orphan embeddings");
        Ok(report)
    }

    /// Re-queue completed jobs embedded with a model other than the configured one
    #[instrument(skip(self))]
    pub async fn rebuild_stale(&self, limit: Option<usize>) -> VectorResult<usize> {
        let model = self
            .settings
            .get_string(groups::VECTOR, keys::EMBEDDING_MODEL, "")
            .await;
        if model.is_empty() {
            return Err(VectorError::Validation("未配置嵌入模型".to_string()));
        }

        let stale: Vec<VectorJob> = self
            .jobs
            .list(JobFilter::status(JobStatus::Completed))
            .await?
            .into_iter()
            .filter(|job| job.model != model)
            .take(limit.unwrap_or(usize::MAX))
            .collect();

        let mut enqueued = 0;
        for job in stale {
            if self
                .jobs
                .transition(job.file_id, vec![JobStatus::Completed], JobStatus::Pending)
                .await?
            {
                enqueued += 1;
            }
        }

        tracing::info!(model = %model, enqueued, "Queued stale embeddings for rebuild");
        Ok(enqueued)
    }

    /// Send jobs stuck in `running` back to `pending`; returns the number of rows touched
    #[instrument(skip(self))]
    pub async fn recover_stuck(&self) -> VectorResult<u64> {
        let minutes = self
            .settings
            .get_int(groups::AI, keys::PENDING_STUCK_THRESHOLD_MINUTES, DEFAULT_STUCK_MINUTES)
            .await
            .clamp(1, MAX_STUCK_MINUTES);
        let max_retries = self
            .settings
            .get_int(groups::VECTOR, keys::VECTOR_MAX_RETRY_COUNT, DEFAULT_MAX_RETRIES)
            .await
            .clamp(0, i64::from(i32::MAX)) as i32;

        let cutoff = Utc::now() - Duration::minutes(minutes);
        let report = self.jobs.recover_stuck(cutoff, max_retries).await?;

        if report.affected() > 0 {
            tracing::info!(
                requeued = report.requeued,
                failed = report.failed,
                threshold_minutes = minutes,
                "Recovered stuck vector jobs"
            );
        }
        Ok(report.affected())
    }

    #[instrument(skip(self))]
    pub async fn retry(&self, file_id: i32) -> VectorResult<()> {
        let job = self.jobs.get(file_id).await?.ok_or(VectorError::NotFound(file_id))?;

        if !job.status.is_retryable() {
            return Err(VectorError::Validation(format!(
                "任务状态为 {}，无法重试",
                job.status
            )));
        }

        let moved = self
            .jobs
            .transition(file_id, JobStatus::RETRYABLE.to_vec(), JobStatus::Pending)
            .await?;
        if !moved {
            return Err(VectorError::Validation("任务状态已变化，请刷新后重试".to_string()));
        }

        tracing::info!(file_id, "Vector job queued for retry");
        Ok(())
    }

    /// Apply `action` to each file; failures are reported per item
    #[instrument(skip(self, file_ids), fields(count = file_ids.len()))]
    pub async fn batch_action(&self, file_ids: Vec<i32>, action: BatchAction) -> VectorResult<BatchActionOutcome> {
        if file_ids.is_empty() {
            return Err(VectorError::Validation("至少选择一个任务".to_string()));
        }

        let mut seen = HashSet::new();
        let mut outcome = BatchActionOutcome::default();

        for file_id in file_ids.into_iter().filter(|id| seen.insert(*id)) {
            let result = match action {
                BatchAction::Reset => self.reset(file_id).await,
                BatchAction::Retry => self.retry(file_id).await,
                BatchAction::Delete => self.delete(file_id).await,
            };

            match result {
                Ok(()) => outcome.success.push(file_id),
                Err(e) => outcome.failed.push(BatchActionResult {
                    file_id,
                    success: false,
                    message: e.to_string(),
                }),
            }
        }

        tracing::info!(
            action = %action,
            succeeded = outcome.success.len(),
            failed = outcome.failed.len(),
            "Applied batch action"
        );
        Ok(outcome)
    }

    /// Queue every active file; `force` also re-queues completed jobs
    #[instrument(skip(self))]
    pub async fn regenerate_all(&self, force: bool) -> VectorResult<ReconcileReport> {
        let active = self.files.active_file_ids().await?;
        let jobs = self.jobs_by_file().await?;

        let mut report = ReconcileReport {
            found: active.len(),
            enqueued: 0,
        };

        for file_id in active {
            let queued = match jobs.get(&file_id).map(|job| job.status) {
                None => self.jobs.insert_pending(file_id).await?,
                Some(status @ (JobStatus::Failed | JobStatus::Reset)) => {
                    self.jobs.transition(file_id, vec![status], JobStatus::Pending).await?
                }
                Some(JobStatus::Completed) if force => {
                    self.jobs
                        .transition(file_id, vec![JobStatus::Completed], JobStatus::Pending)
                        .await?
                }
                Some(_) => false,
            };
            if queued {
                report.enqueued += 1;
            }
        }

        tracing::info!(found = report.found, enqueued = report.enqueued, force, "Regenerating embeddings");
        Ok(report)
    }

    /// Job counts plus a best-effort look at the vector collection
    pub async fn qdrant_real_stats(&self) -> VectorResult<QdrantRealStats> {
        let jobs = self.jobs.counts().await?;

        let Some(store) = &self.store else {
            return Ok(QdrantRealStats {
                collection: DEFAULT_COLLECTION.to_string(),
                collection_status: CollectionStatus::EngineNotInitialized,
                collection_exists: false,
                points_count: None,
                jobs,
                error: None,
            });
        };

        let collection = store.collection();
        match store.probe().await {
            Ok(probe) => {
                let status = if jobs.completed > 0 && (!probe.exists || probe.points_count == 0) {
                    CollectionStatus::EmptyButShouldHaveData
                } else {
                    CollectionStatus::Ok
                };

                Ok(QdrantRealStats {
                    collection,
                    collection_status: status,
                    collection_exists: probe.exists,
                    points_count: Some(probe.points_count),
                    jobs,
                    error: None,
                })
            }
            Err(e) => {
                tracing::warn!(collection = %collection, error = %e, "Vector store probe failed");
                Ok(QdrantRealStats {
                    collection,
                    collection_status: CollectionStatus::QdrantConnectionFailed,
                    collection_exists: false,
                    points_count: None,
                    jobs,
                    error: Some(e.to_string()),
                })
            }
        }
    }

    /// Drop prior points and send the job back to the queue
    async fn reset(&self, file_id: i32) -> VectorResult<()> {
        let job = self.jobs.get(file_id).await?.ok_or(VectorError::NotFound(file_id))?;
        if !job.status.is_retryable() {
            return Err(VectorError::Validation(format!("任务状态为 {}，无法重置", job.status)));
        }

        self.purge_points(file_id).await?;

        let moved = self
            .jobs
            .transition(file_id, JobStatus::RETRYABLE.to_vec(), JobStatus::Pending)
            .await?;
        if !moved {
            return Err(VectorError::Validation("任务状态已变化，请刷新后重试".to_string()));
        }
        Ok(())
    }

    async fn delete(&self, file_id: i32) -> VectorResult<()> {
        if self.store.is_some() {
            self.purge_points(file_id).await?;
        } else {
            tracing::warn!(file_id, "No vector store configured, deleting job row only");
        }

        if !self.jobs.delete(file_id).await? {
            return Err(VectorError::NotFound(file_id));
        }
        Ok(())
    }

    /// Delete a file's points; a missing collection has none to delete
    async fn purge_points(&self, file_id: i32) -> VectorResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        match store.delete_file(file_id).await {
            Err(VectorError::CollectionMissing(_)) => Ok(()),
            other => other,
        }
    }

    async fn jobs_by_file(&self) -> VectorResult<HashMap<i32, VectorJob>> {
        Ok(self
            .jobs
            .list(JobFilter::default())
            .await?
            .into_iter()
            .map(|job| (job.file_id, job))
            .collect())
    }

    async fn persist(&self, key: &str, value: Value, setting_type: SettingType) -> VectorResult<()> {
        let outcome: BatchOutcome = self
            .settings
            .batch_upsert(vec![SettingInput::new(key, value, setting_type, groups::VECTOR)])
            .await?;

        match outcome.failed.into_iter().next() {
            Some(failure) => Err(VectorError::Validation(failure.message)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::{InMemoryFileCatalog, MockFileCatalog};
    use crate::jobs::MockVectorJobRepository;
    use crate::models::{CollectionProbe, JobCounts};
    use crate::store::MockVectorStore;
    use domain_settings::{InMemorySettingRepository, SettingsCache};

    fn settings() -> SettingsService<InMemorySettingRepository> {
        SettingsService::new(InMemorySettingRepository::new(), SettingsCache::in_memory())
    }

    fn job(file_id: i32, status: JobStatus) -> VectorJob {
        VectorJob {
            id: file_id,
            file_id,
            status,
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            retry_count: 0,
            last_retry_at: None,
            error_message: None,
            processing_duration: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn admin(
        jobs: MockVectorJobRepository,
        files: impl FileCatalog + 'static,
    ) -> VectorAdminService<InMemorySettingRepository> {
        VectorAdminService::new(
            Arc::new(jobs),
            Arc::new(files),
            Arc::new(QueueRuntime::new(2)),
            settings(),
        )
    }

    #[tokio::test]
    async fn test_set_paused_persists_and_flips_runtime() {
        let service = admin(MockVectorJobRepository::new(), InMemoryFileCatalog::new());

        service.set_paused(true).await.unwrap();

        assert!(service.runtime().is_paused());
        assert!(
            !service
                .settings
                .get_bool(groups::VECTOR, keys::VECTOR_AUTO_PROCESSING_ENABLED, true)
                .await
        );

        service.set_paused(false).await.unwrap();
        assert!(!service.runtime().is_paused());
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let service = admin(MockVectorJobRepository::new(), InMemoryFileCatalog::new());

        let err = service.set_concurrency(0).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_parameter");
        assert_eq!(service.runtime().max_workers(), 2);
    }

    #[tokio::test]
    async fn test_set_concurrency_persists() {
        let service = admin(MockVectorJobRepository::new(), InMemoryFileCatalog::new());

        service.set_concurrency(6).await.unwrap();

        assert_eq!(service.runtime().max_workers(), 6);
        assert_eq!(
            service.settings.get_int(groups::VECTOR, keys::VECTOR_CONCURRENCY, 0).await,
            6
        );
    }

    #[tokio::test]
    async fn test_retry_unknown_job_is_not_found() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_get().returning(|_| Ok(None));

        let err = admin(jobs, InMemoryFileCatalog::new()).retry(9).await.unwrap_err();
        assert!(matches!(err, VectorError::NotFound(9)));
    }

    #[tokio::test]
    async fn test_retry_running_job_rejected() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_get().returning(|id| Ok(Some(job(id, JobStatus::Running))));
        jobs.expect_transition().times(0);

        let err = admin(jobs, InMemoryFileCatalog::new()).retry(3).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_parameter");
    }

    #[tokio::test]
    async fn test_batch_delete_reports_per_item() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_delete().returning(|id| Ok(id == 1));

        let mut store = MockVectorStore::new();
        store.expect_delete_file().returning(|_| Ok(()));

        let service = admin(jobs, InMemoryFileCatalog::new()).with_store(Arc::new(store));
        let outcome = service
            .batch_action(vec![1, 2, 1], BatchAction::Delete)
            .await
            .unwrap();

        assert_eq!(outcome.success, vec![1]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].file_id, 2);
        assert_eq!(outcome.message(), "成功处理 1 个任务，1 个失败");
    }

    #[tokio::test]
    async fn test_delete_keeps_row_when_store_fails() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_delete().times(0);

        let mut store = MockVectorStore::new();
        store
            .expect_delete_file()
            .returning(|_| Err(VectorError::ExternalTimeout(10)));

        let service = admin(jobs, InMemoryFileCatalog::new()).with_store(Arc::new(store));
        let outcome = service.batch_action(vec![4], BatchAction::Delete).await.unwrap();

        assert!(outcome.success.is_empty());
        assert!(outcome.failed[0].message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let service = admin(MockVectorJobRepository::new(), InMemoryFileCatalog::new());
        assert!(service.batch_action(vec![], BatchAction::Retry).await.is_err());
    }

    #[tokio::test]
    async fn test_reconcile_dry_run_enqueues_nothing() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_list()
            .returning(|_| Ok(vec![job(1, JobStatus::Completed), job(2, JobStatus::Failed), job(3, JobStatus::Running)]));
        jobs.expect_insert_pending().times(0);
        jobs.expect_transition().times(0);

        let service = admin(jobs, InMemoryFileCatalog::with_files([1, 2, 3, 4]));
        let report = service.reconcile_missing(None, true).await.unwrap();

        // File 2 failed, file 4 has no job
        assert_eq!(report, ReconcileReport { found: 2, enqueued: 0 });
    }

    #[tokio::test]
    async fn test_reconcile_requeues_completed_without_points() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_list()
            .returning(|_| Ok(vec![job(1, JobStatus::Completed), job(2, JobStatus::Completed)]));
        jobs.expect_transition()
            .withf(|file_id, from, to| *file_id == 2 && from == &vec![JobStatus::Completed] && *to == JobStatus::Pending)
            .times(1)
            .returning(|_, _, _| Ok(true));

        let mut store = MockVectorStore::new();
        store.expect_has_file().returning(|file_id| Ok(file_id == 1));

        let service = admin(jobs, InMemoryFileCatalog::with_files([1, 2])).with_store(Arc::new(store));
        let report = service.reconcile_missing(None, false).await.unwrap();

        assert_eq!(report, ReconcileReport { found: 1, enqueued: 1 });
    }

    #[tokio::test]
    async fn test_reconcile_respects_limit() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_list().returning(|_| Ok(vec![]));
        jobs.expect_insert_pending().times(2).returning(|_| Ok(true));

        let service = admin(jobs, InMemoryFileCatalog::with_files([1, 2, 3, 4, 5]));
        let report = service.reconcile_missing(Some(2), false).await.unwrap();

        assert_eq!(report, ReconcileReport { found: 2, enqueued: 2 });
    }

    #[tokio::test]
    async fn test_clean_orphans_merges_rows_and_points() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_list()
            .returning(|_| Ok(vec![job(1, JobStatus::Completed), job(7, JobStatus::Completed)]));
        jobs.expect_delete().times(2).returning(|_| Ok(true));

        let mut store = MockVectorStore::new();
        store.expect_file_ids().returning(|_| Ok(vec![1, 7, 8]));
        store.expect_delete_file().times(2).returning(|_| Ok(()));

        let service = admin(jobs, InMemoryFileCatalog::with_files([1])).with_store(Arc::new(store));
        let report = service.clean_orphans(None, false).await.unwrap();

        assert_eq!(report, CleanReport { found: 2, removed: 2 });
    }

    #[tokio::test]
    async fn test_clean_orphans_survives_store_outage() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_list().returning(|_| Ok(vec![job(5, JobStatus::Failed)]));

        let mut store = MockVectorStore::new();
        store
            .expect_file_ids()
            .returning(|_| Err(VectorError::ExternalConnection("refused".to_string())));

        let service = admin(jobs, InMemoryFileCatalog::new()).with_store(Arc::new(store));
        let report = service.clean_orphans(None, true).await.unwrap();

        assert_eq!(report, CleanReport { found: 1, removed: 0 });
    }

    #[tokio::test]
    async fn test_clean_orphans_scans_past_the_result_cap() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_list().returning(|_| Ok(vec![]));

        let mut store = MockVectorStore::new();
        store
            .expect_file_ids()
            .withf(|limit| *limit == STORE_SCAN_LIMIT)
            .returning(|limit| Ok([1, 2, 3].into_iter().take(limit).collect()));

        let service = admin(jobs, InMemoryFileCatalog::with_files([1, 2])).with_store(Arc::new(store));
        let report = service.clean_orphans(Some(1), true).await.unwrap();

        assert_eq!(report, CleanReport { found: 1, removed: 0 });
    }

    #[tokio::test]
    async fn test_reconcile_requeues_when_collection_missing() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_list()
            .returning(|_| Ok(vec![job(1, JobStatus::Completed), job(2, JobStatus::Completed)]));
        jobs.expect_transition().times(2).returning(|_, _, _| Ok(true));

        let mut store = MockVectorStore::new();
        store
            .expect_has_file()
            .times(2)
            .returning(|_| Err(VectorError::CollectionMissing("documents".to_string())));

        let service = admin(jobs, InMemoryFileCatalog::with_files([1, 2])).with_store(Arc::new(store));
        let report = service.reconcile_missing(None, false).await.unwrap();

        assert_eq!(report, ReconcileReport { found: 2, enqueued: 2 });
    }

    #[tokio::test]
    async fn test_reconcile_stops_store_checks_after_outage() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_list()
            .returning(|_| Ok(vec![job(1, JobStatus::Completed), job(2, JobStatus::Completed)]));

        let mut store = MockVectorStore::new();
        store
            .expect_has_file()
            .times(1)
            .returning(|_| Err(VectorError::ExternalConnection("refused".to_string())));

        let service = admin(jobs, InMemoryFileCatalog::with_files([1, 2])).with_store(Arc::new(store));
        let report = service.reconcile_missing(None, true).await.unwrap();

        assert_eq!(report, ReconcileReport { found: 0, enqueued: 0 });
    }

    #[tokio::test]
    async fn test_reset_requeues_and_drops_points() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_get().returning(|id| Ok(Some(job(id, JobStatus::Completed))));
        jobs.expect_transition()
            .withf(|file_id, from, to| *file_id == 5 && from.len() == 3 && *to == JobStatus::Pending)
            .times(1)
            .returning(|_, _, _| Ok(true));

        let mut store = MockVectorStore::new();
        store
            .expect_delete_file()
            .times(1)
            .returning(|_| Err(VectorError::CollectionMissing("documents".to_string())));

        let service = admin(jobs, InMemoryFileCatalog::new()).with_store(Arc::new(store));
        let outcome = service.batch_action(vec![5], BatchAction::Reset).await.unwrap();

        assert_eq!(outcome.success, vec![5]);
    }

    #[tokio::test]
    async fn test_reset_rejects_pending_job() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_get().returning(|id| Ok(Some(job(id, JobStatus::Pending))));
        jobs.expect_transition().times(0);

        let mut store = MockVectorStore::new();
        store.expect_delete_file().times(0);

        let service = admin(jobs, InMemoryFileCatalog::new()).with_store(Arc::new(store));
        let outcome = service.batch_action(vec![6], BatchAction::Reset).await.unwrap();

        assert!(outcome.success.is_empty());
        assert!(outcome.failed[0].message.contains("pending"));
    }

    #[tokio::test]
    async fn test_rebuild_stale_requires_model() {
        let service = admin(MockVectorJobRepository::new(), InMemoryFileCatalog::new());
        assert!(service.rebuild_stale(None).await.is_err());
    }

    #[tokio::test]
    async fn test_recover_stuck_uses_defaults() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_recover_stuck()
            .withf(|cutoff, max_retries| {
                let age = Utc::now() - *cutoff;
                *max_retries == 3 && age >= Duration::minutes(29) && age <= Duration::minutes(31)
            })
            .returning(|_, _| {
                Ok(crate::models::RecoveryReport {
                    requeued: 2,
                    failed: 1,
                })
            });

        let affected = admin(jobs, InMemoryFileCatalog::new()).recover_stuck().await.unwrap();
        assert_eq!(affected, 3);
    }

    #[tokio::test]
    async fn test_real_stats_without_store() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_counts().returning(|| Ok(JobCounts::default()));

        let stats = admin(jobs, InMemoryFileCatalog::new()).qdrant_real_stats().await.unwrap();

        assert_eq!(stats.collection_status, CollectionStatus::EngineNotInitialized);
        assert_eq!(stats.points_count, None);
    }

    #[tokio::test]
    async fn test_real_stats_degrades_on_probe_failure() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_counts().returning(|| {
            Ok(JobCounts {
                total: 4,
                completed: 4,
                ..Default::default()
            })
        });

        let mut store = MockVectorStore::new();
        store.expect_collection().return_const("file_embeddings".to_string());
        store
            .expect_probe()
            .returning(|| Err(VectorError::ExternalConnection("refused".to_string())));

        let service = admin(jobs, InMemoryFileCatalog::new()).with_store(Arc::new(store));
        let stats = service.qdrant_real_stats().await.unwrap();

        assert_eq!(stats.collection_status, CollectionStatus::QdrantConnectionFailed);
        assert_eq!(stats.jobs.completed, 4);
        assert!(stats.error.is_some());
    }

    #[tokio::test]
    async fn test_real_stats_flags_empty_collection() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_counts().returning(|| {
            Ok(JobCounts {
                total: 1,
                completed: 1,
                ..Default::default()
            })
        });

        let mut store = MockVectorStore::new();
        store.expect_collection().return_const("file_embeddings".to_string());
        store.expect_probe().returning(|| {
            Ok(CollectionProbe {
                exists: true,
                points_count: 0,
            })
        });

        let service = admin(jobs, InMemoryFileCatalog::new()).with_store(Arc::new(store));
        let stats = service.qdrant_real_stats().await.unwrap();

        assert_eq!(stats.collection_status, CollectionStatus::EmptyButShouldHaveData);
    }

    #[tokio::test]
    async fn test_regenerate_force_requeues_completed() {
        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_list()
            .returning(|_| Ok(vec![job(1, JobStatus::Completed), job(2, JobStatus::Running)]));
        jobs.expect_transition().times(1).returning(|_, _, _| Ok(true));
        jobs.expect_insert_pending().times(1).returning(|_| Ok(true));

        let service = admin(jobs, InMemoryFileCatalog::with_files([1, 2, 3]));
        let report = service.regenerate_all(true).await.unwrap();

        assert_eq!(report, ReconcileReport { found: 3, enqueued: 2 });
    }

    #[tokio::test]
    async fn test_file_catalog_errors_propagate() {
        let mut files = MockFileCatalog::new();
        files
            .expect_active_file_ids()
            .returning(|| Err(VectorError::DbQuery("boom".to_string())));

        let mut jobs = MockVectorJobRepository::new();
        jobs.expect_list().returning(|_| Ok(vec![]));

        let err = admin(jobs, files).regenerate_all(false).await.unwrap_err();
        assert_eq!(err.kind(), "db_query_failed");
    }
}
