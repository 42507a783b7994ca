//! Integration tests for the vector queue domain
//!
//! Job rows, the file catalog and the persisted knobs all live in an
//! in-memory SQLite database, so the admin flows run against real SQL.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use domain_settings::keys::{self, groups};
use domain_settings::{SettingInput, SettingType, SettingsCache, SettingsService, SqlSettingRepository};
use domain_vector::entity::{files, vector_jobs};
use domain_vector::*;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{ActiveModelTrait, DatabaseConnection};
use std::sync::Arc;
use test_utils::{TestDataBuilder, TestDatabase, assertions::*};
use tokio::sync::watch;

struct Fixture {
    _db: TestDatabase,
    conn: DatabaseConnection,
    settings: SettingsService<SqlSettingRepository>,
    admin: VectorAdminService<SqlSettingRepository>,
}

async fn setup() -> Fixture {
    let db = TestDatabase::new().await;
    let conn = db.connection();
    domain_settings::entity::create_tables(&conn).await.unwrap();
    entity::create_tables(&conn).await.unwrap();

    let settings = SettingsService::new(SqlSettingRepository::new(conn.clone()), SettingsCache::in_memory());
    let admin = VectorAdminService::new(
        Arc::new(SqlVectorJobRepository::new(conn.clone())),
        Arc::new(SqlFileCatalog::new(conn.clone())),
        Arc::new(QueueRuntime::new(2)),
        settings.clone(),
    );

    Fixture {
        _db: db,
        conn,
        settings,
        admin,
    }
}

async fn insert_file(conn: &DatabaseConnection, id: i32, deleted: bool) {
    files::ActiveModel {
        id: Set(id),
        filename: Set(format!("file-{id}.pdf")),
        content_type: Set("application/pdf".to_string()),
        size: Set(1024),
        deleted: Set(deleted),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await
    .unwrap();
}

async fn insert_job(conn: &DatabaseConnection, file_id: i32, status: JobStatus, model: &str, age: Duration) {
    let touched = Utc::now() - age;
    vector_jobs::ActiveModel {
        id: NotSet,
        file_id: Set(file_id),
        status: Set(status),
        model: Set(model.to_string()),
        dimension: Set(1536),
        retry_count: Set(0),
        last_retry_at: Set(None),
        error_message: Set(None),
        processing_duration: Set(None),
        created_at: Set(touched.into()),
        updated_at: Set(touched.into()),
    }
    .insert(conn)
    .await
    .unwrap();
}

async fn status_of(admin: &VectorAdminService<SqlSettingRepository>, file_id: i32) -> JobStatus {
    assert_some(admin.jobs().get(file_id).await.unwrap(), "job row").status
}

// ============================================================================
// Stuck recovery
// ============================================================================

#[tokio::test]
async fn test_recover_stuck_requeues_once() {
    let fx = setup().await;
    let file_id = TestDataBuilder::from_test_name("recover_stuck_requeues_once").file_id(0);
    insert_job(&fx.conn, file_id, JobStatus::Running, "", Duration::hours(2)).await;

    assert_eq!(fx.admin.recover_stuck().await.unwrap(), 1);
    assert_eq!(status_of(&fx.admin, file_id).await, JobStatus::Pending);

    let job = fx.admin.jobs().get(file_id).await.unwrap().unwrap();
    assert_eq!(job.retry_count, 1);
    assert!(job.last_retry_at.is_some());

    assert_eq!(fx.admin.recover_stuck().await.unwrap(), 0);
}

#[tokio::test]
async fn test_recover_stuck_leaves_fresh_jobs() {
    let fx = setup().await;
    insert_job(&fx.conn, 1, JobStatus::Running, "", Duration::minutes(5)).await;

    assert_eq!(fx.admin.recover_stuck().await.unwrap(), 0);
    assert_eq!(status_of(&fx.admin, 1).await, JobStatus::Running);
}

#[tokio::test]
async fn test_recover_stuck_honors_configured_threshold() {
    let fx = setup().await;
    fx.settings
        .batch_upsert(vec![SettingInput::new(
            keys::PENDING_STUCK_THRESHOLD_MINUTES,
            2,
            SettingType::Number,
            groups::AI,
        )])
        .await
        .unwrap();
    insert_job(&fx.conn, 1, JobStatus::Running, "", Duration::minutes(5)).await;

    assert_eq!(fx.admin.recover_stuck().await.unwrap(), 1);
}

#[tokio::test]
async fn test_recover_stuck_fails_at_retry_ceiling() {
    let fx = setup().await;
    fx.settings
        .batch_upsert(vec![SettingInput::new(
            keys::VECTOR_MAX_RETRY_COUNT,
            0,
            SettingType::Number,
            groups::VECTOR,
        )])
        .await
        .unwrap();
    insert_job(&fx.conn, 1, JobStatus::Running, "", Duration::hours(1)).await;

    assert_eq!(fx.admin.recover_stuck().await.unwrap(), 1);

    let job = fx.admin.jobs().get(1).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_contains(&assert_some(job.error_message, "error message"), "最大重试次数", "failure reason");
}

// ============================================================================
// Queue maintenance
// ============================================================================

#[tokio::test]
async fn test_reconcile_enqueues_missing_and_failed() {
    let fx = setup().await;
    for id in 1..=4 {
        insert_file(&fx.conn, id, false).await;
    }
    insert_file(&fx.conn, 5, true).await;
    insert_job(&fx.conn, 1, JobStatus::Completed, "m", Duration::zero()).await;
    insert_job(&fx.conn, 2, JobStatus::Failed, "m", Duration::zero()).await;

    let dry = fx.admin.reconcile_missing(None, true).await.unwrap();
    assert_eq!(dry, ReconcileReport { found: 3, enqueued: 0 });

    let report = fx.admin.reconcile_missing(None, false).await.unwrap();
    assert_eq!(report, ReconcileReport { found: 3, enqueued: 3 });

    assert_eq!(status_of(&fx.admin, 2).await, JobStatus::Pending);
    assert_eq!(status_of(&fx.admin, 4).await, JobStatus::Pending);
    assert!(fx.admin.jobs().get(5).await.unwrap().is_none());

    // Everything is now in flight
    let again = fx.admin.reconcile_missing(None, false).await.unwrap();
    assert_eq!(again.found, 0);
}

#[tokio::test]
async fn test_clean_orphans_drops_rows_of_deleted_files() {
    let fx = setup().await;
    insert_file(&fx.conn, 1, false).await;
    insert_file(&fx.conn, 2, true).await;
    insert_job(&fx.conn, 1, JobStatus::Completed, "m", Duration::zero()).await;
    insert_job(&fx.conn, 2, JobStatus::Completed, "m", Duration::zero()).await;
    insert_job(&fx.conn, 3, JobStatus::Failed, "m", Duration::zero()).await;

    let dry = fx.admin.clean_orphans(None, true).await.unwrap();
    assert_eq!(dry, CleanReport { found: 2, removed: 0 });

    let report = fx.admin.clean_orphans(None, false).await.unwrap();
    assert_eq!(report, CleanReport { found: 2, removed: 2 });

    let remaining: Vec<i32> = fx
        .admin
        .jobs()
        .list(JobFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|job| job.file_id)
        .collect();
    assert_eq!(remaining, vec![1]);
}

#[tokio::test]
async fn test_rebuild_stale_follows_configured_model() {
    let fx = setup().await;
    fx.settings
        .batch_upsert(vec![SettingInput::new(
            keys::EMBEDDING_MODEL,
            "text-embedding-3-large",
            SettingType::String,
            groups::VECTOR,
        )])
        .await
        .unwrap();
    insert_job(&fx.conn, 1, JobStatus::Completed, "text-embedding-3-small", Duration::zero()).await;
    insert_job(&fx.conn, 2, JobStatus::Completed, "text-embedding-3-large", Duration::zero()).await;
    insert_job(&fx.conn, 3, JobStatus::Failed, "text-embedding-3-small", Duration::zero()).await;

    assert_eq!(fx.admin.rebuild_stale(None).await.unwrap(), 1);
    assert_eq!(status_of(&fx.admin, 1).await, JobStatus::Pending);
    assert_eq!(status_of(&fx.admin, 2).await, JobStatus::Completed);
    assert_eq!(status_of(&fx.admin, 3).await, JobStatus::Failed);
}

#[tokio::test]
async fn test_regenerate_all_with_and_without_force() {
    let fx = setup().await;
    insert_file(&fx.conn, 1, false).await;
    insert_file(&fx.conn, 2, false).await;
    insert_job(&fx.conn, 1, JobStatus::Completed, "m", Duration::zero()).await;

    let report = fx.admin.regenerate_all(false).await.unwrap();
    assert_eq!(report, ReconcileReport { found: 2, enqueued: 1 });
    assert_eq!(status_of(&fx.admin, 1).await, JobStatus::Completed);

    let forced = fx.admin.regenerate_all(true).await.unwrap();
    assert_eq!(forced.enqueued, 1);
    assert_eq!(status_of(&fx.admin, 1).await, JobStatus::Pending);
}

// ============================================================================
// Job actions
// ============================================================================

#[tokio::test]
async fn test_reset_requeues_job_for_workers() {
    let fx = setup().await;
    insert_job(&fx.conn, 1, JobStatus::Completed, "m", Duration::zero()).await;
    insert_job(&fx.conn, 2, JobStatus::Running, "m", Duration::zero()).await;
    insert_job(&fx.conn, 3, JobStatus::Pending, "m", Duration::zero()).await;

    let outcome = fx.admin.batch_action(vec![1, 2, 3, 99], BatchAction::Reset).await.unwrap();
    assert_eq!(outcome.success, vec![1]);
    let failed: Vec<i32> = outcome.failed.iter().map(|f| f.file_id).collect();
    assert_same_items(&failed, &[2, 3, 99], "rejected resets");

    let job = assert_some(fx.admin.jobs().get(1).await.unwrap(), "reset job");
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.retry_count, 0);
    assert!(job.error_message.is_none());

    // Pending rows are claimed oldest id first
    let claimed = assert_some(fx.admin.jobs().claim_next().await.unwrap(), "claimed job");
    assert_eq!(claimed.file_id, 1);

    let err = fx.admin.retry(3).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_parameter");
}

#[tokio::test]
async fn test_retry_requeues_reset_rows() {
    let fx = setup().await;
    insert_job(&fx.conn, 4, JobStatus::Reset, "m", Duration::zero()).await;

    fx.admin.retry(4).await.unwrap();
    assert_eq!(status_of(&fx.admin, 4).await, JobStatus::Pending);
}

#[tokio::test]
async fn test_batch_delete_without_store_removes_rows() {
    let fx = setup().await;
    insert_job(&fx.conn, 1, JobStatus::Failed, "m", Duration::zero()).await;

    let outcome = fx.admin.batch_action(vec![1], BatchAction::Delete).await.unwrap();
    assert_eq!(outcome.success, vec![1]);
    assert!(fx.admin.jobs().get(1).await.unwrap().is_none());
}

// ============================================================================
// Runtime knobs and stats
// ============================================================================

#[tokio::test]
async fn test_knobs_survive_a_restart() {
    let fx = setup().await;
    fx.admin.set_paused(true).await.unwrap();
    fx.admin.set_concurrency(4).await.unwrap();

    // A fresh runtime picks the persisted values up
    let restarted = VectorAdminService::new(
        Arc::new(SqlVectorJobRepository::new(fx.conn.clone())),
        Arc::new(SqlFileCatalog::new(fx.conn.clone())),
        Arc::new(QueueRuntime::new(1)),
        fx.settings.clone(),
    );
    let runtime = restarted.load_runtime_settings().await;

    assert!(runtime.paused);
    assert_eq!(runtime.max_workers, 4);
}

#[tokio::test]
async fn test_stats_combine_counts_and_runtime() {
    let fx = setup().await;
    insert_job(&fx.conn, 1, JobStatus::Pending, "", Duration::zero()).await;
    insert_job(&fx.conn, 2, JobStatus::Completed, "m", Duration::zero()).await;
    insert_job(&fx.conn, 3, JobStatus::Reset, "m", Duration::zero()).await;

    let stats = fx.admin.stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.reset, 1);
    assert_eq!(stats.max_workers, 2);
    assert!(!stats.runtime.paused);

    let real = fx.admin.qdrant_real_stats().await.unwrap();
    assert_eq!(real.collection_status, CollectionStatus::EngineNotInitialized);
    assert_eq!(real.jobs.total, 3);
}

// ============================================================================
// Worker runtime against SQL
// ============================================================================

struct EchoProcessor;

#[async_trait]
impl JobProcessor for EchoProcessor {
    async fn process(&self, job: &VectorJob) -> Result<EmbeddingOutcome, VectorError> {
        if job.file_id % 2 == 0 {
            Err(VectorError::ExternalTimeout(10))
        } else {
            Ok(EmbeddingOutcome {
                model: "text-embedding-3-small".to_string(),
                dimension: 1536,
            })
        }
    }

    fn name(&self) -> &'static str {
        "EchoProcessor"
    }
}

#[tokio::test]
async fn test_runtime_drains_pending_jobs() {
    let fx = setup().await;
    insert_job(&fx.conn, 1, JobStatus::Pending, "", Duration::zero()).await;
    insert_job(&fx.conn, 2, JobStatus::Pending, "", Duration::zero()).await;

    let runtime = Arc::new(QueueRuntime::new(2).with_poll_interval(std::time::Duration::from_millis(10)));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(Arc::clone(&runtime).run(
        Arc::clone(fx.admin.jobs()),
        Arc::new(EchoProcessor),
        shutdown_rx,
    ));

    for _ in 0..100 {
        let counts = fx.admin.jobs().counts().await.unwrap();
        if counts.completed + counts.failed == 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    let done = fx.admin.jobs().get(1).await.unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.model, "text-embedding-3-small");
    assert!(done.processing_duration.is_some());

    let failed = fx.admin.jobs().get(2).await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_contains(&assert_some(failed.error_message, "error message"), "timed out", "failure reason");
}
