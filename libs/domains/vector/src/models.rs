use chrono::{DateTime, Utc};
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Vector job lifecycle status
///
/// `pending → running → {completed | failed}`; admin actions add
/// `running → pending`, `{completed | failed | reset} → pending` and `reset`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Prior results cleared; re-queued like `failed`
    #[sea_orm(string_value = "reset")]
    Reset,
}

impl JobStatus {
    /// Statuses an operator may send back to `pending`
    pub const RETRYABLE: [JobStatus; 3] = [JobStatus::Completed, JobStatus::Failed, JobStatus::Reset];

    pub fn is_retryable(&self) -> bool {
        Self::RETRYABLE.contains(self)
    }
}

/// One embedding job, keyed by file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorJob {
    pub id: i32,
    pub file_id: i32,
    pub status: JobStatus,
    pub model: String,
    pub dimension: i32,
    pub retry_count: i32,
    pub last_retry_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    /// Milliseconds spent on the last run
    pub processing_duration: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub limit: Option<u64>,
}

impl JobFilter {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            limit: None,
        }
    }
}

/// Row counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounts {
    pub total: u64,
    pub pending: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
    pub reset: u64,
}

/// Live state of the worker pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeStats {
    pub paused: bool,
    pub active_workers: usize,
    pub max_workers: usize,
    pub available_permits: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: u64,
    pub pending: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
    pub reset: u64,
    pub active_workers: usize,
    pub max_workers: usize,
    pub runtime: RuntimeStats,
}

impl QueueStats {
    pub fn new(counts: JobCounts, runtime: RuntimeStats) -> Self {
        Self {
            total: counts.total,
            pending: counts.pending,
            running: counts.running,
            completed: counts.completed,
            failed: counts.failed,
            reset: counts.reset,
            active_workers: runtime.active_workers,
            max_workers: runtime.max_workers,
            runtime,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub found: usize,
    pub enqueued: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    pub found: usize,
    pub removed: usize,
}

/// Outcome of one stuck-job sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryReport {
    /// Sent back to pending
    pub requeued: u64,
    /// Retry ceiling reached
    pub failed: u64,
}

impl RecoveryReport {
    pub fn affected(&self) -> u64 {
        self.requeued + self.failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BatchAction {
    Reset,
    Retry,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchActionResult {
    pub file_id: i32,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchActionOutcome {
    pub success: Vec<i32>,
    pub failed: Vec<BatchActionResult>,
}

impl BatchActionOutcome {
    pub fn message(&self) -> String {
        if self.failed.is_empty() {
            format!("成功处理 {} 个任务", self.success.len())
        } else {
            format!("成功处理 {} 个任务，{} 个失败", self.success.len(), self.failed.len())
        }
    }
}

/// Health of the external collection as seen against the job table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CollectionStatus {
    EngineNotInitialized,
    QdrantConnectionFailed,
    EmptyButShouldHaveData,
    Ok,
}

/// What the vector store reports about its collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionProbe {
    pub exists: bool,
    pub points_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QdrantRealStats {
    pub collection: String,
    pub collection_status: CollectionStatus,
    pub collection_exists: bool,
    pub points_count: Option<u64>,
    pub jobs: JobCounts,
    /// Probe error, when the store could not be reached
    pub error: Option<String>,
}

/// Result of a successful embedding run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingOutcome {
    pub model: String,
    pub dimension: i32,
}
