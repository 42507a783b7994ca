//! Vector Queue Domain
//!
//! Job bookkeeping and the operator surface for file embeddings: the worker
//! runtime that claims jobs, and admin operations that reconcile the job
//! table against the file catalog and the external vector store.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────┐      ┌──────────────────┐
//! │  VectorAdminService   │─────▶│ SettingsService  │  persisted knobs
//! └──┬──────┬──────┬───┬──┘      └──────────────────┘
//!    │      │      │   │
//!    ▼      ▼      ▼   ▼
//!  Jobs   Files  Store Runtime ──▶ JobProcessor
//!  (SQL)  (SQL) (Qdrant)
//! ```
//!
//! Job lifecycle: `pending → running → {completed | failed}`, with admin
//! edges back to `pending` and the parked `reset` status.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_vector::{QueueRuntime, SqlFileCatalog, SqlVectorJobRepository, VectorAdminService};
//! use std::sync::Arc;
//!
//! let admin = VectorAdminService::new(
//!     Arc::new(SqlVectorJobRepository::new(db.clone())),
//!     Arc::new(SqlFileCatalog::new(db.clone())),
//!     Arc::new(QueueRuntime::new(2)),
//!     settings,
//! );
//!
//! admin.load_runtime_settings().await;
//! let recovered = admin.recover_stuck().await?;
//! ```

pub mod admin;
pub mod entity;
pub mod error;
pub mod files;
pub mod jobs;
pub mod models;
pub mod qdrant;
pub mod runtime;
pub mod store;

// Re-export commonly used types
pub use admin::VectorAdminService;
pub use error::{VectorError, VectorResult};
pub use files::{FileCatalog, InMemoryFileCatalog, SqlFileCatalog};
pub use jobs::{SqlVectorJobRepository, VectorJobRepository};
pub use models::{
    BatchAction, BatchActionOutcome, BatchActionResult, CleanReport, CollectionProbe, CollectionStatus,
    EmbeddingOutcome, JobCounts, JobFilter, JobStatus, QdrantRealStats, QueueStats, ReconcileReport,
    RecoveryReport, RuntimeStats, VectorJob,
};
pub use qdrant::{QdrantConfig, QdrantVectorStore};
pub use runtime::{JobProcessor, QueueRuntime};
pub use store::VectorStore;
