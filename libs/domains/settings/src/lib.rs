//! Settings Domain
//!
//! Typed, grouped key/value configuration with cache coherency, change
//! notification and transactional batch writes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │ SettingsService          │  ← CRUD, batches, typed accessors
//! └──┬───────┬──────┬─────┬──┘
//!    │       │      │     │
//!    ▼       ▼      ▼     ▼
//!  Cache   Hooks   Bus   Repository (SQL / in-memory)
//!                          │
//!                        Codec
//! ```
//!
//! Writes run as *commit → invalidate caches → publish → trigger hooks*;
//! reads go through the cache and fall back to the repository on a miss.
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_settings::{
//!     InMemorySettingRepository, SettingInput, SettingType, SettingsCache, SettingsService,
//! };
//!
//! # async fn example() -> domain_settings::SettingsResult<()> {
//! let service = SettingsService::new(InMemorySettingRepository::new(), SettingsCache::in_memory());
//!
//! service
//!     .batch_upsert(vec![SettingInput::new("smtp_port", 587, SettingType::Number, "mail")])
//!     .await?;
//!
//! let port = service.get_int("mail", "smtp_port", 25).await;
//! # Ok(())
//! # }
//! ```

pub mod accessors;
pub mod bus;
pub mod cache;
pub mod codec;
pub mod entity;
pub mod error;
pub mod hooks;
pub mod keys;
pub mod models;
pub mod repository;
pub mod service;
pub mod sql;

// Re-export commonly used types
pub use bus::ChangeBus;
pub use cache::{
    CacheBackend, CacheError, InMemoryCacheBackend, RedisCacheBackend, SettingsCache, SettingsConfig,
};
pub use codec::SettingValue;
pub use error::{SettingsError, SettingsResult};
pub use hooks::{HookRegistry, SettingsHook};
pub use models::{
    BatchFailure, BatchOutcome, Setting, SettingChange, SettingFilter, SettingGroup, SettingInput,
    SettingRecord, SettingType,
};
pub use repository::{InMemorySettingRepository, SettingRepository, WriteMode};
pub use service::SettingsService;
pub use sql::SqlSettingRepository;
