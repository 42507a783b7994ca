use database::redis;
use domain_settings::keys::groups;
use domain_settings::{
    InMemoryCacheBackend, RedisCacheBackend, SettingsCache, SettingsService, SqlSettingRepository,
};
use domain_vector::{
    QdrantVectorStore, QueueRuntime, SqlFileCatalog, SqlVectorJobRepository, VectorAdminService,
};
use eyre::{Result, WrapErr};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::mailer::{MailerHandle, MailerRefreshHook};

pub type Settings = SettingsService<SqlSettingRepository>;
pub type VectorAdmin = VectorAdminService<SqlSettingRepository>;

/// Everything request handlers and background tasks share.
///
/// Built once at startup and passed around by clone.
#[derive(Clone)]
pub struct AppContext {
    pub db: DatabaseConnection,
    pub settings: Settings,
    pub vector: VectorAdmin,
    pub mailer: Arc<MailerHandle>,
}

impl AppContext {
    /// Wire the settings store and vector admin over an open database
    pub async fn build(config: &ServiceConfig, db: DatabaseConnection) -> Result<Self> {
        let cache = match &config.redis {
            Some(redis_config) => {
                let conn = redis::connect_with_retry(redis_config, None)
                    .await
                    .wrap_err("Failed to connect to Redis")?;
                info!("Settings cache backed by Redis");
                SettingsCache::new(Arc::new(RedisCacheBackend::new(conn)), &config.settings)
            }
            None => {
                info!("Redis not configured, using in-process settings cache");
                SettingsCache::new(Arc::new(InMemoryCacheBackend::new()), &config.settings)
            }
        };

        let settings = SettingsService::new(SqlSettingRepository::new(db.clone()), cache);

        let mut vector = VectorAdminService::new(
            Arc::new(SqlVectorJobRepository::new(db.clone())),
            Arc::new(SqlFileCatalog::new(db.clone())),
            Arc::new(QueueRuntime::new(1)),
            settings.clone(),
        );

        match &config.qdrant {
            Some(qdrant_config) => match QdrantVectorStore::new(qdrant_config.clone()) {
                Ok(store) => {
                    info!(collection = %qdrant_config.collection, "Vector store configured");
                    vector = vector.with_store(Arc::new(store));
                }
                Err(e) => warn!(error = %e, "Vector store unavailable, continuing without it"),
            },
            None => info!("QDRANT_URL not set, vector admin limited to relational data"),
        }

        Ok(Self {
            db,
            settings,
            vector,
            mailer: Arc::new(MailerHandle::new()),
        })
    }

    /// Load runtime state from settings and subscribe to their changes.
    ///
    /// Call after migrations so the seeded values are visible.
    pub async fn start(&self) -> Result<()> {
        self.settings
            .hooks()
            .register(
                groups::MAIL,
                Arc::new(MailerRefreshHook::new(Arc::clone(&self.mailer), self.settings.clone())),
            )
            .await;

        if let Err(e) = self.mailer.refresh(&self.settings).await {
            warn!(error = %e, "Initial mailer setup failed");
        }

        let runtime = self.vector.load_runtime_settings().await;
        info!(
            paused = runtime.paused,
            max_workers = runtime.max_workers,
            "Vector queue runtime loaded"
        );
        Ok(())
    }
}
