use async_trait::async_trait;
use chrono::Utc;
use domain_settings::{SettingsService, SqlSettingRepository};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Schema,
};
use sea_orm_migration::SchemaManager;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{error, info, instrument};

use crate::entity::migration_versions as versions;
use crate::error::MigrationResult;

/// Handles a migration works with
#[derive(Clone)]
pub struct MigrationContext {
    pub db: DatabaseConnection,
    pub settings: SettingsService<SqlSettingRepository>,
}

impl MigrationContext {
    pub fn new(db: DatabaseConnection, settings: SettingsService<SqlSettingRepository>) -> Self {
        Self { db, settings }
    }

    pub fn schema(&self) -> SchemaManager<'_> {
        SchemaManager::new(&self.db)
    }
}

/// One named, idempotent step
#[async_trait]
pub trait Migration: Send + Sync {
    /// Ledger key; never rename a shipped migration
    fn name(&self) -> &'static str;

    async fn up(&self, ctx: &MigrationContext) -> MigrationResult<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FailedMigration {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedMigration>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Applies migrations in declared order and records each success.
///
/// A failing migration is logged and left unrecorded so the next start
/// retries it; later migrations still run.
pub struct Migrator {
    migrations: Vec<Box<dyn Migration>>,
}

impl Migrator {
    pub fn new(migrations: Vec<Box<dyn Migration>>) -> Self {
        Self { migrations }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.migrations.iter().map(|m| m.name()).collect()
    }

    #[instrument(skip_all, fields(count = self.migrations.len()))]
    pub async fn run(&self, ctx: &MigrationContext) -> MigrationResult<RunReport> {
        ensure_ledger(&ctx.db).await?;
        let recorded = applied_names(&ctx.db).await?;

        let mut report = RunReport::default();

        for migration in &self.migrations {
            let name = migration.name();
            if recorded.contains(name) {
                report.skipped.push(name.to_string());
                continue;
            }

            info!(migration = name, "Applying migration");
            let outcome = match migration.up(ctx).await {
                Ok(()) => record(&ctx.db, name).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {
                    info!(migration = name, "Migration applied");
                    report.applied.push(name.to_string());
                }
                Err(e) => {
                    error!(migration = name, error = %e, "Migration failed, continuing");
                    report.failed.push(FailedMigration {
                        name: name.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Migration run finished"
        );
        Ok(report)
    }
}

/// Create `migration_versions` if it does not exist
pub async fn ensure_ledger(db: &DatabaseConnection) -> MigrationResult<()> {
    let schema = Schema::new(db.get_database_backend());
    SchemaManager::new(db)
        .create_table(
            schema
                .create_table_from_entity(versions::Entity)
                .if_not_exists()
                .to_owned(),
        )
        .await?;
    Ok(())
}

/// Applied migrations, oldest first
pub async fn applied(db: &DatabaseConnection) -> MigrationResult<Vec<versions::Model>> {
    Ok(versions::Entity::find()
        .order_by_asc(versions::Column::Id)
        .all(db)
        .await?)
}

async fn applied_names(db: &DatabaseConnection) -> MigrationResult<HashSet<String>> {
    Ok(applied(db).await?.into_iter().map(|m| m.name).collect())
}

/// Record `name` as applied; recording an existing name is a no-op
pub async fn record(db: &DatabaseConnection, name: &str) -> MigrationResult<()> {
    let exists = versions::Entity::find()
        .filter(versions::Column::Name.eq(name))
        .one(db)
        .await?
        .is_some();
    if exists {
        return Ok(());
    }

    versions::ActiveModel {
        id: NotSet,
        name: Set(name.to_string()),
        applied_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    Ok(())
}
