//! Startup migrations.
//!
//! Each migration is a named, idempotent step recorded in the
//! `migration_versions` ledger. [`run`] applies the pending ones in order;
//! a failing step is logged and retried on the next start without blocking
//! the steps after it.
//!
//! ```rust,ignore
//! let ctx = migration::MigrationContext::new(db.clone(), settings.clone());
//! let report = migration::run(&ctx).await?;
//! ```

pub mod defaults;
pub mod entity;
pub mod error;
pub mod runner;

mod m20250101_000000_create_core_tables;
mod m20250101_000001_seed_default_settings;
mod m20250301_000000_add_system_settings;

pub use error::{MigrationError, MigrationResult};
pub use m20250301_000000_add_system_settings::SUPERSEDED;
pub use runner::{FailedMigration, Migration, MigrationContext, Migrator, RunReport};

/// Every migration, in application order
pub fn migrations() -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(m20250101_000000_create_core_tables::CreateCoreTables),
        Box::new(m20250101_000001_seed_default_settings::SeedDefaultSettings),
        Box::new(m20250301_000000_add_system_settings::AddSystemSettings),
    ]
}

pub fn migrator() -> Migrator {
    Migrator::new(migrations())
}

/// Apply all pending migrations
pub async fn run(ctx: &MigrationContext) -> MigrationResult<RunReport> {
    migrator().run(ctx).await
}
