use async_trait::async_trait;

use crate::defaults::default_settings;
use crate::error::{MigrationError, MigrationResult};
use crate::runner::{Migration, MigrationContext};

pub struct SeedDefaultSettings;

#[async_trait]
impl Migration for SeedDefaultSettings {
    fn name(&self) -> &'static str {
        "seed_default_settings"
    }

    async fn up(&self, ctx: &MigrationContext) -> MigrationResult<()> {
        let outcome = ctx.settings.batch_upsert(default_settings()).await?;

        if outcome.has_failures() {
            let keys: Vec<&str> = outcome.failed.iter().map(|f| f.key.as_str()).collect();
            return Err(MigrationError::Internal(format!(
                "{} ({})",
                outcome.message(),
                keys.join(", ")
            )));
        }

        tracing::info!(count = outcome.success.len(), "Seeded default settings");
        Ok(())
    }
}
