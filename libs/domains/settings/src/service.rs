use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::bus::ChangeBus;
use crate::cache::SettingsCache;
use crate::codec;
use crate::error::{SettingsError, SettingsResult};
use crate::hooks::HookRegistry;
use crate::keys::{SITE_BASE_URL, groups};
use crate::models::{
    BatchFailure, BatchOutcome, NewSetting, Setting, SettingChange, SettingFilter, SettingGroup,
    SettingInput,
};
use crate::repository::{AppliedWrite, SettingRepository, WriteMode};

/// Settings store: CRUD and batch writes with cache, hooks and change bus
pub struct SettingsService<R: SettingRepository> {
    repository: Arc<R>,
    cache: SettingsCache,
    hooks: Arc<HookRegistry>,
    bus: Arc<ChangeBus>,
}

impl<R: SettingRepository> Clone for SettingsService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            cache: self.cache.clone(),
            hooks: Arc::clone(&self.hooks),
            bus: Arc::clone(&self.bus),
        }
    }
}

impl<R: SettingRepository> SettingsService<R> {
    pub fn new(repository: R, cache: SettingsCache) -> Self {
        Self {
            repository: Arc::new(repository),
            cache,
            hooks: Arc::new(HookRegistry::new()),
            bus: Arc::new(ChangeBus::new()),
        }
    }

    /// Share an existing hook registry
    pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Share an existing change bus
    pub fn with_bus(mut self, bus: Arc<ChangeBus>) -> Self {
        self.bus = bus;
        self
    }

    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    pub fn bus(&self) -> &Arc<ChangeBus> {
        &self.bus
    }

    pub fn cache(&self) -> &SettingsCache {
        &self.cache
    }

    /// List settings ordered by group then key.
    ///
    /// Store failures are logged and yield an empty list.
    pub async fn list(&self, filter: SettingFilter) -> Vec<Setting> {
        match self.repository.list(filter).await {
            Ok(records) => records.into_iter().map(Setting::from).collect(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to list settings");
                Vec::new()
            }
        }
    }

    /// Get one setting, read through the cache
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> SettingsResult<Setting> {
        if let Some(setting) = self.cache.get_setting(key).await {
            return Ok(setting);
        }

        let setting: Setting = self
            .repository
            .find_by_key(key)
            .await?
            .ok_or_else(|| SettingsError::NotFound(key.to_string()))?
            .into();

        self.cache.put_setting(&setting).await;
        Ok(setting)
    }

    /// Decoded `key -> value` map for a group, read through the cache
    #[instrument(skip(self))]
    pub async fn get_group_map(&self, group: &str) -> SettingsResult<SettingGroup> {
        if let Some(cached) = self.cache.get_group(group).await {
            return Ok(cached);
        }

        let records = self.repository.find_by_group(group).await?;
        let Some(updated_at) = records.iter().map(|r| r.updated_at).max() else {
            return Err(SettingsError::NotFound(group.to_string()));
        };

        let settings: BTreeMap<_, _> = records
            .into_iter()
            .map(|r| {
                let value = codec::decode(&r.value, r.setting_type);
                (r.key, value)
            })
            .collect();

        let view = SettingGroup {
            group: group.to_string(),
            settings,
            updated_at,
        };

        self.cache.put_group(&view).await;
        Ok(view)
    }

    #[instrument(skip(self, input), fields(key = %input.key, group = %input.group))]
    pub async fn create(&self, input: SettingInput) -> SettingsResult<Setting> {
        self.write_one(WriteMode::Create, input).await
    }

    /// Update an existing setting; a system setting keeps its group
    #[instrument(skip(self, input), fields(key = %input.key, group = %input.group))]
    pub async fn update(&self, input: SettingInput) -> SettingsResult<Setting> {
        self.write_one(WriteMode::Update, input).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> SettingsResult<()> {
        let record = self
            .repository
            .find_by_key(key)
            .await?
            .ok_or_else(|| SettingsError::NotFound(key.to_string()))?;

        if record.is_system {
            return Err(SettingsError::Forbidden("系统设置不允许删除".to_string()));
        }

        if !self.repository.delete(key).await? {
            return Err(SettingsError::NotFound(key.to_string()));
        }

        self.cache.invalidate_key(key).await;
        self.cache.invalidate_group(&record.group).await;
        self.hooks.trigger(&record.group).await;

        tracing::info!(key = %key, group = %record.group, "Deleted setting");
        Ok(())
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn batch_create(&self, items: Vec<SettingInput>) -> SettingsResult<BatchOutcome> {
        self.write_batch(WriteMode::Create, items).await
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn batch_update(&self, items: Vec<SettingInput>) -> SettingsResult<BatchOutcome> {
        self.write_batch(WriteMode::Update, items).await
    }

    /// Create-or-update in one transaction.
    ///
    /// Batches touching the `security` group are rejected as a whole until
    /// `website.site_base_url` holds a non-empty string.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn batch_upsert(&self, items: Vec<SettingInput>) -> SettingsResult<BatchOutcome> {
        if items.iter().any(|item| item.group == groups::SECURITY) {
            self.ensure_base_url_configured().await?;
        }
        self.write_batch(WriteMode::Upsert, items).await
    }

    async fn ensure_base_url_configured(&self) -> SettingsResult<()> {
        let configured = self
            .repository
            .find_by_key(SITE_BASE_URL)
            .await?
            .filter(|r| r.group == groups::WEBSITE)
            .map(|r| codec::decode(&r.value, r.setting_type))
            .is_some_and(|v| v.as_str().is_some_and(|s| !s.trim().is_empty()));

        if configured {
            Ok(())
        } else {
            Err(SettingsError::ValidationFailed(
                "请先配置站点基础地址 (website.site_base_url)".to_string(),
            ))
        }
    }

    async fn write_one(&self, mode: WriteMode, input: SettingInput) -> SettingsResult<Setting> {
        let key = input.key.clone();
        let prepared = prepare(input)?;

        let mut written = self.repository.apply_batch(mode, vec![prepared]).await?;

        if let Some(rejected) = written.rejected.pop() {
            return Err(rejected.reason.into_error(&key));
        }

        let applied = written
            .applied
            .pop()
            .ok_or_else(|| SettingsError::Internal(format!("write of {} returned no row", key)))?;

        self.after_commit(std::slice::from_ref(&applied)).await;

        tracing::info!(key = %key, group = %applied.record.group, "Saved setting");
        Ok(applied.record.into())
    }

    async fn write_batch(&self, mode: WriteMode, items: Vec<SettingInput>) -> SettingsResult<BatchOutcome> {
        if items.is_empty() {
            return Err(SettingsError::InvalidParameter("批量操作至少需要一项设置".to_string()));
        }

        // (submitted position, failure) so the failed list follows input order
        let mut failed: Vec<(usize, BatchFailure)> = Vec::new();
        let mut positions = Vec::with_capacity(items.len());
        let mut prepared = Vec::with_capacity(items.len());

        for (position, input) in items.into_iter().enumerate() {
            let key = input.key.clone();
            match prepare(input) {
                Ok(item) => {
                    positions.push(position);
                    prepared.push(item);
                }
                Err(e) => failed.push((
                    position,
                    BatchFailure {
                        key,
                        message: e.to_string(),
                    },
                )),
            }
        }

        let mut outcome = BatchOutcome::default();

        if !prepared.is_empty() {
            let written = self.repository.apply_batch(mode, prepared).await?;

            failed.extend(written.rejected.into_iter().map(|r| {
                (
                    positions.get(r.index).copied().unwrap_or(r.index),
                    BatchFailure {
                        key: r.key,
                        message: r.reason.message().to_string(),
                    },
                )
            }));

            self.after_commit(&written.applied).await;
            outcome.success = written.applied.into_iter().map(|a| a.record.into()).collect();
        }

        failed.sort_by_key(|(position, _)| *position);
        outcome.failed = failed.into_iter().map(|(_, f)| f).collect();

        if outcome.has_failures() {
            tracing::warn!(
                succeeded = outcome.success.len(),
                failed = outcome.failed.len(),
                "Settings batch partially failed"
            );
        } else {
            tracing::info!(succeeded = outcome.success.len(), "Settings batch committed");
        }

        Ok(outcome)
    }

    /// Invalidate, publish, then run hooks once per touched group
    async fn after_commit(&self, applied: &[AppliedWrite]) {
        let mut touched: Vec<&str> = Vec::new();

        for write in applied {
            let record = &write.record;
            self.cache.invalidate_key(&record.key).await;
            self.cache.invalidate_group(&record.group).await;
            if let Some(previous) = &write.previous_group {
                self.cache.invalidate_group(previous).await;
            }

            self.bus
                .publish(&SettingChange {
                    group: record.group.clone(),
                    key: record.key.clone(),
                    value: record.value.clone(),
                })
                .await;

            for group in std::iter::once(record.group.as_str()).chain(write.previous_group.as_deref()) {
                if !touched.contains(&group) {
                    touched.push(group);
                }
            }
        }

        for group in touched {
            self.hooks.trigger(group).await;
        }
    }
}

/// Validate, normalize and serialize one input
fn prepare(input: SettingInput) -> SettingsResult<NewSetting> {
    input
        .validate()
        .map_err(|e| SettingsError::InvalidParameter(e.to_string()))?;

    let value = codec::normalize(&input.key, input.value);
    codec::validate(input.setting_type, &value)?;
    let value = codec::serialize(input.setting_type, &value)?;

    Ok(NewSetting {
        key: input.key,
        value,
        setting_type: input.setting_type,
        group: input.group,
        description: input.description,
        is_system: input.is_system,
    })
}
