use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{SettingsError, SettingsResult};
use crate::models::{NewSetting, SettingFilter, SettingRecord};

/// How a batch treats existing and missing keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Insert; existing keys are rejected
    Create,
    /// Modify; missing keys are rejected
    Update,
    /// Insert or modify
    Upsert,
}

/// Why one batch item was not written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRejection {
    DuplicateKey,
    Missing,
    SystemGroupChange,
}

impl WriteRejection {
    pub fn message(&self) -> &'static str {
        match self {
            Self::DuplicateKey => "设置键名已存在",
            Self::Missing => "设置不存在",
            Self::SystemGroupChange => "系统设置不允许修改分组",
        }
    }

    pub fn into_error(self, key: &str) -> SettingsError {
        match self {
            Self::DuplicateKey => SettingsError::Duplicate(key.to_string()),
            Self::Missing => SettingsError::NotFound(key.to_string()),
            Self::SystemGroupChange => SettingsError::Forbidden(self.message().to_string()),
        }
    }
}

/// A row written by a batch
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedWrite {
    /// Position of the item in the submitted batch
    pub index: usize,
    pub record: SettingRecord,
    /// Set when the write moved the record out of another group
    pub previous_group: Option<String>,
}

/// A batch item skipped inside an otherwise committed batch
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedWrite {
    pub index: usize,
    pub key: String,
    pub reason: WriteRejection,
}

/// Result of one committed batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchWrite {
    pub applied: Vec<AppliedWrite>,
    pub rejected: Vec<RejectedWrite>,
}

/// Repository trait for setting persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingRepository: Send + Sync {
    /// List settings ordered by `(group, key)`
    async fn list(&self, filter: SettingFilter) -> SettingsResult<Vec<SettingRecord>>;

    async fn find_by_key(&self, key: &str) -> SettingsResult<Option<SettingRecord>>;

    /// All settings of one group, ordered by key
    async fn find_by_group(&self, group: &str) -> SettingsResult<Vec<SettingRecord>>;

    /// Write `items` in one transaction.
    ///
    /// Item-level conflicts are returned as rejections and do not abort the
    /// transaction; any store failure rolls the whole batch back.
    async fn apply_batch(&self, mode: WriteMode, items: Vec<NewSetting>) -> SettingsResult<BatchWrite>;

    /// Delete by key; `false` when no row matched
    async fn delete(&self, key: &str) -> SettingsResult<bool>;
}

#[derive(Debug, Default, Clone)]
struct State {
    records: BTreeMap<String, SettingRecord>,
    next_id: i32,
}

impl State {
    fn apply(&mut self, mode: WriteMode, index: usize, item: NewSetting, out: &mut BatchWrite) {
        let now = Utc::now();

        match (mode, self.records.get(&item.key).cloned()) {
            (WriteMode::Create, Some(_)) => out.rejected.push(RejectedWrite {
                index,
                key: item.key,
                reason: WriteRejection::DuplicateKey,
            }),
            (WriteMode::Update, None) => out.rejected.push(RejectedWrite {
                index,
                key: item.key,
                reason: WriteRejection::Missing,
            }),
            (WriteMode::Create | WriteMode::Upsert, None) => {
                self.next_id += 1;
                let record = SettingRecord {
                    id: self.next_id,
                    key: item.key.clone(),
                    value: item.value,
                    setting_type: item.setting_type,
                    group: item.group,
                    description: item.description,
                    is_system: item.is_system,
                    created_at: now,
                    updated_at: now,
                };
                self.records.insert(item.key, record.clone());
                out.applied.push(AppliedWrite {
                    index,
                    record,
                    previous_group: None,
                });
            }
            (WriteMode::Update | WriteMode::Upsert, Some(existing)) => {
                if existing.is_system && existing.group != item.group {
                    out.rejected.push(RejectedWrite {
                        index,
                        key: item.key,
                        reason: WriteRejection::SystemGroupChange,
                    });
                    return;
                }

                let previous_group = (existing.group != item.group).then(|| existing.group.clone());
                let record = SettingRecord {
                    value: item.value,
                    setting_type: item.setting_type,
                    group: item.group,
                    description: item.description,
                    is_system: existing.is_system || item.is_system,
                    updated_at: now,
                    ..existing
                };
                self.records.insert(item.key, record.clone());
                out.applied.push(AppliedWrite {
                    index,
                    record,
                    previous_group,
                });
            }
        }
    }
}

/// In-memory implementation of SettingRepository (for development/testing)
///
/// Batches run against a staged copy that replaces the live map only once
/// every item has been applied.
#[derive(Debug, Default, Clone)]
pub struct InMemorySettingRepository {
    state: Arc<RwLock<State>>,
}

impl InMemorySettingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SettingRepository for InMemorySettingRepository {
    async fn list(&self, filter: SettingFilter) -> SettingsResult<Vec<SettingRecord>> {
        let state = self.state.read().await;

        let mut result: Vec<SettingRecord> = state
            .records
            .values()
            .filter(|r| filter.group.as_ref().is_none_or(|g| &r.group == g))
            .filter(|r| filter.key.as_ref().is_none_or(|k| r.key.contains(k.as_str())))
            .cloned()
            .collect();

        result.sort_by(|a, b| (&a.group, &a.key).cmp(&(&b.group, &b.key)));
        Ok(result)
    }

    async fn find_by_key(&self, key: &str) -> SettingsResult<Option<SettingRecord>> {
        Ok(self.state.read().await.records.get(key).cloned())
    }

    async fn find_by_group(&self, group: &str) -> SettingsResult<Vec<SettingRecord>> {
        // BTreeMap iteration is already key-ordered
        Ok(self
            .state
            .read()
            .await
            .records
            .values()
            .filter(|r| r.group == group)
            .cloned()
            .collect())
    }

    async fn apply_batch(&self, mode: WriteMode, items: Vec<NewSetting>) -> SettingsResult<BatchWrite> {
        let mut state = self.state.write().await;
        let mut staged = state.clone();
        let mut out = BatchWrite::default();

        for (index, item) in items.into_iter().enumerate() {
            staged.apply(mode, index, item, &mut out);
        }

        *state = staged;
        Ok(out)
    }

    async fn delete(&self, key: &str) -> SettingsResult<bool> {
        Ok(self.state.write().await.records.remove(key).is_some())
    }
}
