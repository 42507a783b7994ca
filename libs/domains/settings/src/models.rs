use chrono::{DateTime, Utc};
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use strum::{Display, EnumString};
use validator::Validate;

use crate::codec;

/// Declared type of a setting value; selects the codec rules
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
pub enum SettingType {
    #[default]
    #[sea_orm(string_value = "string")]
    String,
    #[sea_orm(string_value = "text")]
    Text,
    #[sea_orm(string_value = "number")]
    Number,
    #[sea_orm(string_value = "boolean")]
    Boolean,
    #[sea_orm(string_value = "json")]
    Json,
    #[sea_orm(string_value = "array")]
    Array,
}

/// Stored row, value still in its serialized form
#[derive(Debug, Clone, PartialEq)]
pub struct SettingRecord {
    pub id: i32,
    pub key: String,
    pub value: String,
    pub setting_type: SettingType,
    pub group: String,
    pub description: String,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Decoded setting as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub id: i32,
    pub key: String,
    pub value: Value,
    #[serde(rename = "type")]
    pub setting_type: SettingType,
    pub group: String,
    pub description: String,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SettingRecord> for Setting {
    fn from(record: SettingRecord) -> Self {
        let value = codec::decode(&record.value, record.setting_type);
        Self {
            id: record.id,
            key: record.key,
            value,
            setting_type: record.setting_type,
            group: record.group,
            description: record.description,
            is_system: record.is_system,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Input for create, update and the batch operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SettingInput {
    #[validate(length(min = 1, max = 100))]
    pub key: String,

    #[serde(default)]
    pub value: Value,

    #[serde(rename = "type", default)]
    pub setting_type: SettingType,

    #[validate(length(min = 1, max = 50))]
    pub group: String,

    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,

    #[serde(default)]
    pub is_system: bool,
}

impl SettingInput {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<Value>,
        setting_type: SettingType,
        group: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            setting_type,
            group: group.into(),
            description: String::new(),
            is_system: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }
}

/// Validated, normalized and serialized row ready for the repository
#[derive(Debug, Clone, PartialEq)]
pub struct NewSetting {
    pub key: String,
    pub value: String,
    pub setting_type: SettingType,
    pub group: String,
    pub description: String,
    pub is_system: bool,
}

/// Filters for `list`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingFilter {
    /// Exact group match
    pub group: Option<String>,
    /// Substring match on the key
    pub key: Option<String>,
}

impl SettingFilter {
    pub fn group(group: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            key: None,
        }
    }
}

/// Decoded view over every setting of one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingGroup {
    pub group: String,
    pub settings: BTreeMap<String, Value>,
    pub updated_at: DateTime<Utc>,
}

/// A batch item that did not commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub key: String,
    pub message: String,
}

/// Per-item split of a batch operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub success: Vec<Setting>,
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Summary line for the response envelope
    pub fn message(&self) -> String {
        if self.failed.is_empty() {
            format!("成功保存 {} 项设置", self.success.len())
        } else {
            format!(
                "成功保存 {} 项设置，{} 项失败",
                self.success.len(),
                self.failed.len()
            )
        }
    }
}

/// Event published on the change bus after a committed write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingChange {
    pub group: String,
    pub key: String,
    /// Serialized value as stored
    pub value: String,
}
