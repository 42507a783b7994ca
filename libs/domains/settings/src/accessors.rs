//! Typed, never-failing reads over group maps.
//!
//! Every accessor returns the caller's default when the group or key is
//! missing, the value does not coerce, or the store is unreachable.

use serde_json::Value;

use crate::codec::parse_bool_str;
use crate::repository::SettingRepository;
use crate::service::SettingsService;

pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v == 1.0 => Some(true),
            Some(v) if v == 0.0 => Some(false),
            _ => None,
        },
        Value::String(s) => parse_bool_str(s),
        _ => None,
    }
}

pub fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_f64_to_i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_f64_to_i64))
        }
        _ => None,
    }
}

fn whole_f64_to_i64(v: f64) -> Option<i64> {
    (v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64).then_some(v as i64)
}

pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Textual form; blank strings and null count as absent
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        other => Some(other.to_string()),
    }
}

impl<R: SettingRepository> SettingsService<R> {
    async fn lookup<T>(&self, group: &str, key: &str, coerce: impl Fn(&Value) -> Option<T>) -> Option<T> {
        match self.get_group_map(group).await {
            Ok(view) => view.settings.get(key).and_then(coerce),
            Err(e) => {
                tracing::debug!(group, key, error = %e, "Setting lookup fell back to default");
                None
            }
        }
    }

    pub async fn get_bool(&self, group: &str, key: &str, default: bool) -> bool {
        self.lookup(group, key, coerce_bool).await.unwrap_or(default)
    }

    pub async fn get_int(&self, group: &str, key: &str, default: i64) -> i64 {
        self.lookup(group, key, coerce_i64).await.unwrap_or(default)
    }

    pub async fn get_float(&self, group: &str, key: &str, default: f64) -> f64 {
        self.lookup(group, key, coerce_f64).await.unwrap_or(default)
    }

    pub async fn get_string(&self, group: &str, key: &str, default: &str) -> String {
        self.lookup(group, key, coerce_string)
            .await
            .unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SettingsCache;
    use crate::error::SettingsError;
    use crate::models::{SettingInput, SettingType};
    use crate::repository::{InMemorySettingRepository, MockSettingRepository};
    use serde_json::json;

    #[test]
    fn test_coerce_bool() {
        assert_eq!(coerce_bool(&json!(" Off ")), Some(false));
        assert_eq!(coerce_bool(&json!(1)), Some(true));
        assert_eq!(coerce_bool(&json!("perhaps")), None);
        assert_eq!(coerce_bool(&json!([])), None);
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(coerce_i64(&json!(" 42 ")), Some(42));
        assert_eq!(coerce_i64(&json!(3.0)), Some(3));
        assert_eq!(coerce_i64(&json!(3.5)), None);
        assert_eq!(coerce_i64(&json!("")), None);
        assert_eq!(coerce_f64(&json!("2.5")), Some(2.5));
        assert_eq!(coerce_f64(&json!(true)), None);
    }

    #[test]
    fn test_coerce_string() {
        assert_eq!(coerce_string(&json!("  ")), None);
        assert_eq!(coerce_string(&json!(" x ")), Some("x".to_string()));
        assert_eq!(coerce_string(&json!(false)), Some("false".to_string()));
        assert_eq!(coerce_string(&json!(8)), Some("8".to_string()));
        assert_eq!(coerce_string(&Value::Null), None);
    }

    #[tokio::test]
    async fn test_accessors_read_group_map() {
        let service = SettingsService::new(InMemorySettingRepository::new(), SettingsCache::in_memory());
        service
            .batch_upsert(vec![
                SettingInput::new("enabled", "yes", SettingType::Boolean, "g"),
                SettingInput::new("limit", "25", SettingType::Number, "g"),
                SettingInput::new("ratio", 0.75, SettingType::Number, "g"),
                SettingInput::new("name", "", SettingType::String, "g"),
            ])
            .await
            .unwrap();

        assert!(service.get_bool("g", "enabled", false).await);
        assert_eq!(service.get_string("g", "enabled", "").await, "true");
        assert_eq!(service.get_int("g", "limit", 0).await, 25);
        assert_eq!(service.get_float("g", "ratio", 0.0).await, 0.75);
        assert_eq!(service.get_int("g", "ratio", 9).await, 9);
        assert_eq!(service.get_string("g", "name", "fallback").await, "fallback");
        assert_eq!(service.get_int("g", "absent", 7).await, 7);
        assert_eq!(service.get_int("missing_group", "limit", 5).await, 5);
    }

    #[tokio::test]
    async fn test_accessors_default_when_store_down() {
        let mut repo = MockSettingRepository::new();
        repo.expect_find_by_group()
            .returning(|_| Err(SettingsError::DbQuery("connection refused".into())));

        let service = SettingsService::new(repo, SettingsCache::in_memory());
        assert!(service.get_bool("vector", "vector_auto_processing_enabled", true).await);
        assert_eq!(service.get_int("vector", "vector_concurrency", 4).await, 4);
        assert_eq!(service.get_float("ai", "temperature", 0.5).await, 0.5);
        assert_eq!(service.get_string("website", "site_name", "demo").await, "demo");
    }
}
