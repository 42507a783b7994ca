//! Value codec: normalization, type validation, serialization and parsing
//! of setting values keyed by their declared [`SettingType`].

use serde_json::{Number, Value};

use crate::error::{SettingsError, SettingsResult};
use crate::keys::SITE_BASE_URL;
use crate::models::SettingType;

/// Decoded setting value, one variant per family of declared types
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Str(String),
    Num(f64),
    Bool(bool),
    Json(Value),
    Array(Vec<Value>),
}

impl SettingValue {
    /// JSON form used on the wire; integral numbers become JSON integers
    pub fn to_json(&self) -> Value {
        match self {
            Self::Str(s) => Value::String(s.clone()),
            Self::Num(n) => number_to_json(*n),
            Self::Bool(b) => Value::Bool(*b),
            Self::Json(v) => v.clone(),
            Self::Array(items) => Value::Array(items.clone()),
        }
    }
}

// 2^53: beyond this f64 no longer holds every integer exactly
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn number_to_json(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_EXACT_INT {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or_else(|| Value::from(0))
    }
}

/// Apply per-key normalization before a value is validated and stored.
pub fn normalize(key: &str, value: Value) -> Value {
    match value {
        Value::String(s) if key == SITE_BASE_URL => {
            let trimmed = s.trim_matches(|c: char| c.is_ascii_whitespace());
            let stripped = trimmed.strip_suffix('/').unwrap_or(trimmed);
            Value::String(stripped.to_string())
        }
        other => other,
    }
}

/// Check that `value` is acceptable input for `setting_type`.
pub fn validate(setting_type: SettingType, value: &Value) -> SettingsResult<()> {
    let ok = match setting_type {
        SettingType::String | SettingType::Text | SettingType::Json => true,
        SettingType::Number => match value {
            Value::Number(_) => true,
            Value::String(s) => s.trim().parse::<f64>().is_ok(),
            _ => false,
        },
        SettingType::Boolean => match value {
            Value::Bool(_) => true,
            Value::Number(n) => matches!(n.as_f64(), Some(v) if v == 0.0 || v == 1.0),
            Value::String(s) => parse_bool_str(s).is_some(),
            _ => false,
        },
        SettingType::Array => value.is_array(),
    };

    if ok {
        Ok(())
    } else {
        Err(SettingsError::InvalidParameter(format!(
            "值与类型 {} 不匹配",
            setting_type
        )))
    }
}

/// Textual representation used when a non-string is stored as a string
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Serialize `value` into its stored form.
///
/// `string` and `text` always store a JSON string; every other type stores
/// the input JSON as-is.
pub fn serialize(setting_type: SettingType, value: &Value) -> SettingsResult<String> {
    let stored = match setting_type {
        SettingType::String | SettingType::Text => Value::String(to_text(value)),
        _ => value.clone(),
    };

    serde_json::to_string(&stored).map_err(|e| SettingsError::InvalidParameter(e.to_string()))
}

/// Parse a stored value. Never fails; malformed data decodes to the type's
/// zero value.
pub fn parse(raw: &str, setting_type: SettingType) -> SettingValue {
    let decoded = serde_json::from_str::<Value>(raw).ok();

    match setting_type {
        SettingType::String | SettingType::Text => match decoded {
            Some(value) => SettingValue::Str(to_text(&value)),
            None => SettingValue::Str(raw.to_string()),
        },
        SettingType::Number => {
            let parsed = match decoded {
                Some(Value::Number(n)) => n.as_f64(),
                Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
                Some(_) => None,
                None => raw.trim().parse::<f64>().ok(),
            };
            SettingValue::Num(parsed.filter(|n| n.is_finite()).unwrap_or(0.0))
        }
        SettingType::Boolean => {
            let parsed = match decoded {
                Some(Value::Bool(b)) => Some(b),
                Some(Value::String(s)) => parse_bool_str(&s),
                Some(Value::Number(n)) => match n.as_f64() {
                    Some(v) if v == 1.0 => Some(true),
                    Some(v) if v == 0.0 => Some(false),
                    _ => None,
                },
                Some(_) => None,
                None => parse_bool_str(raw),
            };
            SettingValue::Bool(parsed.unwrap_or(false))
        }
        SettingType::Json => SettingValue::Json(decoded.unwrap_or_else(|| Value::String(raw.to_string()))),
        SettingType::Array => match decoded {
            Some(Value::Array(items)) => SettingValue::Array(items),
            _ => SettingValue::Array(Vec::new()),
        },
    }
}

/// Parse a stored value straight to its JSON form
pub fn decode(raw: &str, setting_type: SettingType) -> Value {
    parse(raw, setting_type).to_json()
}

/// Tolerant boolean words, case-insensitive after trimming
pub fn parse_bool_str(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
