//! Factory defaults written on first start.
//!
//! The `security` group is absent on purpose: its secrets are generated by
//! `add_system_settings` and must never be replaced by a reseed.

use domain_settings::keys::{self, groups};
use domain_settings::{SettingInput, SettingType};
use serde_json::{Value, json};

/// Base URL seeded so the security-group guard passes during first init
pub const DEFAULT_SITE_BASE_URL: &str = "http://localhost:8080";

fn seed(key: &str, value: Value, setting_type: SettingType, group: &str, description: &str) -> SettingInput {
    SettingInput::new(key, value, setting_type, group)
        .description(description)
        .system()
}

pub fn default_settings() -> Vec<SettingInput> {
    vec![
        // website
        seed("site_name", json!("文件助手"), SettingType::String, groups::WEBSITE, "站点名称"),
        seed(keys::SITE_BASE_URL, json!(DEFAULT_SITE_BASE_URL), SettingType::String, groups::WEBSITE, "站点基础地址"),
        seed("site_description", json!(""), SettingType::Text, groups::WEBSITE, "站点描述"),
        seed("site_keywords", json!(""), SettingType::String, groups::WEBSITE, "站点关键词"),
        seed("site_logo", json!(""), SettingType::String, groups::WEBSITE, "站点 Logo 地址"),
        // website_info
        seed("icp_number", json!(""), SettingType::String, groups::WEBSITE_INFO, "ICP 备案号"),
        seed("copyright", json!(""), SettingType::String, groups::WEBSITE_INFO, "版权信息"),
        seed("contact_email", json!(""), SettingType::String, groups::WEBSITE_INFO, "联系邮箱"),
        // registration
        seed("allow_registration", json!(true), SettingType::Boolean, groups::REGISTRATION, "允许新用户注册"),
        seed("email_verification", json!(false), SettingType::Boolean, groups::REGISTRATION, "注册需验证邮箱"),
        seed("default_user_quota_mb", json!(1024), SettingType::Number, groups::REGISTRATION, "新用户默认空间 (MB)"),
        // ai
        seed("ai_api_base", json!("https://api.openai.com/v1"), SettingType::String, groups::AI, "AI 接口地址"),
        seed("ai_api_key", json!(""), SettingType::String, groups::AI, "AI 接口密钥"),
        seed("ai_model", json!("gpt-4o-mini"), SettingType::String, groups::AI, "对话模型"),
        seed("ai_timeout_seconds", json!(60), SettingType::Number, groups::AI, "AI 请求超时 (秒)"),
        seed(keys::PENDING_STUCK_THRESHOLD_MINUTES, json!(30), SettingType::Number, groups::AI, "任务卡住判定阈值 (分钟)"),
        // mail
        seed("smtp_host", json!(""), SettingType::String, groups::MAIL, "SMTP 服务器"),
        seed("smtp_port", json!(465), SettingType::Number, groups::MAIL, "SMTP 端口"),
        seed("smtp_username", json!(""), SettingType::String, groups::MAIL, "SMTP 用户名"),
        seed("smtp_password", json!(""), SettingType::String, groups::MAIL, "SMTP 密码"),
        seed("smtp_from", json!(""), SettingType::String, groups::MAIL, "发件人地址"),
        seed("smtp_use_tls", json!(true), SettingType::Boolean, groups::MAIL, "使用 TLS"),
        // upload
        seed("max_file_size_mb", json!(50), SettingType::Number, groups::UPLOAD, "单文件大小上限 (MB)"),
        seed(
            "allowed_extensions",
            json!(["pdf", "docx", "txt", "md", "png", "jpg"]),
            SettingType::Array,
            groups::UPLOAD,
            "允许上传的扩展名",
        ),
        // theme
        seed("primary_color", json!("#1677ff"), SettingType::String, groups::THEME, "主题色"),
        seed("dark_mode", json!(false), SettingType::Boolean, groups::THEME, "默认深色模式"),
        // guest
        seed("guest_access_enabled", json!(false), SettingType::Boolean, groups::GUEST, "允许游客访问"),
        seed("guest_upload_limit", json!(5), SettingType::Number, groups::GUEST, "游客上传数量上限"),
        // vector
        seed(keys::VECTOR_AUTO_PROCESSING_ENABLED, json!(true), SettingType::Boolean, groups::VECTOR, "自动处理向量任务"),
        seed(keys::VECTOR_CONCURRENCY, json!(2), SettingType::Number, groups::VECTOR, "向量任务并发数"),
        seed(keys::VECTOR_MAX_RETRY_COUNT, json!(3), SettingType::Number, groups::VECTOR, "向量任务最大重试次数"),
        seed(keys::EMBEDDING_MODEL, json!("text-embedding-3-small"), SettingType::String, groups::VECTOR, "嵌入模型"),
        seed(keys::EMBEDDING_DIMENSION, json!(1536), SettingType::Number, groups::VECTOR, "嵌入维度"),
        // version
        seed("current_version", json!("1.0.0"), SettingType::String, groups::VERSION, "当前版本"),
        seed("check_update", json!(true), SettingType::Boolean, groups::VERSION, "自动检查更新"),
        // appearance
        seed("custom_css", json!(""), SettingType::Text, groups::APPEARANCE, "自定义样式"),
        seed("footer_text", json!(""), SettingType::Text, groups::APPEARANCE, "页脚文字"),
        // announcement
        seed("announcement_enabled", json!(true), SettingType::Boolean, groups::ANNOUNCEMENT, "启用公告"),
        seed("announcement_popup", json!(false), SettingType::Boolean, groups::ANNOUNCEMENT, "公告弹窗显示"),
        // legal
        seed("terms_of_service", json!(""), SettingType::Text, groups::LEGAL, "服务条款"),
        seed("privacy_policy", json!(""), SettingType::Text, groups::LEGAL, "隐私政策"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_group_but_security_is_seeded() {
        let seeded: HashSet<String> = default_settings().into_iter().map(|s| s.group).collect();

        for group in [
            groups::WEBSITE,
            groups::WEBSITE_INFO,
            groups::REGISTRATION,
            groups::AI,
            groups::MAIL,
            groups::UPLOAD,
            groups::THEME,
            groups::GUEST,
            groups::VECTOR,
            groups::VERSION,
            groups::APPEARANCE,
            groups::ANNOUNCEMENT,
            groups::LEGAL,
        ] {
            assert!(seeded.contains(group), "missing defaults for {group}");
        }
        assert!(!seeded.contains(groups::SECURITY));
    }

    #[test]
    fn test_keys_are_unique() {
        let all = default_settings();
        let keys: HashSet<&str> = all.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys.len(), all.len());
    }
}
