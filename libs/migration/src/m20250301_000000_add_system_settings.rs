use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::Utc;
use domain_settings::keys::{self, groups};
use domain_settings::{SettingInput, SettingType, SettingsError};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait};

use crate::entity::{announcements, category_templates};
use crate::error::{MigrationError, MigrationResult};
use crate::runner::{self, Migration, MigrationContext};

/// Names of earlier one-off migrations folded into this one
pub const SUPERSEDED: [&str; 4] = [
    "add_jwt_secret",
    "add_internal_api_token",
    "init_category_templates",
    "init_welcome_announcement",
];

const TEMPLATES: [(&str, &str, &str); 5] = [
    ("文档", "合同、报告等办公文档", "file-text"),
    ("图片", "照片与截图", "image"),
    ("学习资料", "课程笔记与电子书", "book"),
    ("财务", "发票与账单", "wallet"),
    ("其他", "未分类文件", "folder"),
];

/// Generated secrets plus starter content
pub struct AddSystemSettings;

#[async_trait]
impl Migration for AddSystemSettings {
    fn name(&self) -> &'static str {
        "add_system_settings"
    }

    async fn up(&self, ctx: &MigrationContext) -> MigrationResult<()> {
        let mut secrets = Vec::new();

        if is_missing(ctx, keys::JWT_SECRET).await? {
            secrets.push(
                SettingInput::new(keys::JWT_SECRET, jwt_secret(), SettingType::String, groups::SECURITY)
                    .description("JWT 签名密钥")
                    .system(),
            );
        }
        if is_missing(ctx, keys::INTERNAL_API_TOKEN).await? {
            secrets.push(
                SettingInput::new(
                    keys::INTERNAL_API_TOKEN,
                    internal_token(),
                    SettingType::String,
                    groups::SECURITY,
                )
                .description("内部服务调用令牌")
                .system(),
            );
        }

        if !secrets.is_empty() {
            let outcome = ctx.settings.batch_upsert(secrets).await?;
            if outcome.has_failures() {
                return Err(MigrationError::Internal(outcome.message()));
            }
            tracing::info!(count = outcome.success.len(), "Generated security settings");
        }

        seed_category_templates(ctx).await?;
        seed_welcome_announcement(ctx).await?;

        for name in SUPERSEDED {
            runner::record(&ctx.db, name).await?;
        }
        Ok(())
    }
}

async fn is_missing(ctx: &MigrationContext, key: &str) -> MigrationResult<bool> {
    match ctx.settings.get(key).await {
        Ok(_) => Ok(false),
        Err(SettingsError::NotFound(_)) => Ok(true),
        Err(e) => Err(e.into()),
    }
}

/// 32 random bytes, standard base64
pub fn jwt_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    STANDARD.encode(bytes)
}

/// 32 random bytes, URL-safe base64 without padding
pub fn internal_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

async fn seed_category_templates(ctx: &MigrationContext) -> MigrationResult<()> {
    if category_templates::Entity::find().count(&ctx.db).await? > 0 {
        return Ok(());
    }

    let now = Utc::now();
    for (order, (name, description, icon)) in TEMPLATES.iter().enumerate() {
        category_templates::ActiveModel {
            id: NotSet,
            name: Set(name.to_string()),
            description: Set(description.to_string()),
            icon: Set(icon.to_string()),
            sort_order: Set(order as i32),
            created_at: Set(now.into()),
        }
        .insert(&ctx.db)
        .await?;
    }

    tracing::info!(count = TEMPLATES.len(), "Seeded category templates");
    Ok(())
}

async fn seed_welcome_announcement(ctx: &MigrationContext) -> MigrationResult<()> {
    if announcements::Entity::find().count(&ctx.db).await? > 0 {
        return Ok(());
    }

    let now = Utc::now();
    announcements::ActiveModel {
        id: NotSet,
        title: Set("欢迎使用".to_string()),
        content: Set("系统已完成初始化，请前往后台完善站点设置。".to_string()),
        is_active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&ctx.db)
    .await?;

    tracing::info!("Seeded welcome announcement");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_secrets_shape() {
        let secret = jwt_secret();
        assert_eq!(STANDARD.decode(&secret).unwrap().len(), 32);
        assert_ne!(secret, jwt_secret());

        let token = internal_token();
        assert_eq!(token.len(), 43);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
