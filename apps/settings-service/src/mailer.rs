//! Outgoing mail transport built from the `mail` settings group.
//!
//! The transport is rebuilt whenever the group changes, so SMTP edits in
//! the admin UI take effect without a restart.

use async_trait::async_trait;
use domain_settings::accessors::{coerce_bool, coerce_i64, coerce_string};
use domain_settings::keys::groups;
use domain_settings::{SettingRepository, SettingsError, SettingsHook, SettingsService};
use eyre::{Result, WrapErr};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, Tokio1Executor};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

const DEFAULT_SMTP_PORT: u16 = 465;

/// SMTP settings as stored in the `mail` group
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub use_tls: bool,
}

impl MailConfig {
    /// `None` when no SMTP host is configured
    pub fn from_group(settings: &BTreeMap<String, Value>) -> Option<Self> {
        let text = |key: &str| settings.get(key).and_then(coerce_string).unwrap_or_default();

        let host = text("smtp_host");
        if host.is_empty() {
            return None;
        }

        let port = settings
            .get("smtp_port")
            .and_then(coerce_i64)
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or(DEFAULT_SMTP_PORT);

        Some(Self {
            host,
            port,
            username: text("smtp_username"),
            password: text("smtp_password"),
            from: text("smtp_from"),
            use_tls: settings.get("smtp_use_tls").and_then(coerce_bool).unwrap_or(true),
        })
    }
}

/// Configured transport plus the settings it was built from
pub struct Mailer {
    pub config: MailConfig,
    pub transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl Mailer {
    pub fn new(config: MailConfig) -> Result<Self> {
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .wrap_err("Failed to create SMTP relay")?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let builder = builder.port(config.port);
        let transport = if config.username.is_empty() {
            builder.build()
        } else {
            builder
                .credentials(Credentials::new(config.username.clone(), config.password.clone()))
                .build()
        };

        Ok(Self { config, transport })
    }
}

/// Shared, swappable mailer
#[derive(Default)]
pub struct MailerHandle {
    inner: RwLock<Option<Arc<Mailer>>>,
}

impl MailerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current mailer, if mail is configured
    pub async fn current(&self) -> Option<Arc<Mailer>> {
        self.inner.read().await.clone()
    }

    /// Rebuild from the `mail` group; an unconfigured group clears the mailer
    pub async fn refresh<R: SettingRepository>(&self, settings: &SettingsService<R>) -> Result<()> {
        let config = match settings.get_group_map(groups::MAIL).await {
            Ok(view) => MailConfig::from_group(&view.settings),
            Err(SettingsError::NotFound(_)) => None,
            Err(e) => return Err(e).wrap_err("Failed to load mail settings"),
        };

        let mailer = config.map(Mailer::new).transpose()?.map(Arc::new);
        match &mailer {
            Some(m) => info!(host = %m.config.host, port = m.config.port, "Mailer configured"),
            None => info!("Mailer disabled, no SMTP host configured"),
        }

        *self.inner.write().await = mailer;
        Ok(())
    }
}

/// Hook that refreshes the mailer after `mail` settings change
pub struct MailerRefreshHook<R: SettingRepository> {
    handle: Arc<MailerHandle>,
    settings: SettingsService<R>,
}

impl<R: SettingRepository> MailerRefreshHook<R> {
    pub fn new(handle: Arc<MailerHandle>, settings: SettingsService<R>) -> Self {
        Self { handle, settings }
    }
}

#[async_trait]
impl<R: SettingRepository + 'static> SettingsHook for MailerRefreshHook<R> {
    async fn on_update(&self, _group: &str) -> Result<()> {
        self.handle.refresh(&self.settings).await
    }
}
