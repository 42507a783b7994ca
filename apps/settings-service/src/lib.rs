//! Settings Service
//!
//! Owns the process lifecycle around the settings store and the vector
//! queue admin.
//!
//! ## Startup
//!
//! ```text
//! config (env) → database → migrations → AppContext
//!   → mail hook + runtime knobs → background loops → wait for signal
//! ```
//!
//! Redis and Qdrant are optional; see [`config::ServiceConfig`].

pub mod config;
pub mod context;
pub mod mailer;
pub mod tasks;

use core_config::FromEnv;
use database::sql;
use eyre::{Result, WrapErr};
use migration::MigrationContext;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub use config::ServiceConfig;
pub use context::AppContext;

/// Run the service until SIGINT or SIGTERM
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();
    let config = ServiceConfig::from_env().wrap_err("Failed to load configuration")?;
    core_config::tracing::init_tracing(&config.environment);

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        "Starting settings service"
    );

    let db = sql::connect_with_retry(config.sql.clone(), None)
        .await
        .wrap_err("Failed to connect to database")?;

    let ctx = AppContext::build(&config, db.clone()).await?;

    let report = migration::run(&MigrationContext::new(db, ctx.settings.clone()))
        .await
        .wrap_err("Migration ledger unavailable")?;
    if !report.is_clean() {
        warn!(failed = report.failed.len(), "Some migrations failed, they will be retried on next start");
    }

    ctx.start().await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let change_logger = tasks::spawn_change_logger(Arc::clone(ctx.settings.bus()), shutdown_rx.clone()).await;
    let recovery = tasks::spawn_recovery_loop(ctx.vector.clone(), config.recovery_interval, shutdown_rx);

    info!("Settings service ready");
    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    for (name, handle) in [("change logger", change_logger), ("recovery loop", recovery)] {
        if let Err(e) = handle.await {
            error!(task = name, error = %e, "Background task ended abnormally");
        }
    }

    info!("Settings service stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating shutdown..."),
    }
}
