//! Background loops owned by the service process.

use domain_settings::ChangeBus;
use domain_settings::keys::groups;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::context::VectorAdmin;

/// Periodically send stuck vector jobs back to the queue
pub fn spawn_recovery_loop(
    vector: VectorAdmin,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        info!(interval_secs = interval.as_secs(), "Stuck-job recovery loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match vector.recover_stuck().await {
                        Ok(0) => {}
                        Ok(count) => info!(count, "Recovered stuck vector jobs"),
                        Err(e) => warn!(error = %e, "Stuck-job recovery failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Stuck-job recovery loop stopped");
    })
}

/// Log every settings change published on the bus
pub async fn spawn_change_logger(bus: Arc<ChangeBus>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    let mut changes = bus.subscribe(groups::WILDCARD).await;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                change = changes.recv() => match change {
                    Some(change) => info!(
                        group = %change.group,
                        key = %change.key,
                        "Setting changed"
                    ),
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_settings::{InMemorySettingRepository, SettingInput, SettingType, SettingsCache, SettingsService};

    #[tokio::test]
    async fn test_change_logger_stops_on_shutdown() {
        let service = SettingsService::new(InMemorySettingRepository::new(), SettingsCache::in_memory());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = spawn_change_logger(Arc::clone(service.bus()), shutdown_rx).await;
        assert_eq!(service.bus().subscriber_count().await, 1);

        service
            .create(SettingInput::new("site_name", "Docs", SettingType::String, "website"))
            .await
            .unwrap();

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
