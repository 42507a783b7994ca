//! In-process fan-out of committed setting changes.

use tokio::sync::RwLock;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::keys::groups::WILDCARD;
use crate::models::SettingChange;

struct Subscriber {
    group: String,
    tx: UnboundedSender<SettingChange>,
}

impl Subscriber {
    fn wants(&self, group: &str) -> bool {
        self.group == WILDCARD || self.group == group
    }
}

/// Publish/subscribe channel keyed by group
#[derive(Default)]
pub struct ChangeBus {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every change for `group`; the empty group receives all.
    pub async fn subscribe(&self, group: impl Into<String>) -> UnboundedReceiver<SettingChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().await.push(Subscriber {
            group: group.into(),
            tx,
        });
        rx
    }

    /// Deliver `change` to matching subscribers, dropping closed ones.
    ///
    /// Returns the number of deliveries.
    pub async fn publish(&self, change: &SettingChange) -> usize {
        let mut delivered = 0;
        let mut subscribers = self.subscribers.write().await;

        subscribers.retain(|sub| {
            if sub.tx.is_closed() {
                return false;
            }
            if !sub.wants(&change.group) {
                return true;
            }
            match sub.tx.send(change.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    tracing::debug!(group = %sub.group, "Dropping closed change subscriber");
                    false
                }
            }
        });

        delivered
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}
