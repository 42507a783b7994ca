//! Post-update callbacks keyed by settings group.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::keys::groups::WILDCARD;

/// Callback run after a group's settings changed
#[async_trait]
pub trait SettingsHook: Send + Sync {
    async fn on_update(&self, group: &str) -> eyre::Result<()>;
}

/// Adapter so plain async closures can be registered
struct FnHook<F>(F);

#[async_trait]
impl<F> SettingsHook for FnHook<F>
where
    F: Fn(String) -> BoxFuture<'static, eyre::Result<()>> + Send + Sync,
{
    async fn on_update(&self, group: &str) -> eyre::Result<()> {
        (self.0)(group.to_string()).await
    }
}

/// Multimap from group name to ordered hooks.
///
/// Hooks under the empty group name run after the exact-group hooks of
/// every trigger.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<String, Vec<Arc<dyn SettingsHook>>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, group: impl Into<String>, hook: Arc<dyn SettingsHook>) {
        let group = group.into();
        tracing::debug!(group = %group, "Registering settings hook");
        self.hooks.write().await.entry(group).or_default().push(hook);
    }

    pub async fn register_fn<F>(&self, group: impl Into<String>, f: F)
    where
        F: Fn(String) -> BoxFuture<'static, eyre::Result<()>> + Send + Sync + 'static,
    {
        self.register(group, Arc::new(FnHook(f))).await;
    }

    /// Number of hooks registered for exactly `group`
    pub async fn count(&self, group: &str) -> usize {
        self.hooks.read().await.get(group).map_or(0, Vec::len)
    }

    /// Run the hooks for `group`, then the wildcard hooks.
    ///
    /// Hook errors are logged and never stop the remaining hooks. Returns
    /// how many hooks succeeded.
    pub async fn trigger(&self, group: &str) -> usize {
        let selected: Vec<Arc<dyn SettingsHook>> = {
            let hooks = self.hooks.read().await;
            let exact = hooks.get(group).into_iter().flatten();
            let wildcard = if group == WILDCARD {
                None
            } else {
                hooks.get(WILDCARD)
            };
            exact.chain(wildcard.into_iter().flatten()).cloned().collect()
        };

        let mut succeeded = 0;
        for hook in selected {
            match hook.on_update(group).await {
                Ok(()) => succeeded += 1,
                Err(e) => tracing::error!(group = %group, error = %e, "Settings hook failed"),
            }
        }
        succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::Mutex;

    fn recorder(log: Arc<Mutex<Vec<String>>>, label: &'static str) -> impl Fn(String) -> BoxFuture<'static, eyre::Result<()>> {
        move |group| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{label}:{group}"));
                Ok(())
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_exact_then_wildcard_order() {
        let registry = HookRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.register_fn("", recorder(Arc::clone(&log), "any")).await;
        registry.register_fn("mail", recorder(Arc::clone(&log), "first")).await;
        registry.register_fn("mail", recorder(Arc::clone(&log), "second")).await;

        assert_eq!(registry.trigger("mail").await, 3);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:mail", "second:mail", "any:mail"]
        );
    }

    #[tokio::test]
    async fn test_failing_hook_does_not_block_others() {
        let registry = HookRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry
            .register_fn("mail", |_| async { Err::<(), _>(eyre::eyre!("smtp down")) }.boxed())
            .await;
        registry.register_fn("mail", recorder(Arc::clone(&log), "after")).await;

        assert_eq!(registry.trigger("mail").await, 1);
        assert_eq!(*log.lock().unwrap(), vec!["after:mail"]);
    }

    #[tokio::test]
    async fn test_unrelated_group_runs_only_wildcard() {
        let registry = HookRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.register_fn("mail", recorder(Arc::clone(&log), "mail")).await;
        registry.register_fn("", recorder(Arc::clone(&log), "any")).await;

        assert_eq!(registry.trigger("theme").await, 1);
        assert_eq!(registry.trigger("").await, 1);
        assert_eq!(*log.lock().unwrap(), vec!["any:theme", "any:"]);
        assert_eq!(registry.count("mail").await, 1);
    }
}
