//! Progress reporting while actions run

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};

use opasync_core::{PolicyObject, PolicyStore};

/// Create the spinner shown while actions execute
///
/// Hidden when stderr is not a terminal.
pub fn action_spinner() -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(template);
    }
    spinner
}

/// Store wrapper that ticks a spinner as deploys and deletes finish
pub struct ProgressStore<'a> {
    inner: &'a dyn PolicyStore,
    bar: ProgressBar,
    started: AtomicBool,
}

impl<'a> ProgressStore<'a> {
    pub fn new(inner: &'a dyn PolicyStore, bar: ProgressBar) -> Self {
        Self {
            inner,
            bar,
            started: AtomicBool::new(false),
        }
    }

    fn start(&self) {
        if !self.started.swap(true, Ordering::SeqCst) {
            self.bar.set_message("applying changes");
            self.bar.enable_steady_tick(Duration::from_millis(100));
        }
    }

    fn finish_one(&self, action: String) {
        self.bar.inc(1);
        self.bar.set_message(format!("{} done", action));
    }

    /// Number of actions that have finished
    pub fn completed(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[async_trait]
impl<'a> PolicyStore for ProgressStore<'a> {
    fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    async fn list_policies(&self) -> opasync_core::Result<Vec<PolicyObject>> {
        self.inner.list_policies().await
    }

    async fn deploy_policy(&self, path: &Path) -> opasync_core::Result<()> {
        self.start();
        let result = self.inner.deploy_policy(path).await;
        self.finish_one(format!("deploy {}", path.display()));
        result
    }

    async fn delete_policy(&self, name: &str) -> opasync_core::Result<()> {
        self.start();
        let result = self.inner.delete_policy(name).await;
        self.finish_one(format!("delete {}", name));
        result
    }

    async fn get_policy(&self, name: &str) -> opasync_core::Result<Option<PolicyObject>> {
        self.inner.get_policy(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opasync_core::{ActionItem, MockPolicyStore, execute_all};

    #[tokio::test]
    async fn test_counts_finished_actions() {
        let mock = MockPolicyStore::with_policies(vec![PolicyObject::dev("old")]);
        mock.fail_on("broken.rego", "boom");
        let store = ProgressStore::new(&mock, ProgressBar::hidden());

        let report = execute_all(
            &store,
            &[
                ActionItem::Deploy {
                    path: "new.rego".into(),
                },
                ActionItem::Deploy {
                    path: "broken.rego".into(),
                },
                ActionItem::Delete {
                    name: "old".to_string(),
                },
            ],
        )
        .await;
        store.finish();

        assert_eq!(store.completed(), 3);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(mock.operation_counts().deploys, 2);
    }

    #[tokio::test]
    async fn test_listing_passes_through() {
        let mock = MockPolicyStore::with_policies(vec![PolicyObject::dev("a")]);
        let store = ProgressStore::new(&mock, ProgressBar::hidden());

        assert_eq!(store.namespace(), "opa");
        assert_eq!(store.list_policies().await.unwrap().len(), 1);
        assert_eq!(store.completed(), 0);
    }
}
