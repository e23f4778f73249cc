//! Action execution
//!
//! A confirmed selection is a list of [`ActionItem`]s. Each one is dispatched to the
//! policy store independently; the batch runs concurrently and is joined once every
//! action has finished. A failing action never cancels or rolls back its siblings.

use std::fmt;
use std::path::PathBuf;

use futures::future::join_all;
use serde::Serialize;

use crate::store::PolicyStore;

/// A single unit of work against the cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActionItem {
    /// Create or overwrite the policy named after the file
    Deploy { path: PathBuf },
    /// Remove the named policy
    Delete { name: String },
}

impl ActionItem {
    /// Short verb for display
    pub fn verb(&self) -> &'static str {
        match self {
            ActionItem::Deploy { .. } => "deploy",
            ActionItem::Delete { .. } => "delete",
        }
    }

    /// File path or policy name the action targets
    pub fn target(&self) -> String {
        match self {
            ActionItem::Deploy { path } => path.display().to_string(),
            ActionItem::Delete { name } => name.clone(),
        }
    }
}

impl fmt::Display for ActionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb(), self.target())
    }
}

/// Failure of one action, with every message from the error chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionFailure {
    pub messages: Vec<String>,
}

impl ActionFailure {
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            messages: error_chain(err),
        }
    }
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages.join(": "))
    }
}

/// Collect the display of an error and all of its sources
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut messages: Vec<String> = Vec::new();
    let mut current = Some(err);
    while let Some(e) = current {
        let message = e.to_string();
        if messages.last() != Some(&message) {
            messages.push(message);
        }
        current = e.source();
    }
    messages
}

/// Outcome of one executed action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action: ActionItem,
    pub result: Result<(), ActionFailure>,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Overall result of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Nothing was executed
    Empty,
    /// Every action succeeded
    Success,
    /// Some actions failed, some succeeded
    Partial,
    /// Every action failed
    Failed,
}

/// Aggregated outcomes of a batch, in submission order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<ActionOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&ActionItem, &ActionFailure)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.action, e)))
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    pub fn status(&self) -> BatchStatus {
        match (self.success_count(), self.failure_count()) {
            (0, 0) => BatchStatus::Empty,
            (_, 0) => BatchStatus::Success,
            (0, _) => BatchStatus::Failed,
            _ => BatchStatus::Partial,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        match self.status() {
            BatchStatus::Empty => "No actions executed".to_string(),
            BatchStatus::Success => {
                format!("{} action(s) completed successfully", self.success_count())
            }
            BatchStatus::Partial | BatchStatus::Failed => format!(
                "{} action(s) failed, {} succeeded",
                self.failure_count(),
                self.success_count()
            ),
        }
    }
}

/// Execute a single action against the store
pub async fn execute(store: &dyn PolicyStore, action: &ActionItem) -> Result<(), ActionFailure> {
    let result = match action {
        ActionItem::Deploy { path } => store.deploy_policy(path).await,
        ActionItem::Delete { name } => store.delete_policy(name).await,
    };

    match result {
        Ok(()) => {
            tracing::debug!("{} succeeded", action);
            Ok(())
        }
        Err(e) => {
            tracing::debug!("{} failed: {}", action, e);
            Err(ActionFailure::from_error(&e))
        }
    }
}

/// Execute every action concurrently and wait for all of them
pub async fn execute_all(store: &dyn PolicyStore, actions: &[ActionItem]) -> BatchReport {
    let futures = actions.iter().map(|action| async move {
        ActionOutcome {
            action: action.clone(),
            result: execute(store, action).await,
        }
    });

    BatchReport {
        outcomes: join_all(futures).await,
    }
}
