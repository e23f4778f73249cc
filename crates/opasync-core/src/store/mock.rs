//! Mock policy store for testing
//!
//! Stores policies in memory, useful for unit tests without a Kubernetes cluster.
//! Failures can be injected per action target and for listing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::PolicyStore;
use crate::error::{CoreError, Result};
use crate::policy::{DEFAULT_EXTENSION, PolicyObject, derive_policy_name, keys};

/// In-memory policy store for testing
#[derive(Clone)]
pub struct MockPolicyStore {
    namespace: String,
    extension: String,
    /// Policies in insertion order
    policies: Arc<Mutex<Vec<PolicyObject>>>,
    /// Injected failures: action target (path or name) -> message
    failures: Arc<Mutex<HashMap<String, String>>>,
    list_failure: Arc<Mutex<Option<String>>>,
    /// Track operation counts for assertions
    operations: Arc<Mutex<OperationCounts>>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub lists: usize,
    pub deploys: usize,
    pub deletes: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockPolicyStore {
    /// Create a new empty mock store in namespace `opa`
    pub fn new() -> Self {
        Self {
            namespace: "opa".to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            policies: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            list_failure: Arc::new(Mutex::new(None)),
            operations: Arc::new(Mutex::new(OperationCounts::default())),
        }
    }

    /// Create with pre-populated policies
    pub fn with_policies(policies: Vec<PolicyObject>) -> Self {
        let store = Self::new();
        *lock(&store.policies) = policies;
        store
    }

    /// Make the action targeting `target` (file path or policy name) fail
    pub fn fail_on(&self, target: impl Into<String>, message: impl Into<String>) {
        lock(&self.failures).insert(target.into(), message.into());
    }

    /// Make listing fail
    pub fn fail_listing(&self, message: impl Into<String>) {
        *lock(&self.list_failure) = Some(message.into());
    }

    /// Snapshot of the stored policies
    pub fn policies(&self) -> Vec<PolicyObject> {
        lock(&self.policies).clone()
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        lock(&self.operations).clone()
    }

    fn injected_failure(&self, target: &str) -> Option<CoreError> {
        lock(&self.failures)
            .get(target)
            .map(|message| CoreError::backend(message.clone()))
    }
}

impl Default for MockPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyStore for MockPolicyStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn list_policies(&self) -> Result<Vec<PolicyObject>> {
        lock(&self.operations).lists += 1;

        if let Some(message) = lock(&self.list_failure).clone() {
            return Err(CoreError::backend(message));
        }
        Ok(self.policies())
    }

    async fn deploy_policy(&self, path: &Path) -> Result<()> {
        lock(&self.operations).deploys += 1;

        let target = path.display().to_string();
        if let Some(err) = self.injected_failure(&target) {
            return Err(err);
        }

        let name = derive_policy_name(path, &self.extension);
        let policy = PolicyObject::dev(name.clone())
            .with_label(keys::POLICY_LABEL, keys::POLICY_LABEL_VALUE);

        let mut policies = lock(&self.policies);
        match policies.iter_mut().find(|p| p.name == name) {
            Some(existing) => *existing = policy,
            None => policies.push(policy),
        }
        Ok(())
    }

    async fn delete_policy(&self, name: &str) -> Result<()> {
        lock(&self.operations).deletes += 1;

        if let Some(err) = self.injected_failure(name) {
            return Err(err);
        }

        lock(&self.policies).retain(|p| p.name != name);
        Ok(())
    }
}
