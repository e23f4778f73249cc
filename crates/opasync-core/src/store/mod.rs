//! Policy store abstraction
//!
//! The planner and executor talk to the cluster only through [`PolicyStore`].
//! `opasync-kube` provides the ConfigMap implementation; [`MockPolicyStore`] keeps
//! everything in memory for tests.

mod mock;

pub use mock::{MockPolicyStore, OperationCounts};

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::policy::PolicyObject;

/// Remote policy storage
///
/// Implementations must be Send + Sync and support concurrent independent requests:
/// a confirmed batch issues all of its deploys and deletes at once.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Namespace the policies live in
    fn namespace(&self) -> &str;

    /// List policy objects, excluding system-reserved ones
    async fn list_policies(&self) -> Result<Vec<PolicyObject>>;

    /// Create or overwrite the policy named after the file at `path`
    ///
    /// `path` is relative to the workspace root. Re-deploying identical content
    /// leaves the store unchanged.
    async fn deploy_policy(&self, path: &Path) -> Result<()>;

    /// Remove the named policy; an absent policy is not an error
    async fn delete_policy(&self, name: &str) -> Result<()>;

    /// Fetch a single policy by name
    async fn get_policy(&self, name: &str) -> Result<Option<PolicyObject>> {
        Ok(self
            .list_policies()
            .await?
            .into_iter()
            .find(|p| p.name == name))
    }
}
