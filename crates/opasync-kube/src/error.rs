//! Error types for opasync-kube

use thiserror::Error;

/// Result type for opasync-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur during Kubernetes operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Kubeconfig could not be loaded
    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// Listing policy ConfigMaps failed
    #[error("failed to list ConfigMaps matching '{selector}' in namespace '{namespace}'")]
    List {
        namespace: String,
        selector: String,
        #[source]
        source: kube::Error,
    },

    /// Applying a policy ConfigMap failed
    #[error("failed to deploy policy '{name}' to namespace '{namespace}'")]
    Deploy {
        name: String,
        namespace: String,
        #[source]
        source: kube::Error,
    },

    /// Deleting a policy ConfigMap failed
    #[error("failed to delete policy '{name}' from namespace '{namespace}'")]
    Delete {
        name: String,
        namespace: String,
        #[source]
        source: kube::Error,
    },

    /// Policy file could not be read
    #[error("failed to read policy file {path}")]
    ReadPolicy {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl KubeError {
    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        is_status(self.api_error(), 404)
    }

    fn api_error(&self) -> Option<&kube::Error> {
        match self {
            KubeError::Api(e)
            | KubeError::List { source: e, .. }
            | KubeError::Deploy { source: e, .. }
            | KubeError::Delete { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

fn is_status(err: Option<&kube::Error>, code: u16) -> bool {
    matches!(err, Some(kube::Error::Api(resp)) if resp.code == code)
}

impl From<KubeError> for opasync_core::CoreError {
    fn from(e: KubeError) -> Self {
        opasync_core::CoreError::backend(e)
    }
}
