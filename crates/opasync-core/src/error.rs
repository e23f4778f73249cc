//! Core error types

use thiserror::Error;

/// Boxed error used to carry backend failures (Kubernetes, filesystem) through the core traits
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid exclude pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Cannot access policy file {path}: {message}")]
    FileAccess { path: String, message: String },

    /// Failure reported by a policy store backend
    #[error(transparent)]
    Backend(BoxError),
}

impl CoreError {
    /// Wrap any backend error
    pub fn backend(err: impl Into<BoxError>) -> Self {
        CoreError::Backend(err.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that abort plan construction
#[derive(Error, Debug)]
pub enum PlanError {
    /// Local file set contains references that are not addressable on disk
    #[error("{} policy file reference(s) are not local files: {}", .refs.len(), .refs.join(", "))]
    Validation { refs: Vec<String> },

    /// Two local files derive the same policy name
    #[error("policy name '{name}' is derived from more than one file: {}", .paths.join(", "))]
    NameCollision { name: String, paths: Vec<String> },

    /// Local policy discovery failed
    #[error("failed to locate policy files")]
    Locate(#[source] CoreError),

    /// Remote policy listing failed
    #[error("failed to list policies in namespace '{namespace}'")]
    RemoteList {
        namespace: String,
        #[source]
        source: CoreError,
    },
}

impl PlanError {
    /// All messages in the error chain, outermost first
    pub fn messages(&self) -> Vec<String> {
        crate::action::error_chain(self)
    }
}
