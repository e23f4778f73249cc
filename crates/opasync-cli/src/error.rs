//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use miette::Diagnostic;
use thiserror::Error;

use opasync_core::{CoreError, PlanError};
use opasync_kube::KubeError;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Local policy files cannot be planned, or a requested action was refused
    #[error("Validation failed: {message}")]
    #[diagnostic(code(opasync::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Cluster unreachable or policies could not be listed
    #[error("Cluster error: {message}")]
    #[diagnostic(code(opasync::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Some selected actions failed
    #[error("{failed} action(s) failed, {succeeded} succeeded")]
    #[diagnostic(
        code(opasync::cli::actions),
        help("failed actions are listed above; fix them and run the sync again")
    )]
    ActionsFailed { failed: usize, succeeded: usize },

    /// Invalid configuration file or arguments
    #[error("Configuration error: {message}")]
    #[diagnostic(code(opasync::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(opasync::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(opasync::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::ActionsFailed { .. } => exit_codes::ERROR,
            CliError::Config { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    /// Create a validation error with help text
    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a cluster error with optional help text
    pub fn cluster(message: impl Into<String>, help: Option<String>) -> Self {
        Self::Cluster {
            message: message.into(),
            help,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    pub fn actions_failed(failed: usize, succeeded: usize) -> Self {
        Self::ActionsFailed { failed, succeeded }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Other {
            message: format!("failed to serialize output: {}", err),
        }
    }
}

impl From<PlanError> for CliError {
    fn from(err: PlanError) -> Self {
        let message = err.messages().join(": ");
        match err {
            PlanError::Validation { .. } => CliError::validation_with_help(
                message,
                "save the listed documents as files inside the workspace before syncing",
            ),
            PlanError::NameCollision { .. } => CliError::validation_with_help(
                message,
                "policy names must be unique; rename one of the files or add it to `exclude`",
            ),
            PlanError::RemoteList { namespace, .. } => CliError::cluster(
                message,
                Some(format!(
                    "check that namespace '{}' exists and that you may list ConfigMaps in it",
                    namespace
                )),
            ),
            PlanError::Locate(_) => CliError::Io { message },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => e.into(),
            CoreError::YamlParse(_) | CoreError::InvalidConfig { .. } => CliError::Config {
                message: err.to_string(),
                help: Some(format!(
                    "check {} or the file passed with --config",
                    opasync_core::config::WORKSPACE_CONFIG_FILE
                )),
            },
            CoreError::InvalidPattern { .. } => CliError::config(err.to_string()),
            CoreError::FileAccess { .. } => CliError::Io {
                message: err.to_string(),
            },
            CoreError::Backend(_) => CliError::Other {
                message: opasync_core::ActionFailure::from_error(&err).messages.join(": "),
            },
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        let message = opasync_core::ActionFailure::from_error(&err).messages.join(": ");
        match err {
            KubeError::InvalidConfig(_) => CliError::config(message),
            _ => CliError::cluster(message, None),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
