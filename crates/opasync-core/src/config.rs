//! Sync configuration
//!
//! Looked up in order: an explicit `--config` path, `<root>/.opasync.yaml`,
//! `~/.config/opasync/config.yaml`. Missing files fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::policy::{DEFAULT_EXTENSION, keys};

/// Name of the per-workspace config file
pub const WORKSPACE_CONFIG_FILE: &str = ".opasync.yaml";

/// Policy sync configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Namespace holding the policy ConfigMaps
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Label key identifying policy ConfigMaps
    #[serde(default = "default_policy_label")]
    pub policy_label: String,

    #[serde(default = "default_policy_label_value")]
    pub policy_label_value: String,

    /// Policy file extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Field manager used for server-side apply
    #[serde(default = "default_field_manager")]
    pub field_manager: String,

    /// Glob patterns (relative to the workspace root) skipped during discovery
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Policy names never listed, planned or deleted
    #[serde(default)]
    pub reserved_policies: Vec<String>,
}

fn default_namespace() -> String {
    "opa".to_string()
}

fn default_policy_label() -> String {
    keys::POLICY_LABEL.to_string()
}

fn default_policy_label_value() -> String {
    keys::POLICY_LABEL_VALUE.to_string()
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_field_manager() -> String {
    "opasync".to_string()
}

fn default_exclude() -> Vec<String> {
    vec!["target/**".to_string(), "node_modules/**".to_string()]
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            policy_label: default_policy_label(),
            policy_label_value: default_policy_label_value(),
            extension: default_extension(),
            field_manager: default_field_manager(),
            exclude: default_exclude(),
            reserved_policies: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Resolve and load configuration for a workspace
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(CoreError::InvalidConfig {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            return Self::load_from(path);
        }

        let workspace = root.join(WORKSPACE_CONFIG_FILE);
        if workspace.exists() {
            return Self::load_from(&workspace);
        }

        match Self::user_config_path() {
            Some(user) if user.exists() => Self::load_from(&user),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!("loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Per-user configuration path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("opasync").join("config.yaml"))
    }

    /// Reject settings that cannot work against a cluster
    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(CoreError::InvalidConfig {
                message: "namespace must not be empty".to_string(),
            });
        }
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(CoreError::InvalidConfig {
                message: "extension must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Label selector matching policy ConfigMaps
    pub fn label_selector(&self) -> String {
        format!("{}={}", self.policy_label, self.policy_label_value)
    }

    /// Extension without a leading dot
    pub fn extension(&self) -> &str {
        self.extension.trim_start_matches('.')
    }

    /// Whether a policy name is reserved for the system
    ///
    /// Explicitly listed names are reserved, as is anything prefixed `kube-`.
    pub fn is_reserved(&self, name: &str) -> bool {
        name.starts_with("kube-") || self.reserved_policies.iter().any(|r| r == name)
    }
}
