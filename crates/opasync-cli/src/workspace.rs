//! Shared command setup: configuration, workspace discovery and cluster connection

use clap::Args;
use std::path::{Path, PathBuf};

use opasync_core::{SyncConfig, WorkspaceLocator};
use opasync_kube::ConfigMapStore;

use crate::error::{CliError, Result};

/// Options accepted by every subcommand
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Workspace root to discover policy files in
    #[arg(long, global = true, default_value = ".", env = "OPASYNC_ROOT")]
    pub root: PathBuf,

    /// Namespace holding the policy ConfigMaps (overrides the config file)
    #[arg(short, long, global = true, env = "OPASYNC_NAMESPACE")]
    pub namespace: Option<String>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Configuration file (default: <root>/.opasync.yaml, then the user config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Resolved workspace for one invocation
#[derive(Debug)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: SyncConfig,
    context: Option<String>,
}

impl Workspace {
    /// Load configuration and apply command-line overrides
    pub fn load(args: &GlobalArgs) -> Result<Self> {
        if !args.root.is_dir() {
            return Err(CliError::Io {
                message: format!("workspace root is not a directory: {}", args.root.display()),
            });
        }

        let mut config = SyncConfig::load(&args.root, args.config.as_deref())?;
        if let Some(namespace) = &args.namespace {
            config.namespace = namespace.clone();
            config.validate()?;
        }
        tracing::debug!(
            namespace = %config.namespace,
            root = %args.root.display(),
            "loaded configuration"
        );

        Ok(Self {
            root: args.root.clone(),
            config,
            context: args.context.clone(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// Locator over the workspace's policy files
    pub fn locator(&self) -> Result<WorkspaceLocator> {
        Ok(WorkspaceLocator::new(
            &self.root,
            self.config.extension(),
            &self.config.exclude,
        )?)
    }

    /// Express a command-line path relative to the workspace root where possible
    pub fn relative_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            if let Ok(root) = self.root.canonicalize() {
                if let Ok(relative) = path.strip_prefix(&root) {
                    return relative.to_path_buf();
                }
            }
        }
        path.to_path_buf()
    }

    /// Connect to the cluster and open the policy store
    pub async fn connect(&self) -> Result<ConfigMapStore> {
        let client = opasync_kube::connect(self.context.as_deref())
            .await
            .map_err(|e| {
                let message = opasync_core::ActionFailure::from_error(&e).messages.join(": ");
                CliError::cluster(message, Some(self.context_help()))
            })?;
        Ok(ConfigMapStore::new(client, &self.root, self.config.clone()))
    }

    fn context_help(&self) -> String {
        match opasync_kube::available_contexts() {
            Ok(contexts) if !contexts.is_empty() => {
                format!("available contexts: {}", contexts.join(", "))
            }
            _ => "check KUBECONFIG or pass --context".to_string(),
        }
    }
}
