//! Deploy command - push individual policy files

use std::collections::HashMap;
use std::path::PathBuf;

use opasync_core::{ActionItem, PolicyStore, SyncConfig, derive_policy_name, is_dev_owned};

use crate::error::{CliError, Result};
use crate::workspace::Workspace;

pub async fn run(workspace: &Workspace, files: &[PathBuf], force: bool) -> Result<()> {
    let actions = resolve(workspace, files)?;
    let store = workspace.connect().await?;
    check_overwrites(&store, &workspace.config, &actions, force).await?;
    super::run_actions(&store, &actions).await
}

/// Refuse to take over policies opasync did not deploy unless forced
///
/// Reserved names are refused even with `force`.
async fn check_overwrites(
    store: &dyn PolicyStore,
    config: &SyncConfig,
    actions: &[ActionItem],
    force: bool,
) -> Result<()> {
    let mut refused = Vec::new();

    for action in actions {
        let ActionItem::Deploy { path } = action else {
            continue;
        };
        let name = derive_policy_name(path, config.extension());

        if config.is_reserved(&name) {
            refused.push(format!("{} (reserved)", name));
            continue;
        }
        if force {
            continue;
        }
        let existing = store.get_policy(&name).await?;
        if existing.is_some_and(|policy| !is_dev_owned(&policy)) {
            refused.push(format!("{} (not deployed by opasync)", name));
        }
    }

    if refused.is_empty() {
        Ok(())
    } else {
        Err(CliError::validation_with_help(
            format!("refusing to overwrite {}", refused.join(", ")),
            "pass --force to overwrite policies not deployed by opasync; reserved policies are never overwritten",
        ))
    }
}

/// Check every file before touching the cluster
fn resolve(workspace: &Workspace, files: &[PathBuf]) -> Result<Vec<ActionItem>> {
    let mut missing = Vec::new();
    let mut by_name: HashMap<String, PathBuf> = HashMap::new();
    let mut actions = Vec::new();

    for file in files {
        let path = workspace.relative_path(file);
        if !workspace.root.join(&path).is_file() {
            missing.push(file.display().to_string());
            continue;
        }

        let name = derive_policy_name(&path, workspace.config.extension());
        if let Some(previous) = by_name.insert(name.clone(), path.clone()) {
            return Err(CliError::validation(format!(
                "policy name '{}' is derived from more than one file: {}, {}",
                name,
                previous.display(),
                path.display()
            )));
        }
        actions.push(ActionItem::Deploy { path });
    }

    if !missing.is_empty() {
        return Err(CliError::validation_with_help(
            format!("policy file(s) not found: {}", missing.join(", ")),
            "relative paths are resolved against the workspace root (--root)",
        ));
    }

    Ok(actions)
}
