//! Delete command - remove policies by name

use console::style;

use opasync_core::{ActionItem, PolicyStore, is_dev_owned};

use crate::error::{CliError, Result};
use crate::workspace::Workspace;

pub async fn run(workspace: &Workspace, names: &[String], force: bool) -> Result<()> {
    let store = workspace.connect().await?;

    let mut refused = Vec::new();
    let mut actions = Vec::new();

    for name in names {
        if workspace.config.is_reserved(name) {
            refused.push(format!("{} (reserved)", name));
            continue;
        }

        match store.get_policy(name).await? {
            None => println!(
                "{} Policy {} not found in namespace {}, skipping",
                style("⚠").yellow(),
                name,
                workspace.namespace()
            ),
            Some(policy) if is_dev_owned(&policy) || force => {
                actions.push(ActionItem::Delete { name: name.clone() });
            }
            Some(_) => refused.push(format!("{} (not deployed by opasync)", name)),
        }
    }

    if !refused.is_empty() {
        return Err(CliError::validation_with_help(
            format!("refusing to delete {}", refused.join(", ")),
            "pass --force to delete policies not deployed by opasync; reserved policies are never deleted",
        ));
    }

    if actions.is_empty() {
        println!("{} Nothing to delete", style("→").blue());
        return Ok(());
    }

    super::run_actions(&store, &actions).await
}
