//! List command - show the policies in the namespace

use serde::Serialize;

use opasync_core::{PlanError, PolicyStatus, PolicyStore};

use crate::display;
use crate::error::Result;
use crate::workspace::Workspace;

#[derive(Debug, Serialize)]
struct PolicyRow<'a> {
    name: &'a str,
    owner: &'static str,
    status: PolicyStatus,
}

pub async fn run(workspace: &Workspace, json: bool) -> Result<()> {
    let store = workspace.connect().await?;

    let mut policies = store
        .list_policies()
        .await
        .map_err(|source| PlanError::RemoteList {
            namespace: store.namespace().to_string(),
            source,
        })?;
    policies.sort_by(|a, b| a.name.cmp(&b.name));

    if json {
        let rows: Vec<PolicyRow<'_>> = policies
            .iter()
            .map(|p| PolicyRow {
                name: &p.name,
                owner: display::owner(p),
                status: p.status(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        display::print_policies(&policies)?;
    }

    Ok(())
}
