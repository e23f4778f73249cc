//! Sync and plan commands

use console::style;
use std::io::IsTerminal;

use opasync_core::{DefaultSelector, PlanSelector, SyncOrchestrator, SyncOutcome, SyncPlan};

use crate::display;
use crate::error::{CliError, Result};
use crate::progress::{ProgressStore, action_spinner};
use crate::selector::InteractiveSelector;
use crate::workspace::Workspace;

/// How a sync run should behave
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Apply the default selection without prompting
    pub yes: bool,
    /// Stop after printing the plan
    pub dry_run: bool,
    /// Print the plan as JSON (dry run only)
    pub json: bool,
}

pub async fn run(workspace: &Workspace, options: SyncOptions) -> Result<()> {
    let locator = workspace.locator()?;
    let store = workspace.connect().await?;

    let interactive = !options.yes && !options.dry_run && prompt_available();
    if !options.yes && !options.dry_run && !interactive {
        tracing::info!("no terminal attached, applying the default selection");
    }

    let selector: Box<dyn PlanSelector> = if interactive {
        Box::new(InteractiveSelector::new())
    } else {
        Box::new(DefaultSelector)
    };

    let progress = ProgressStore::new(&store, action_spinner());
    let mut orchestrator = SyncOrchestrator::new(
        &locator,
        &progress,
        selector.as_ref(),
        workspace.config.extension(),
    )
    .dry_run(options.dry_run);

    let outcome = orchestrator.run().await;
    progress.finish();

    match outcome {
        SyncOutcome::PlanFailed(e) => Err(e.into()),

        SyncOutcome::UpToDate => {
            if options.json {
                println!("{}", serde_json::to_string_pretty(&SyncPlan::default())?);
            } else {
                println!(
                    "{} Policies in namespace {} are up to date",
                    style("✓").green().bold(),
                    style(workspace.namespace()).cyan()
                );
            }
            Ok(())
        }

        SyncOutcome::Planned(plan) => {
            if options.json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                display::print_plan(&plan, workspace.namespace())?;
            }
            Ok(())
        }

        SyncOutcome::Cancelled { plan } => {
            println!("{} No actions selected, nothing changed", style("→").blue());
            if !interactive {
                display::warn_skipped_overwrites(&plan)?;
            }
            Ok(())
        }

        SyncOutcome::Completed { plan, report } => {
            display::print_report(&report)?;

            if !interactive {
                display::warn_skipped_overwrites(&plan)?;
            }

            if report.is_success() {
                Ok(())
            } else {
                Err(CliError::actions_failed(
                    report.failure_count(),
                    report.success_count(),
                ))
            }
        }
    }
}

/// Whether an interactive picker can be shown
fn prompt_available() -> bool {
    std::io::stdin().is_terminal() && console::user_attended_stderr()
}
