//! CLI command implementations

pub mod delete;
pub mod deploy;
pub mod list;
pub mod sync;

use opasync_core::{ActionItem, PolicyStore, execute_all};

use crate::display;
use crate::error::{CliError, Result};
use crate::progress::{ProgressStore, action_spinner};

/// Run a confirmed batch, print the report and fail if any action failed
pub(crate) async fn run_actions(store: &dyn PolicyStore, actions: &[ActionItem]) -> Result<()> {
    let progress = ProgressStore::new(store, action_spinner());
    let report = execute_all(&progress, actions).await;
    progress.finish();
    tracing::debug!("{} action(s) finished", progress.completed());

    display::print_report(&report)?;
    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::actions_failed(
            report.failure_count(),
            report.success_count(),
        ))
    }
}
