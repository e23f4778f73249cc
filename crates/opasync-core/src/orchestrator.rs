//! Sync orchestration
//!
//! One run walks the state machine
//!
//! ```text
//! Idle -> Planning -> AwaitingSelection -> Executing -> Reporting -> Idle
//! ```
//!
//! with two shortcuts: a planning failure jumps straight to `Reporting`, and an empty
//! or cancelled selection returns to `Idle` without executing anything.

use std::fmt;

use crate::action::{ActionItem, BatchReport, execute_all};
use crate::error::PlanError;
use crate::locator::PolicyLocator;
use crate::plan::{SyncPlan, plan_sync};
use crate::select::PlanSelector;
use crate::store::PolicyStore;

/// States of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Planning,
    AwaitingSelection,
    Executing,
    Reporting,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Idle => "idle",
            SyncState::Planning => "planning",
            SyncState::AwaitingSelection => "awaiting-selection",
            SyncState::Executing => "executing",
            SyncState::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

/// How a sync run ended
#[derive(Debug)]
pub enum SyncOutcome {
    /// Plan could not be built; nothing was shown or executed
    PlanFailed(PlanError),
    /// Local and remote state already agree
    UpToDate,
    /// Dry run: plan computed, nothing executed
    Planned(SyncPlan),
    /// Operator selected nothing or aborted; carries the plan that was offered
    Cancelled { plan: SyncPlan },
    /// Selected actions ran; see the report for per-action results
    Completed {
        plan: SyncPlan,
        report: BatchReport,
    },
}

impl SyncOutcome {
    /// Whether the run ended without any failure
    pub fn is_success(&self) -> bool {
        match self {
            SyncOutcome::PlanFailed(_) => false,
            SyncOutcome::Completed { report, .. } => report.is_success(),
            _ => true,
        }
    }
}

/// Drives a single snapshot-and-reconcile cycle
pub struct SyncOrchestrator<'a> {
    locator: &'a dyn PolicyLocator,
    store: &'a dyn PolicyStore,
    selector: &'a dyn PlanSelector,
    extension: String,
    dry_run: bool,
    state: SyncState,
    transitions: Vec<SyncState>,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        locator: &'a dyn PolicyLocator,
        store: &'a dyn PolicyStore,
        selector: &'a dyn PlanSelector,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            locator,
            store,
            selector,
            extension: extension.into(),
            dry_run: false,
            state: SyncState::Idle,
            transitions: vec![SyncState::Idle],
        }
    }

    /// Stop after planning
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Every state entered so far, starting with `Idle`
    pub fn transitions(&self) -> &[SyncState] {
        &self.transitions
    }

    fn transition(&mut self, next: SyncState) {
        tracing::debug!("sync state {} -> {}", self.state, next);
        self.state = next;
        self.transitions.push(next);
    }

    /// Run one full cycle
    pub async fn run(&mut self) -> SyncOutcome {
        self.transition(SyncState::Planning);
        let plan = match plan_sync(self.locator, self.store, &self.extension).await {
            Ok(plan) => plan,
            Err(e) => {
                self.transition(SyncState::Reporting);
                self.transition(SyncState::Idle);
                return SyncOutcome::PlanFailed(e);
            }
        };

        if plan.is_empty() {
            self.transition(SyncState::Idle);
            return SyncOutcome::UpToDate;
        }

        if self.dry_run {
            self.transition(SyncState::Idle);
            return SyncOutcome::Planned(plan);
        }

        self.transition(SyncState::AwaitingSelection);
        let selected = match self.selector.select(&plan.choices()) {
            Ok(selected) => selected,
            Err(e) => {
                tracing::warn!("selection aborted: {}", e);
                Vec::new()
            }
        };

        if selected.is_empty() {
            self.transition(SyncState::Idle);
            return SyncOutcome::Cancelled { plan };
        }

        let report = self.execute(&selected).await;

        self.transition(SyncState::Reporting);
        self.transition(SyncState::Idle);
        SyncOutcome::Completed { plan, report }
    }

    async fn execute(&mut self, selected: &[ActionItem]) -> BatchReport {
        self.transition(SyncState::Executing);
        tracing::debug!("executing {} action(s)", selected.len());
        execute_all(self.store, selected).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::BatchStatus;
    use crate::error::{CoreError, Result};
    use crate::locator::StaticLocator;
    use crate::plan::PlanChoice;
    use crate::policy::{FileRef, PolicyObject};
    use crate::select::DefaultSelector;
    use crate::store::MockPolicyStore;
    use SyncState::*;

    fn cancel(_: &[PlanChoice]) -> Result<Vec<ActionItem>> {
        Ok(Vec::new())
    }

    fn take_all(choices: &[PlanChoice]) -> Result<Vec<ActionItem>> {
        Ok(choices.iter().map(|c| c.action.clone()).collect())
    }

    #[tokio::test]
    async fn test_full_cycle() {
        let locator = StaticLocator::new(vec![FileRef::file("a.rego"), FileRef::file("b.rego")]);
        let store = MockPolicyStore::with_policies(vec![
            PolicyObject::dev("b"),
            PolicyObject::dev("stale"),
        ]);

        let mut orchestrator = SyncOrchestrator::new(&locator, &store, &DefaultSelector, "rego");
        let outcome = orchestrator.run().await;

        let SyncOutcome::Completed { plan, report } = outcome else {
            panic!("expected completed outcome");
        };
        assert_eq!(plan.deploy_names(), vec!["a"]);
        assert_eq!(report.status(), BatchStatus::Success);
        assert_eq!(report.success_count(), 3);
        assert_eq!(
            orchestrator.transitions(),
            &[Idle, Planning, AwaitingSelection, Executing, Reporting, Idle]
        );

        let mut names: Vec<String> = store.policies().into_iter().map(|p| p.name).collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_plan_failure_skips_selection() {
        let locator = StaticLocator::new(vec![FileRef::with_scheme("untitled", "new.rego")]);
        let store = MockPolicyStore::new();
        let selector = |_: &[PlanChoice]| -> Result<Vec<ActionItem>> {
            panic!("selector must not be called")
        };

        let mut orchestrator = SyncOrchestrator::new(&locator, &store, &selector, "rego");
        let outcome = orchestrator.run().await;

        assert!(matches!(
            outcome,
            SyncOutcome::PlanFailed(PlanError::Validation { .. })
        ));
        assert!(!outcome.is_success());
        assert_eq!(orchestrator.transitions(), &[Idle, Planning, Reporting, Idle]);
        assert_eq!(store.operation_counts().lists, 0);
    }

    #[tokio::test]
    async fn test_remote_list_failure_reported() {
        let locator = StaticLocator::new(vec![FileRef::file("a.rego")]);
        let store = MockPolicyStore::new();
        store.fail_listing("Unauthorized");

        let mut orchestrator = SyncOrchestrator::new(&locator, &store, &DefaultSelector, "rego");
        let outcome = orchestrator.run().await;

        assert!(matches!(
            outcome,
            SyncOutcome::PlanFailed(PlanError::RemoteList { .. })
        ));
        assert_eq!(orchestrator.state(), Idle);
    }

    #[tokio::test]
    async fn test_cancelled_selection_returns_to_idle() {
        let locator = StaticLocator::new(vec![FileRef::file("a.rego")]);
        let store = MockPolicyStore::new();

        let mut orchestrator = SyncOrchestrator::new(&locator, &store, &cancel, "rego");
        let outcome = orchestrator.run().await;

        assert!(matches!(outcome, SyncOutcome::Cancelled { .. }));
        assert!(outcome.is_success());
        assert_eq!(
            orchestrator.transitions(),
            &[Idle, Planning, AwaitingSelection, Idle]
        );
        assert_eq!(store.operation_counts().deploys, 0);
    }

    #[tokio::test]
    async fn test_selector_error_treated_as_cancel() {
        let locator = StaticLocator::new(vec![FileRef::file("a.rego")]);
        let store = MockPolicyStore::new();
        let failing = |_: &[PlanChoice]| -> Result<Vec<ActionItem>> {
            Err(CoreError::Io(std::io::Error::other("not a terminal")))
        };

        let mut orchestrator = SyncOrchestrator::new(&locator, &store, &failing, "rego");
        assert!(matches!(orchestrator.run().await, SyncOutcome::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_default_selection_skips_unsafe_overwrite() {
        let locator = StaticLocator::new(vec![FileRef::file("theirs.rego")]);
        let store = MockPolicyStore::with_policies(vec![PolicyObject::new("theirs")]);

        let mut orchestrator = SyncOrchestrator::new(&locator, &store, &DefaultSelector, "rego");
        let SyncOutcome::Cancelled { plan } = orchestrator.run().await else {
            panic!("expected cancelled outcome");
        };
        assert_eq!(plan.overwrite_non_dev_names(), vec!["theirs"]);
        assert_eq!(store.operation_counts().deploys, 0);
    }

    #[tokio::test]
    async fn test_explicit_unsafe_overwrite() {
        let locator = StaticLocator::new(vec![FileRef::file("theirs.rego")]);
        let store = MockPolicyStore::with_policies(vec![PolicyObject::new("theirs")]);

        let mut orchestrator = SyncOrchestrator::new(&locator, &store, &take_all, "rego");
        let outcome = orchestrator.run().await;
        assert!(outcome.is_success());
        assert!(crate::policy::is_dev_owned(&store.policies()[0]));
    }

    #[tokio::test]
    async fn test_partial_failure_still_reports() {
        let locator = StaticLocator::new(vec![FileRef::file("broken.rego")]);
        let store = MockPolicyStore::with_policies(vec![PolicyObject::dev("stale")]);
        store.fail_on("broken.rego", "invalid rego");

        let mut orchestrator = SyncOrchestrator::new(&locator, &store, &take_all, "rego");
        let outcome = orchestrator.run().await;

        let SyncOutcome::Completed { report, .. } = &outcome else {
            panic!("expected completed outcome");
        };
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.success_count(), 1);
        assert!(!outcome.is_success());
        assert_eq!(orchestrator.state(), Idle);
    }

    #[tokio::test]
    async fn test_up_to_date() {
        let locator = StaticLocator::new(vec![]);
        let store = MockPolicyStore::with_policies(vec![PolicyObject::new("external")]);

        let mut orchestrator = SyncOrchestrator::new(&locator, &store, &DefaultSelector, "rego");
        assert!(matches!(orchestrator.run().await, SyncOutcome::UpToDate));
        assert_eq!(orchestrator.transitions(), &[Idle, Planning, Idle]);
    }

    #[tokio::test]
    async fn test_dry_run_stops_after_planning() {
        let locator = StaticLocator::new(vec![FileRef::file("a.rego")]);
        let store = MockPolicyStore::new();

        let mut orchestrator =
            SyncOrchestrator::new(&locator, &store, &DefaultSelector, "rego").dry_run(true);
        let outcome = orchestrator.run().await;

        let SyncOutcome::Planned(plan) = outcome else {
            panic!("expected planned outcome");
        };
        assert_eq!(plan.deploy_names(), vec!["a"]);
        assert_eq!(store.operation_counts().deploys, 0);
    }
}
