//! Plan selection
//!
//! The operator confirms which planned actions to run. The interactive picker lives
//! in the CLI; the core only sees the [`PlanSelector`] trait.

use crate::action::ActionItem;
use crate::error::Result;
use crate::plan::PlanChoice;

/// Turns presented choices into the actions to execute
///
/// An empty selection means the operator cancelled.
pub trait PlanSelector: Send + Sync {
    fn select(&self, choices: &[PlanChoice]) -> Result<Vec<ActionItem>>;
}

/// Accepts the default pre-selection without prompting
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSelector;

impl PlanSelector for DefaultSelector {
    fn select(&self, choices: &[PlanChoice]) -> Result<Vec<ActionItem>> {
        Ok(choices
            .iter()
            .filter(|c| c.preselected)
            .map(|c| c.action.clone())
            .collect())
    }
}

impl<F> PlanSelector for F
where
    F: Fn(&[PlanChoice]) -> Result<Vec<ActionItem>> + Send + Sync,
{
    fn select(&self, choices: &[PlanChoice]) -> Result<Vec<ActionItem>> {
        self(choices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::build_plan;
    use crate::policy::{FileRef, PolicyObject};

    #[test]
    fn test_default_selector_matches_plan_default() {
        let plan = build_plan(
            &[FileRef::file("a.rego"), FileRef::file("b.rego")],
            &[PolicyObject::new("b"), PolicyObject::dev("c")],
            "rego",
        )
        .unwrap();

        let selected = DefaultSelector.select(&plan.choices()).unwrap();
        assert_eq!(selected, plan.default_selection());
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_closure_selector() {
        let take_all = |choices: &[PlanChoice]| -> Result<Vec<ActionItem>> {
            Ok(choices.iter().map(|c| c.action.clone()).collect())
        };
        let plan = build_plan(&[FileRef::file("b.rego")], &[PolicyObject::new("b")], "rego")
            .unwrap();
        assert_eq!(take_all.select(&plan.choices()).unwrap().len(), 1);
    }
}
