//! Interactive plan selection

use console::style;
use dialoguer::MultiSelect;
use dialoguer::theme::ColorfulTheme;

use opasync_core::{ActionItem, ChoiceKind, CoreError, PlanChoice, PlanSelector};

/// Multi-select picker over the planned actions
///
/// Choices come pre-checked according to their bucket. Escape aborts, which the
/// orchestrator treats as an empty selection.
pub struct InteractiveSelector {
    theme: ColorfulTheme,
}

impl InteractiveSelector {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl PlanSelector for InteractiveSelector {
    fn select(&self, choices: &[PlanChoice]) -> opasync_core::Result<Vec<ActionItem>> {
        let items: Vec<String> = choices.iter().map(choice_label).collect();
        let defaults: Vec<bool> = choices.iter().map(|c| c.preselected).collect();

        let selection = MultiSelect::with_theme(&self.theme)
            .with_prompt("Select actions to apply (space to toggle, enter to confirm)")
            .items(&items)
            .defaults(&defaults)
            .report(false)
            .interact_opt()
            .map_err(|e| CoreError::Io(std::io::Error::other(e)))?;

        Ok(selected_actions(choices, &selection.unwrap_or_default()))
    }
}

/// Picker label, highlighting overwrites of policies opasync does not own
pub fn choice_label(choice: &PlanChoice) -> String {
    match choice.kind {
        ChoiceKind::OverwriteNonDev => style(&choice.label).yellow().to_string(),
        ChoiceKind::Delete => style(&choice.label).red().to_string(),
        ChoiceKind::Deploy | ChoiceKind::OverwriteDev => choice.label.clone(),
    }
}

/// Map picked indices back to actions, keeping presentation order
pub fn selected_actions(choices: &[PlanChoice], indices: &[usize]) -> Vec<ActionItem> {
    let mut indices = indices.to_vec();
    indices.sort_unstable();
    indices.dedup();
    indices
        .into_iter()
        .filter_map(|i| choices.get(i))
        .map(|c| c.action.clone())
        .collect()
}
